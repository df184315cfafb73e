//! Message body framing.
//!
//! Bodies are delimited by `Content-Length` and buffered whole before the message is
//! handed out. Any `Transfer-Encoding` is rejected with
//! [`ParseError::UnsupportedTransferEncoding`].

use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};

use crate::ensure;
use crate::protocol::ParseError;

/// Reads the declared body length of a message, `0` when none is declared.
pub(crate) fn content_length(headers: &HeaderMap, max_body_bytes: u64) -> Result<u64, ParseError> {
    // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
    if let Some(te_value) = headers.get(TRANSFER_ENCODING) {
        let encoding = String::from_utf8_lossy(te_value.as_bytes());
        return Err(ParseError::unsupported_transfer_encoding(encoding.trim()));
    }

    let mut length = None;
    for cl_value in headers.get_all(CONTENT_LENGTH) {
        let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        let current =
            cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

        match length {
            Some(previous) if previous != current => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {current}")));
            }
            _ => length = Some(current),
        }
    }

    let length = length.unwrap_or(0);
    ensure!(length <= max_body_bytes, ParseError::too_large_body(length, max_body_bytes));
    Ok(length)
}

/// Splits a body of `length` bytes off `src`, or reserves room for it and returns `None`.
pub(crate) fn take_body(src: &mut BytesMut, length: u64) -> Option<Bytes> {
    // `length` has been checked against the body limit, which fits in memory
    let length = length as usize;
    if src.len() < length {
        src.reserve(length - src.len());
        return None;
    }
    Some(src.split_to(length).freeze())
}
