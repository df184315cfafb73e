//! HTTP/1.1 message head encoding and decoding.
//!
//! - [`RequestHeadDecoder`] / [`ResponseHeadDecoder`]: parse a request or response
//!   head with `httparse`, enforcing the header count and size limits
//! - [`write_headers`]: serializes a header map
//!
//! Decoded header values share the bytes of the read buffer: only the byte ranges of
//! names and values are recorded while parsing, the values are then sliced out of the
//! frozen head.

mod header_encoder;
mod request_head_decoder;
mod response_head_decoder;

pub use header_encoder::FastWrite;
pub use header_encoder::write_headers;
pub use request_head_decoder::RequestHeadDecoder;
pub use response_head_decoder::ResponseHeadDecoder;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Version};

use crate::protocol::ParseError;

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy, Default)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

impl HeaderIndex {
    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                HeaderIndex {
                    name: (name_start, name_start + header.name.len()),
                    value: (value_start, value_start + header.value.len()),
                }
            })
            .collect()
    }
}

/// Fills `headers` from the recorded indices, slicing values out of `head_bytes`.
fn fill_headers(head_bytes: &Bytes, indices: &[HeaderIndex], headers: &mut HeaderMap) -> Result<(), ParseError> {
    headers.reserve(indices.len());
    for index in indices {
        let name = HeaderName::from_bytes(&head_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_maybe_shared(head_bytes.slice(index.value.0..index.value.1))
            .map_err(ParseError::invalid_header)?;
        headers.append(name, value);
    }
    Ok(())
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // Currently HTTP/2 and HTTP/3 not supported
        v => Err(ParseError::InvalidVersion(v)),
    }
}

fn map_httparse_error(e: httparse::Error, max_headers: usize) -> ParseError {
    match e {
        httparse::Error::TooManyHeaders => ParseError::too_many_headers(max_headers),
        e => ParseError::invalid_header(e.to_string()),
    }
}
