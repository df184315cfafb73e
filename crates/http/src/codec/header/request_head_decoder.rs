//! Decoder for HTTP/1.x request heads.
//!
//! # Limits
//!
//! - Maximum number of headers and header bytes come from
//!   [`ConnectionConfig`](crate::config::ConnectionConfig), 64 headers and 8KB by default
//! - Only HTTP/1.0 and HTTP/1.1 are accepted

use bytes::BytesMut;
use http::Request;
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::{HeaderIndex, fill_headers, map_httparse_error, parse_version};
use crate::config::ConnectionConfig;
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
///
/// On success the head bytes are removed from the buffer, anything after them (the
/// body, or the next pipelined request) is left in place.
#[derive(Debug, Clone)]
pub struct RequestHeadDecoder {
    max_header_bytes: usize,
    max_headers: usize,
}

impl RequestHeadDecoder {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self { max_header_bytes: config.max_header_bytes(), max_headers: config.max_headers() }
    }
}

impl Default for RequestHeadDecoder {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl Decoder for RequestHeadDecoder {
    type Item = RequestHeader;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Minimum valid HTTP request needs at least "GET / HTTP/1.1\r\n\r\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut req = httparse::Request::new(&mut headers);

        let body_offset = match req.parse(src).map_err(|e| map_httparse_error(e, self.max_headers))? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

        let indices = HeaderIndex::record(src, req.headers);
        let version = parse_version(req.version)?;

        let mut builder = Request::builder()
            .method(req.method.ok_or(ParseError::InvalidMethod)?)
            .uri(req.path.ok_or(ParseError::InvalidUri)?)
            .version(version);

        let head_bytes = src.split_to(body_offset).freeze();
        if let Some(headers) = builder.headers_mut() {
            fill_headers(&head_bytes, &indices, headers)?;
        }

        let request = builder.body(()).map_err(|e| match e {
            e if e.is::<http::method::InvalidMethod>() => ParseError::InvalidMethod,
            e if e.is::<http::uri::InvalidUri>() => ParseError::InvalidUri,
            e => ParseError::invalid_header(e),
        })?;

        Ok(Some(RequestHeader::from(request)))
    }
}
