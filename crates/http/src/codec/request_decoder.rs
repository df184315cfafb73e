//! HTTP request decoder.
//!
//! [`RequestDecoder`] turns the inbound byte stream of a server connection into complete
//! [`Request<Bytes>`] values. It works in two phases:
//!
//! 1. Header parsing through [`RequestHeadDecoder`]
//! 2. Body buffering, as declared by `Content-Length`
//!
//! Pipelined requests following the current one stay in the buffer for the next call.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_http_semantics::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::default();
//! let mut buffer = BytesMut::from("POST /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.body().as_ref(), b"hi");
//! ```

use bytes::{Bytes, BytesMut};
use http::Request;
use tokio_util::codec::Decoder;

use crate::codec::body::{content_length, take_body};
use crate::codec::header::RequestHeadDecoder;
use crate::config::ConnectionConfig;
use crate::protocol::{ParseError, RequestHeader};

/// A decoder for HTTP requests with their whole body.
///
/// # State Machine
///
/// The decoder keeps its state in the `pending` field:
/// - `None`: currently parsing a head
/// - `Some(_)`: head parsed, waiting for the rest of the body
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: RequestHeadDecoder,
    max_body_bytes: u64,
    pending: Option<(RequestHeader, u64)>,
}

impl RequestDecoder {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self { header_decoder: RequestHeadDecoder::new(config), max_body_bytes: config.max_body_bytes(), pending: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (header, length) = match self.pending.take() {
            Some(pending) => pending,
            None => match self.header_decoder.decode(src)? {
                Some(header) => {
                    let length = content_length(header.headers(), self.max_body_bytes)?;
                    (header, length)
                }
                None => return Ok(None),
            },
        };

        match take_body(src, length) {
            Some(body) => Ok(Some(header.body(body))),
            None => {
                self.pending = Some((header, length));
                Ok(None)
            }
        }
    }
}
