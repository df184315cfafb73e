//! HTTP/1.1 framing on top of `tokio_util` codecs.
//!
//! - Server side:
//!   - [`RequestDecoder`]: decodes complete requests, pipelined ones included
//!   - [`ResponseEncoder`]: encodes responses, owning `Content-Length` and `Date`
//! - Client side:
//!   - [`RequestEncoder`] and [`ResponseDecoder`], combined in [`ClientCodec`]
//!
//! Bodies are `Content-Length` delimited and buffered whole, `Transfer-Encoding` is
//! rejected.
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::Response;
//! use micro_http_semantics::codec::ResponseEncoder;
//! use tokio_util::codec::Encoder;
//!
//! let mut buffer = BytesMut::new();
//! let response = Response::new(Bytes::from_static(b"ok"));
//! ResponseEncoder::new().encode(response, &mut buffer).unwrap();
//! assert!(buffer.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod body;
mod client_codec;
mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use client_codec::ClientCodec;
pub use header::{RequestHeadDecoder, ResponseHeadDecoder};
pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;
