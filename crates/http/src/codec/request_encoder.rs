//! HTTP request encoder, used by client connections and upgrade negotiation.

use std::io;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderValue, Method, Request, Version};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::{FastWrite, write_headers};
use crate::protocol::SendError;

const INIT_HEADER_SIZE: usize = 1024;

/// Serializes a complete [`Request<Bytes>`] in origin form.
///
/// A `Host` header is derived from the URI authority when missing, and
/// `Content-Length` is set whenever there's a body or the method expects one.
#[derive(Debug, Default)]
pub struct RequestEncoder;

impl RequestEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Request<Bytes>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Request<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, body) = item.into_parts();

        if head.version != Version::HTTP_11 {
            error!(http_version = ?head.version, "unsupported http version");
            return Err(io::Error::from(ErrorKind::Unsupported).into());
        }
        if head.headers.contains_key(TRANSFER_ENCODING) {
            return Err(SendError::invalid_head("transfer-encoding is not supported"));
        }

        // nothing is written before the head is known to be valid
        if !head.headers.contains_key(HOST) {
            if let Some(authority) = head.uri.authority() {
                let host = HeaderValue::from_str(authority.as_str()).map_err(SendError::invalid_head)?;
                head.headers.insert(HOST, host);
            }
        }

        if !body.is_empty() || expects_body(&head.method) {
            head.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let target = head.uri.path_and_query().map_or("/", |p| p.as_str());
        dst.reserve(INIT_HEADER_SIZE + body.len());
        write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method, target)?;

        write_headers(&head.headers, dst);
        dst.put_slice(&body);
        Ok(())
    }
}

fn expects_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(request: Request<Bytes>) -> String {
        let mut dst = BytesMut::new();
        RequestEncoder::new().encode(request, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn get_without_body() {
        let request = Request::get("http://127.0.0.1:8080/index.html?x=1").body(Bytes::new()).unwrap();
        assert_eq!(encode(request), "GET /index.html?x=1 HTTP/1.1\r\nhost: 127.0.0.1:8080\r\n\r\n");
    }

    #[test]
    fn post_with_body() {
        let request = Request::post("/submit").header(HOST, "example.com").body(Bytes::from_static(b"a=1")).unwrap();
        assert_eq!(encode(request), "POST /submit HTTP/1.1\r\nhost: example.com\r\ncontent-length: 3\r\n\r\na=1");
    }

    #[test]
    fn empty_post_declares_zero_length() {
        let request = Request::post("/submit").body(Bytes::new()).unwrap();
        assert_eq!(encode(request), "POST /submit HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn chunked_is_refused() {
        let request = Request::post("/submit").header(TRANSFER_ENCODING, "chunked").body(Bytes::new()).unwrap();
        assert!(RequestEncoder::new().encode(request, &mut BytesMut::new()).is_err());
    }
}
