//! HTTP response encoder.
//!
//! Serializes a complete [`Response<Bytes>`]: the status line, the headers and the body.
//! The framing headers are owned by the encoder: `Content-Length` always reflects the
//! body, and a `Date` header is added when the response has none.

use std::io;
use std::io::{ErrorKind, Write};
use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, DATE, TRANSFER_ENCODING};
use http::{HeaderValue, Response, StatusCode, Version};
use tokio_util::codec::Encoder;
use tracing::{error, warn};

use crate::codec::header::{FastWrite, write_headers};
use crate::protocol::SendError;

/// Initial buffer size allocated for head serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, body) = item.into_parts();

        dst.reserve(INIT_HEADER_SIZE + body.len());
        match head.version {
            Version::HTTP_11 => {
                write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", head.status.as_str(), head.status.canonical_reason().unwrap_or(""))?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        if head.headers.remove(TRANSFER_ENCODING).is_some() {
            warn!("transfer-encoding is not supported, the response is sent with content-length");
        }

        let allows_body = allows_body(head.status);
        if allows_body {
            head.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        } else {
            head.headers.remove(CONTENT_LENGTH);
            if !body.is_empty() {
                warn!(status = %head.status, body_size = body.len(), "dropping the body of a response that can't carry one");
            }
        }

        if !head.headers.contains_key(DATE) {
            let date = httpdate::fmt_http_date(SystemTime::now());
            head.headers.insert(DATE, HeaderValue::try_from(date).map_err(SendError::invalid_head)?);
        }

        write_headers(&head.headers, dst);
        if allows_body {
            dst.put_slice(&body);
        }
        Ok(())
    }
}

/// 1xx, 204 and 304 responses never carry a body.
pub(crate) fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(response: Response<Bytes>) -> String {
        let mut dst = BytesMut::new();
        ResponseEncoder::new().encode(response, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn sets_length_and_date() {
        let response = Response::builder()
            .header(CONTENT_LENGTH, 100)
            .header("content-type", "text/plain")
            .body(Bytes::from_static(b"hello"))
            .unwrap();

        let encoded = encode(response);
        assert!(encoded.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(encoded.contains("content-length: 5\r\n"));
        assert!(encoded.contains("content-type: text/plain\r\n"));
        assert!(encoded.contains("date: "));
        assert!(encoded.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn keeps_an_existing_date() {
        let response = Response::builder().header(DATE, "Wed, 21 Oct 2015 07:28:00 GMT").body(Bytes::new()).unwrap();

        let encoded = encode(response);
        assert!(encoded.contains("date: Wed, 21 Oct 2015 07:28:00 GMT\r\n"));
        assert_eq!(encoded.matches("date:").count(), 1);
        assert!(encoded.contains("content-length: 0\r\n"));
    }

    #[test]
    fn no_content_has_no_body() {
        let response = Response::builder().status(StatusCode::NO_CONTENT).body(Bytes::from_static(b"ignored")).unwrap();

        let encoded = encode(response);
        assert!(encoded.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!encoded.contains("content-length"));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn unsupported_version() {
        let response = Response::builder().version(Version::HTTP_2).body(Bytes::new()).unwrap();
        assert!(ResponseEncoder::new().encode(response, &mut BytesMut::new()).is_err());
    }
}
