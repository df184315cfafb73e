//! Decoder for HTTP/1.x response heads, used on the client side of a connection.

use bytes::BytesMut;
use http::{Response, StatusCode};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::{HeaderIndex, fill_headers, map_httparse_error, parse_version};
use crate::config::ConnectionConfig;
use crate::ensure;
use crate::protocol::{ParseError, ResponseHead};

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone)]
pub struct ResponseHeadDecoder {
    max_header_bytes: usize,
    max_headers: usize,
}

impl ResponseHeadDecoder {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self { max_header_bytes: config.max_header_bytes(), max_headers: config.max_headers() }
    }
}

impl Default for ResponseHeadDecoder {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = ResponseHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut resp = httparse::Response::new(&mut headers);

        let body_offset = match resp.parse(src).map_err(|e| map_httparse_error(e, self.max_headers))? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed response head");
        ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

        let indices = HeaderIndex::record(src, resp.headers);
        let version = parse_version(resp.version)?;
        let code = resp.code.ok_or(ParseError::InvalidStatus(None))?;
        let status = StatusCode::from_u16(code).map_err(|_| ParseError::InvalidStatus(Some(code)))?;

        let head_bytes = src.split_to(body_offset).freeze();
        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;
        fill_headers(&head_bytes, &indices, head.headers_mut())?;

        Ok(Some(head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Version;
    use http::header::{CONNECTION, UPGRADE};
    use indoc::indoc;

    #[test]
    fn switching_protocols() {
        let str = indoc! {r##"
        HTTP/1.1 101 Switching Protocols
        Upgrade: echo
        Connection: Upgrade

        hello"##};

        let mut buf = BytesMut::from(str);
        let head = ResponseHeadDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.headers().get(UPGRADE).unwrap(), "echo");
        assert_eq!(head.headers().get(CONNECTION).unwrap(), "Upgrade");
        assert_eq!(&buf[..], &b"hello"[..]);
    }

    #[test]
    fn partial_head_waits_for_more() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Le");
        assert!(ResponseHeadDecoder::default().decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn invalid_status_line() {
        let mut buf = BytesMut::from("HTTP/1.1 abc OK\r\n\r\n");
        assert!(ResponseHeadDecoder::default().decode(&mut buf).is_err());
    }
}
