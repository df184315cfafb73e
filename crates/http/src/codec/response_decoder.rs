//! HTTP response decoder, the client side counterpart of [`RequestDecoder`](super::RequestDecoder).
//!
//! Whether a response carries a body depends on the request it answers, so the decoder
//! is told the method of every request sent through [`ResponseDecoder::expect`].
//! Responses are matched to requests in FIFO order.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use http::{Method, Response, StatusCode};
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::codec::body::{content_length, take_body};
use crate::codec::header::ResponseHeadDecoder;
use crate::codec::response_encoder::allows_body;
use crate::config::ConnectionConfig;
use crate::protocol::{ParseError, ResponseHead};

#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: ResponseHeadDecoder,
    max_body_bytes: u64,
    methods: VecDeque<Method>,
    pending: Option<(ResponseHead, u64)>,
}

impl ResponseDecoder {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            header_decoder: ResponseHeadDecoder::new(config),
            max_body_bytes: config.max_body_bytes(),
            methods: VecDeque::new(),
            pending: None,
        }
    }

    /// Registers a request whose response is still to be decoded.
    pub fn expect(&mut self, method: Method) {
        self.methods.push_back(method);
    }

    /// Number of requests still waiting for their final response.
    pub fn outstanding(&self) -> usize {
        self.methods.len()
    }

    fn body_length(&self, head: &ResponseHead) -> Result<u64, ParseError> {
        let is_head = self.methods.front() == Some(&Method::HEAD);
        if is_head || !allows_body(head.status()) {
            return Ok(0);
        }
        content_length(head.headers(), self.max_body_bytes)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl Decoder for ResponseDecoder {
    type Item = Response<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (head, length) = match self.pending.take() {
            Some(pending) => pending,
            None => match self.header_decoder.decode(src)? {
                Some(head) => {
                    let length = self.body_length(&head)?;
                    (head, length)
                }
                None => return Ok(None),
            },
        };

        let Some(body) = take_body(src, length) else {
            self.pending = Some((head, length));
            return Ok(None);
        };

        // interim responses don't complete the request, 101 does
        let status = head.status();
        if !status.is_informational() || status == StatusCode::SWITCHING_PROTOCOLS {
            if self.methods.pop_front().is_none() {
                warn!(%status, "received a response without a pending request");
            }
        }

        Ok(Some(head.map(|_| body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn pipelined_responses() {
        let str = indoc! {r##"
        HTTP/1.1 100 Continue

        HTTP/1.1 200 OK
        Content-Length: 5

        helloHTTP/1.1 200 OK
        Content-Length: 5

        HTTP/1.1 204 No Content

        "##};

        let mut buf = BytesMut::from(str);
        let mut decoder = ResponseDecoder::default();
        decoder.expect(Method::POST);
        decoder.expect(Method::HEAD);
        decoder.expect(Method::DELETE);

        let interim = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(interim.status(), StatusCode::CONTINUE);
        assert_eq!(decoder.outstanding(), 3);

        let first = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.body().as_ref(), b"hello");

        // a HEAD response declares a length but has no body
        let second = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert!(second.body().is_empty());

        let third = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(third.status(), StatusCode::NO_CONTENT);
        assert_eq!(decoder.outstanding(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn switching_protocols_leaves_the_rest() {
        let mut buf = BytesMut::from("HTTP/1.1 101 Switching Protocols\r\nUpgrade: echo\r\n\r\nraw bytes");
        let mut decoder = ResponseDecoder::default();
        decoder.expect(Method::GET);

        let response = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(decoder.outstanding(), 0);
        assert_eq!(&buf[..], &b"raw bytes"[..]);
    }

    #[test]
    fn body_split_across_reads() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nab");
        let mut decoder = ResponseDecoder::default();
        decoder.expect(Method::GET);

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"cd");
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().body().as_ref(), b"abcd");
    }
}
