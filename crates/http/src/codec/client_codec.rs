use bytes::{Bytes, BytesMut};
use http::{Request, Response};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::config::ConnectionConfig;
use crate::protocol::{ParseError, SendError};

/// Client side codec: encodes requests and decodes the responses answering them.
///
/// Every encoded request is registered with the decoder so responses to `HEAD`
/// requests are framed correctly.
#[derive(Debug)]
pub struct ClientCodec {
    encoder: RequestEncoder,
    decoder: ResponseDecoder,
}

impl ClientCodec {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self { encoder: RequestEncoder::new(), decoder: ResponseDecoder::new(config) }
    }

    /// Number of sent requests without a final response.
    pub fn outstanding(&self) -> usize {
        self.decoder.outstanding()
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

impl Encoder<Request<Bytes>> for ClientCodec {
    type Error = SendError;

    fn encode(&mut self, item: Request<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let method = item.method().clone();
        self.encoder.encode(item, dst)?;
        self.decoder.expect(method);
        Ok(())
    }
}

impl Decoder for ClientCodec {
    type Item = Response<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decoder.decode(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    #[test]
    fn head_request_response_has_no_body() {
        let mut codec = ClientCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Request::head("/").body(Bytes::new()).unwrap(), &mut dst).unwrap();
        assert_eq!(&dst[..], &b"HEAD / HTTP/1.1\r\n\r\n"[..]);
        assert_eq!(codec.outstanding(), 1);

        let mut src = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n");
        let response = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
        assert_eq!(codec.outstanding(), 0);

        codec.encode(Request::builder().method(Method::GET).uri("/").body(Bytes::new()).unwrap(), &mut dst).unwrap();
        assert_eq!(codec.outstanding(), 1);
    }
}
