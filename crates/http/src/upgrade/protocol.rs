use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use http::header::{CONNECTION, UPGRADE};
use http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::protocol::{BoxError, ResponseHead};
use crate::upgrade::{UpgradeContext, Upgrader};
use crate::utils::contains_token;

/// Switches the connection to the protocol named in the `Upgrade` header.
///
/// The peer must answer `101 Switching Protocols`, name the same protocol (compared
/// case-insensitively) and list `upgrade` in its `Connection` header.
#[derive(Debug, Clone)]
pub struct ProtocolUpgrader {
    uri: Uri,
    protocol: String,
    headers: HeaderMap,
}

impl ProtocolUpgrader {
    pub fn new(uri: Uri, protocol: impl Into<String>) -> Self {
        Self { uri, protocol: protocol.into(), headers: HeaderMap::new() }
    }

    /// Adds a header to the upgrade request, such as a handshake key.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }
}

#[async_trait]
impl<IO> Upgrader<IO> for ProtocolUpgrader
where
    IO: Send + 'static,
{
    type Output = Upgraded<IO>;

    fn build_request(&self) -> Request<()> {
        let mut request = Request::new(());
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request.headers_mut().insert(CONNECTION, HeaderValue::from_static("Upgrade"));
        if let Ok(protocol) = HeaderValue::try_from(self.protocol.as_str()) {
            request.headers_mut().insert(UPGRADE, protocol);
        }
        request
    }

    fn is_valid_response(&self, response: &ResponseHead) -> bool {
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return false;
        }

        let headers = response.headers();
        let same_protocol = headers.get(UPGRADE).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(self.protocol.as_bytes()));
        let upgrading = headers.get(CONNECTION).is_some_and(|value| contains_token(value.as_bytes(), "upgrade"));
        same_protocol && upgrading
    }

    async fn upgrade(self, context: UpgradeContext<IO>, _response: ResponseHead) -> Result<Self::Output, BoxError> {
        let (io, read_buf) = context.into_parts();
        Ok(Upgraded::new(io, read_buf))
    }
}

pin_project! {
    /// A connection after a successful upgrade.
    ///
    /// Reads first return the bytes received along with the upgrade answer, then
    /// continue from the underlying stream. Writes go straight through.
    #[derive(Debug)]
    pub struct Upgraded<IO> {
        #[pin]
        io: IO,
        read_buf: BytesMut,
    }
}

impl<IO> Upgraded<IO> {
    pub fn new(io: IO, read_buf: BytesMut) -> Self {
        Self { io, read_buf }
    }

    pub fn get_ref(&self) -> &IO {
        &self.io
    }

    /// Returns the stream and the bytes not read yet.
    pub fn into_parts(self) -> (IO, BytesMut) {
        (self.io, self.read_buf)
    }
}

impl<IO: AsyncRead> AsyncRead for Upgraded<IO> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        if this.read_buf.is_empty() {
            return this.io.poll_read(cx, buf);
        }

        let len = this.read_buf.len().min(buf.remaining());
        buf.put_slice(&this.read_buf[..len]);
        this.read_buf.advance(len);
        Poll::Ready(Ok(()))
    }
}

impl<IO: AsyncWrite> AsyncWrite for Upgraded<IO> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.project().io.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().io.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().io.poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Response;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn upgrader() -> ProtocolUpgrader {
        ProtocolUpgrader::new(Uri::from_static("http://localhost/chat"), "echo")
    }

    fn response(status: StatusCode, upgrade: &'static str, connection: &'static str) -> ResponseHead {
        Response::builder().status(status).header(UPGRADE, upgrade).header(CONNECTION, connection).body(()).unwrap()
    }

    #[test]
    fn upgrade_request() {
        let request = Upgrader::<tokio::io::DuplexStream>::build_request(
            &upgrader().with_header(HeaderName::from_static("x-key"), HeaderValue::from_static("abc")),
        );
        assert_eq!(request.uri(), "http://localhost/chat");
        assert_eq!(request.headers().get(UPGRADE).unwrap(), "echo");
        assert_eq!(request.headers().get(CONNECTION).unwrap(), "Upgrade");
        assert_eq!(request.headers().get("x-key").unwrap(), "abc");
    }

    #[test]
    fn response_validation() {
        let is_valid = |head: &ResponseHead| Upgrader::<tokio::io::DuplexStream>::is_valid_response(&upgrader(), head);

        assert!(is_valid(&response(StatusCode::SWITCHING_PROTOCOLS, "echo", "Upgrade")));
        assert!(is_valid(&response(StatusCode::SWITCHING_PROTOCOLS, "ECHO", "keep-alive, upgrade")));
        assert!(!is_valid(&response(StatusCode::OK, "echo", "Upgrade")));
        assert!(!is_valid(&response(StatusCode::SWITCHING_PROTOCOLS, "websocket", "Upgrade")));
        assert!(!is_valid(&response(StatusCode::SWITCHING_PROTOCOLS, "echo", "keep-alive")));
    }

    #[tokio::test]
    async fn buffered_bytes_are_read_first() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let mut upgraded = Upgraded::new(local, BytesMut::from("early "));

        remote.write_all(b"late").await.unwrap();
        remote.shutdown().await.unwrap();

        let mut received = String::new();
        upgraded.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "early late");

        upgraded.write_all(b"pong").await.unwrap();
        let mut pong = [0u8; 4];
        remote.read_exact(&mut pong).await.unwrap();
        assert_eq!(&pong, b"pong");
    }
}
