use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::HOST;
use http::{HeaderValue, Request, Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::ClientCodec;
use crate::config::ConnectionConfig;
use crate::protocol::{ConnectionError, SendError};
use crate::scheduler::Scheduler;

type Reply = oneshot::Sender<Result<Response<Bytes>, ConnectionError>>;

/// The client side of an HTTP/1.1 connection.
///
/// Requests may be sent concurrently from several tasks: they are written in the order
/// [`send`](ClientConnection::send) is called, without waiting for earlier responses, and
/// each caller receives the response matching its request.
///
/// ```no_run
/// # async fn run() -> Result<(), micro_http_semantics::protocol::ConnectionError> {
/// use bytes::Bytes;
/// use http::Request;
/// use micro_http_semantics::connection::ClientConnection;
/// use micro_http_semantics::scheduler::Scheduler;
///
/// let client = ClientConnection::connect("127.0.0.1", 8080, &Scheduler::current()).await?;
/// let response = client.send(Request::get("/").body(Bytes::new()).unwrap()).await?;
/// println!("{}", response.status());
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClientConnection {
    requests: mpsc::UnboundedSender<(Request<Bytes>, Reply)>,
    scheduler: Scheduler,
    host: Option<HeaderValue>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl ClientConnection {
    /// Connects to `host:port`, the connection lives as a child of `scheduler`.
    pub async fn connect(host: &str, port: u16, scheduler: &Scheduler) -> Result<Self, ConnectionError> {
        Self::connect_with_config(host, port, scheduler, &ConnectionConfig::default()).await
    }

    pub async fn connect_with_config(
        host: &str,
        port: u16,
        scheduler: &Scheduler,
        config: &ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        let address = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port)).await.map_err(|e| ConnectionError::connect(&address, e))?;
        let local_addr = stream.local_addr()?;
        let remote_addr = stream.peer_addr()?;
        info!(%remote_addr, "connected");

        let scheduler = scheduler.child();
        let (requests, receiver) = mpsc::unbounded_channel();
        let framed = Framed::with_capacity(stream, ClientCodec::new(config), config.read_buffer_capacity());

        scheduler.submit(async move {
            match drive(framed, receiver).await {
                Ok(()) => info!(%remote_addr, "client connection finished"),
                Err(e) => warn!(%remote_addr, cause = %e, "client connection failed"),
            }
        });

        Ok(Self { requests, scheduler, host: HeaderValue::try_from(address).ok(), local_addr, remote_addr })
    }

    /// Sends `request` and waits for its response.
    ///
    /// A `Host` header is added when the request has none. Fails with
    /// [`ConnectionError::Cancelled`] once the connection is closed locally, and with
    /// [`ConnectionError::Closed`] if the peer goes away before answering.
    pub async fn send(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, ConnectionError> {
        if !request.headers().contains_key(HOST) {
            if let Some(host) = &self.host {
                request.headers_mut().insert(HOST, host.clone());
            }
        }

        let (reply, response) = oneshot::channel();
        if self.scheduler.is_shutdown() || self.requests.send((request, reply)).is_err() {
            return Err(self.closed_error());
        }

        tokio::select! {
            response = response => response.unwrap_or_else(|_dropped| Err(self.closed_error())),
            () = self.scheduler.cancelled() => Err(self.closed_error()),
        }
    }

    /// Closes the connection, pending requests fail with [`ConnectionError::Cancelled`].
    pub fn close(&self) {
        self.scheduler.shutdown();
    }

    /// Completes once the connection is closed, by either side.
    pub async fn on_close(&self) {
        self.scheduler.join().await;
    }

    pub fn is_closed(&self) -> bool {
        self.scheduler.is_shutdown() || self.requests.is_closed()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn closed_error(&self) -> ConnectionError {
        if self.scheduler.is_shutdown() { ConnectionError::Cancelled } else { ConnectionError::Closed }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}

/// Writes queued requests and routes responses to their senders in FIFO order.
async fn drive<IO>(
    mut framed: Framed<IO, ClientCodec>,
    mut requests: mpsc::UnboundedReceiver<(Request<Bytes>, Reply)>,
) -> Result<(), ConnectionError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending: VecDeque<Reply> = VecDeque::new();
    let mut accepting = true;

    loop {
        tokio::select! {
            exchange = requests.recv(), if accepting => match exchange {
                Some((request, reply)) => match framed.send(request).await {
                    Ok(()) => pending.push_back(reply),
                    Err(e @ SendError::InvalidHead { .. }) => {
                        debug!(cause = %e, "refusing to send an invalid request");
                        let _ = reply.send(Err(e.into()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                        return Err(ConnectionError::Closed);
                    }
                },
                None => accepting = false,
            },

            response = framed.next(), if !pending.is_empty() => match response {
                Some(Ok(response)) => {
                    let status = response.status();
                    if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
                        debug!(%status, "skipping interim response");
                        continue;
                    }
                    if let Some(reply) = pending.pop_front() {
                        // the caller may have given up waiting
                        let _ = reply.send(Ok(response));
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectionError::Closed),
            },

            else => return Ok(()),
        }
    }
}
