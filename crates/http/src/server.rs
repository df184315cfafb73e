//! TCP server accepting HTTP/1.1 connections.
//!
//! [`start_server`] binds an address and serves every accepted connection with an
//! [`HttpConnection`] on its own child scheduler. The returned [`ServerHandle`] stops the
//! server and reports when it is gone.
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use micro_http_semantics::handler::make_responder;
//! use micro_http_semantics::protocol::BoxError;
//! use micro_http_semantics::scheduler::Scheduler;
//! use micro_http_semantics::server::start_server;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let responder = make_responder(|_request: Request<Bytes>, _scheduler: Scheduler| async {
//!     Ok::<_, BoxError>(Response::new(Bytes::from_static(b"Hello World!\r\n")))
//! });
//!
//! let server = start_server("127.0.0.1", 8080, responder, |e| eprintln!("connection failed: {e}")).await?;
//! server.on_close().await;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ConnectionConfig;
use crate::connection::HttpConnection;
use crate::handler::Responder;
use crate::protocol::{ConnectionError, HttpError};
use crate::scheduler::Scheduler;

/// Starts a server on `host:port` with the default configuration.
///
/// `on_error` is called with the error of every connection that ends abnormally.
pub async fn start_server<R, E>(host: &str, port: u16, responder: R, on_error: E) -> Result<ServerHandle, ConnectionError>
where
    R: Responder,
    E: Fn(HttpError) + Send + Sync + 'static,
{
    Server::builder().bind(host, port, responder, on_error).await
}

#[derive(Debug)]
pub struct Server;

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

#[derive(Debug)]
pub struct ServerBuilder {
    config: ConnectionConfig,
    scheduler: Option<Scheduler>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ConnectionConfig::default(), scheduler: None }
    }

    /// Limits applied to every accepted connection.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Parent scheduler of the server, the current runtime by default.
    pub fn scheduler(mut self, scheduler: &Scheduler) -> Self {
        self.scheduler = Some(scheduler.child());
        self
    }

    /// Binds `host:port` and starts accepting connections in the background.
    ///
    /// # Panics
    ///
    /// Panics when no scheduler was set and this is called outside of a tokio runtime.
    pub async fn bind<R, E>(self, host: &str, port: u16, responder: R, on_error: E) -> Result<ServerHandle, ConnectionError>
    where
        R: Responder,
        E: Fn(HttpError) + Send + Sync + 'static,
    {
        let address = format!("{host}:{port}");
        let listener = match TcpListener::bind((host, port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(cause = %e, %address, "bind server error");
                return Err(ConnectionError::bind(address, e));
            }
        };
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "start listening");

        let scheduler = self.scheduler.unwrap_or_else(Scheduler::current);
        let accepting = scheduler.clone();
        let config = self.config;
        scheduler.submit(accept_loop(listener, Arc::new(responder), Arc::new(on_error), accepting, config));

        Ok(ServerHandle { local_addr, scheduler })
    }
}

async fn accept_loop<R, E>(listener: TcpListener, responder: Arc<R>, on_error: Arc<E>, scheduler: Scheduler, config: ConnectionConfig)
where
    R: Responder,
    E: Fn(HttpError) + Send + Sync + 'static,
{
    loop {
        let (tcp_stream, remote_addr) = match listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let responder = Arc::clone(&responder);
        let on_error = Arc::clone(&on_error);
        let connection_scheduler = scheduler.child();

        scheduler.submit(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::with_config(reader, writer, &config);
            match connection.process(responder, connection_scheduler).await {
                Ok(()) => {
                    info!(%remote_addr, "finished process, connection shutdown");
                }
                Err(HttpError::ConnectionError { source }) if source.is_cancelled() => {
                    info!(%remote_addr, "connection cancelled");
                }
                Err(e) => {
                    error!(%remote_addr, cause = %e, "service has error, connection shutdown");
                    on_error(e);
                }
            }
        });
    }
}

/// Control over a running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    scheduler: Scheduler,
}

impl ServerHandle {
    /// The bound address, useful when binding port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and cancels the ones in progress.
    pub fn shutdown(&self) {
        info!(local_addr = %self.local_addr, "shutting down server");
        self.scheduler.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.scheduler.is_shutdown()
    }

    /// Completes once the server is shut down and all its connections are gone.
    pub async fn on_close(&self) {
        self.scheduler.cancelled().await;
        self.scheduler.join().await;
    }
}
