use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::ClientCodec;
use crate::config::ConnectionConfig;
use crate::protocol::{ConnectionError, ResponseHead, UpgradeError};
use crate::scheduler::Scheduler;
use crate::upgrade::{UpgradeContext, UpgradeState, Upgrader};

/// Runs a single protocol upgrade with an [`Upgrader`].
///
/// A negotiator is used once: after the first [`negotiate`](UpgradeNegotiator::negotiate)
/// or [`connect`](UpgradeNegotiator::connect) it stays in its final state and further
/// attempts fail with [`UpgradeError::Finished`].
#[derive(Debug)]
pub struct UpgradeNegotiator<U> {
    upgrader: Option<U>,
    state: UpgradeState,
    scheduler: Scheduler,
    config: ConnectionConfig,
}

impl<U> UpgradeNegotiator<U> {
    pub fn new(upgrader: U, scheduler: Scheduler) -> Self {
        Self::with_config(upgrader, scheduler, ConnectionConfig::default())
    }

    pub fn with_config(upgrader: U, scheduler: Scheduler, config: ConnectionConfig) -> Self {
        Self { upgrader: Some(upgrader), state: UpgradeState::Idle, scheduler, config }
    }

    pub fn state(&self) -> UpgradeState {
        self.state
    }

    /// Connects to `host:port` and negotiates the upgrade over the new connection.
    ///
    /// Failing to connect is a [`UpgradeError::Connection`], never a rejection.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<<U as Upgrader<TcpStream>>::Output, UpgradeError>
    where
        U: Upgrader<TcpStream>,
    {
        if self.upgrader.is_none() {
            return Err(UpgradeError::Finished);
        }

        let connecting = tokio::select! {
            biased;
            () = self.scheduler.cancelled() => None,
            connected = TcpStream::connect((host, port)) => Some(connected),
        };

        let stream = match connecting {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                warn!(host, port, cause = %e, "can't connect for protocol upgrade");
                self.state = UpgradeState::Failed;
                self.upgrader = None;
                return Err(ConnectionError::connect(format!("{host}:{port}"), e).into());
            }
            None => {
                info!(host, port, "protocol upgrade cancelled while connecting");
                self.state = UpgradeState::Failed;
                self.upgrader = None;
                return Err(ConnectionError::Cancelled.into());
            }
        };

        self.negotiate(stream).await
    }

    /// Sends the upgrade request over `io` and, when the peer accepts, hands the
    /// connection to the upgrader.
    pub async fn negotiate<IO>(&mut self, io: IO) -> Result<<U as Upgrader<IO>>::Output, UpgradeError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
        U: Upgrader<IO>,
    {
        let upgrader = self.upgrader.take().ok_or(UpgradeError::Finished)?;

        let result = self.exchange(upgrader, io).await;
        if result.is_err() && !matches!(self.state, UpgradeState::Rejected(_)) {
            self.state = UpgradeState::Failed;
        }
        result
    }

    async fn exchange<IO>(&mut self, upgrader: U, io: IO) -> Result<<U as Upgrader<IO>>::Output, UpgradeError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
        U: Upgrader<IO>,
    {
        let mut framed = Framed::with_capacity(io, ClientCodec::new(&self.config), self.config.read_buffer_capacity());

        let request = upgrader.build_request().map(|()| Bytes::new());
        debug!(uri = %request.uri(), "sending upgrade request");
        tokio::select! {
            biased;
            () = self.scheduler.cancelled() => return Err(ConnectionError::Cancelled.into()),
            sent = framed.send(request) => sent.map_err(ConnectionError::from)?,
        }
        self.state = UpgradeState::RequestSent;

        let response = self.read_response(&mut framed).await?;
        let (parts, _body) = response.into_parts();
        let head: ResponseHead = Response::from_parts(parts, ());

        if !upgrader.is_valid_response(&head) {
            let status = head.status();
            info!(%status, "protocol upgrade rejected");
            self.state = UpgradeState::Rejected(status);
            return Err(UpgradeError::Rejected { status });
        }

        let parts = framed.into_parts();
        let output = upgrader
            .upgrade(UpgradeContext::new(parts.io, parts.read_buf), head)
            .await
            .map_err(|source| UpgradeError::Upgrader { source })?;

        info!("protocol upgraded");
        self.state = UpgradeState::Upgraded;
        Ok(output)
    }

    /// Reads the final answer to the upgrade request, skipping interim responses.
    async fn read_response<IO>(&self, framed: &mut Framed<IO, ClientCodec>) -> Result<Response<Bytes>, ConnectionError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let next = tokio::select! {
                biased;
                () = self.scheduler.cancelled() => return Err(ConnectionError::Cancelled),
                next = framed.next() => next,
            };

            match next {
                Some(Ok(response)) => {
                    let status = response.status();
                    if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
                        debug!(%status, "skipping interim response");
                        continue;
                    }
                    return Ok(response);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectionError::Closed),
            }
        }
    }
}
