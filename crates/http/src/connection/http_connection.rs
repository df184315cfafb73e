use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use http::header::CONNECTION;
use http::{Request, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::config::ConnectionConfig;
use crate::connection::pipeline::{PipelineCoordinator, status_response};
use crate::handler::Responder;
use crate::protocol::{ConnectionError, HttpError, ParseError};
use crate::scheduler::Scheduler;
use crate::utils::contains_token;

/// The server side of an HTTP/1.1 connection.
///
/// `HttpConnection` reads pipelined requests, answers each of them concurrently with a
/// [`Responder`] and writes the responses back in request order:
/// - requests are decoded and dispatched to a [`PipelineCoordinator`] as they arrive
/// - responses are written by the pipeline writer, the only user of the write half
/// - a malformed request is answered with an error status, then the connection closes
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    max_in_flight: usize,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, &ConnectionConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: &ConnectionConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(config), config.read_buffer_capacity()),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            max_in_flight: config.max_in_flight(),
        }
    }

    /// Serves the connection until the peer stops sending requests and every response
    /// has been written, or until `scheduler` is shut down.
    ///
    /// Responders run as tasks of `scheduler`, which is shut down when this returns.
    pub async fn process<Resp: Responder>(self, responder: Arc<Resp>, scheduler: Scheduler) -> Result<(), HttpError> {
        let Self { mut framed_read, mut framed_write, max_in_flight } = self;
        let (coordinator, writer) = PipelineCoordinator::new(responder, scheduler.clone(), max_in_flight);

        let reading = read_requests(&mut framed_read, coordinator, &scheduler);
        let writing = async {
            let result = writer.drain(&mut framed_write).await;
            if result.is_err() {
                // nobody will write the answers, stop reading requests
                scheduler.shutdown();
            }
            result
        };

        let (read_result, write_result) = tokio::join!(reading, writing);
        scheduler.shutdown();

        if write_result.is_ok() {
            if let Err(e) = framed_write.get_mut().shutdown().await {
                debug!(cause = %e, "can't shutdown the write half");
            }
        }

        match (read_result, write_result) {
            (_, Err(e)) if !e.is_cancelled() => Err(e.into()),
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

async fn read_requests<R, Resp>(
    framed_read: &mut FramedRead<R, RequestDecoder>,
    mut coordinator: PipelineCoordinator<Resp>,
    scheduler: &Scheduler,
) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
    Resp: Responder,
{
    loop {
        let next = tokio::select! {
            biased;
            () = scheduler.cancelled() => return Err(ConnectionError::Cancelled.into()),
            next = framed_read.next() => next,
        };

        match next {
            Some(Ok(request)) => {
                let close = wants_close(&request);
                coordinator.dispatch(request).await?;
                if close {
                    info!("peer asked to close the connection, stop reading requests");
                    return Ok(());
                }
            }

            Some(Err(ParseError::Io { source })) => {
                warn!(cause = %source, "can't read next request");
                return Err(ConnectionError::from(source).into());
            }

            Some(Err(e)) => {
                error!(cause = %e, "can't receive next request");
                coordinator.reject(status_response(error_status(&e))).await?;
                return Err(e.into());
            }

            None => {
                info!("cant read more request, break this connection down");
                return Ok(());
            }
        }
    }
}

fn wants_close(request: &Request<Bytes>) -> bool {
    let connection = request.headers().get(CONNECTION).map(|value| value.as_bytes());
    match request.version() {
        Version::HTTP_10 => !connection.is_some_and(|value| contains_token(value, "keep-alive")),
        _ => connection.is_some_and(|value| contains_token(value, "close")),
    }
}

fn error_status(e: &ParseError) -> StatusCode {
    match e {
        ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ParseError::UnsupportedTransferEncoding { .. } => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::BAD_REQUEST,
    }
}
