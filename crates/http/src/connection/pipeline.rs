//! Ordered delivery of concurrently produced responses.
//!
//! Requests pipelined on one connection are answered concurrently, but their responses
//! must go out in the order the requests came in. The reading side hands every request
//! to a [`PipelineCoordinator`], which starts its responder right away and queues a slot
//! for the pending response. The [`PipelineWriter`], the only owner of the outbound
//! stream, waits for the slots in arrival order and writes each response as soon as it
//! and all the ones before it are ready.
//!
//! At most `max_in_flight` requests are dispatched but not yet written, further calls to
//! [`PipelineCoordinator::dispatch`] wait for room.

use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, SinkExt};
use http::{Request, Response, StatusCode};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::{debug, error, trace};

use crate::handler::Responder;
use crate::protocol::{BoxError, ConnectionError, SendError, TaskError};
use crate::scheduler::{ScheduledTask, Scheduler};

enum PendingResponse {
    Task(ScheduledTask<Result<Response<Bytes>, BoxError>>),
    Ready(Response<Bytes>),
}

struct PipelineSlot {
    sequence: u64,
    response: PendingResponse,
    _permit: OwnedSemaphorePermit,
}

impl PipelineSlot {
    fn cancel(&self) {
        if let PendingResponse::Task(task) = &self.response {
            task.cancel();
        }
    }
}

/// Reading side of a pipeline: dispatches requests in arrival order.
pub struct PipelineCoordinator<R> {
    responder: Arc<R>,
    scheduler: Scheduler,
    in_flight: Arc<Semaphore>,
    max_in_flight: usize,
    next_sequence: u64,
    slots: mpsc::UnboundedSender<PipelineSlot>,
}

/// Writing side of a pipeline, see [`PipelineWriter::drain`].
pub struct PipelineWriter {
    scheduler: Scheduler,
    slots: mpsc::UnboundedReceiver<PipelineSlot>,
}

impl<R: Responder> PipelineCoordinator<R> {
    /// Creates a pipeline whose responders run as tasks of `scheduler`.
    pub fn new(responder: Arc<R>, scheduler: Scheduler, max_in_flight: usize) -> (Self, PipelineWriter) {
        let max_in_flight = max_in_flight.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let coordinator = Self {
            responder,
            scheduler: scheduler.clone(),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            next_sequence: 0,
            slots: sender,
        };
        (coordinator, PipelineWriter { scheduler, slots: receiver })
    }

    /// Starts answering `request`, its response is written after every response
    /// dispatched before it.
    ///
    /// Waits while `max_in_flight` responses are pending. Fails with
    /// [`ConnectionError::Closed`] once the writer has stopped.
    pub async fn dispatch(&mut self, request: Request<Bytes>) -> Result<(), ConnectionError> {
        let permit = self.acquire().await?;

        let responder = Arc::clone(&self.responder);
        let scheduler = self.scheduler.clone();
        let task = self.scheduler.submit(async move { responder.respond(request, scheduler).await.map_err(Into::into) });

        self.enqueue(PendingResponse::Task(task), permit)
    }

    /// Queues an already built response, used when a request can't be dispatched at all.
    pub async fn reject(&mut self, response: Response<Bytes>) -> Result<(), ConnectionError> {
        let permit = self.acquire().await?;
        self.enqueue(PendingResponse::Ready(response), permit)
    }

    /// Number of dispatched requests whose response hasn't been written yet.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.in_flight.available_permits()
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, ConnectionError> {
        tokio::select! {
            biased;
            () = self.slots.closed() => Err(ConnectionError::Closed),
            permit = Arc::clone(&self.in_flight).acquire_owned() => permit.map_err(|_closed| ConnectionError::Closed),
        }
    }

    fn enqueue(&mut self, response: PendingResponse, permit: OwnedSemaphorePermit) -> Result<(), ConnectionError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let slot = PipelineSlot { sequence, response, _permit: permit };
        self.slots.send(slot).map_err(|rejected| {
            rejected.0.cancel();
            ConnectionError::Closed
        })?;

        trace!(sequence, "request dispatched");
        Ok(())
    }
}

impl PipelineWriter {
    /// Writes every response in dispatch order until the coordinator is dropped and all
    /// pending responses are written.
    ///
    /// A responder that fails or panics is answered with `500 Internal Server Error`. When
    /// the scheduler is shut down, writing stops with [`ConnectionError::Cancelled`]. On
    /// any early stop the responses still pending are cancelled.
    pub async fn drain<S>(mut self, sink: &mut S) -> Result<(), ConnectionError>
    where
        S: Sink<Response<Bytes>, Error = SendError> + Unpin,
    {
        let result = self.write_all(sink).await;

        self.slots.close();
        while let Ok(slot) = self.slots.try_recv() {
            debug!(sequence = slot.sequence, "cancelling pending response");
            slot.cancel();
        }

        result
    }

    async fn write_all<S>(&mut self, sink: &mut S) -> Result<(), ConnectionError>
    where
        S: Sink<Response<Bytes>, Error = SendError> + Unpin,
    {
        loop {
            let slot = tokio::select! {
                biased;
                slot = self.slots.recv() => match slot {
                    Some(slot) => slot,
                    None => return Ok(()),
                },
                () = self.scheduler.cancelled() => return Err(ConnectionError::Cancelled),
            };

            let sequence = slot.sequence;
            let response = match slot.response {
                PendingResponse::Ready(response) => response,
                PendingResponse::Task(task) => match task.await {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        error!(sequence, cause = %e, "responder failed, answering with internal server error");
                        status_response(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                    Err(TaskError::Panicked) => {
                        error!(sequence, "responder panicked, answering with internal server error");
                        status_response(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                    Err(TaskError::Cancelled) => {
                        debug!(sequence, "responder cancelled, stop writing");
                        return Err(ConnectionError::Cancelled);
                    }
                },
            };

            sink.send(response).await?;
            trace!(sequence, "response written");
        }
    }
}

/// A bodyless response with the given status.
pub(crate) fn status_response(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use crate::handler::make_responder;

    /// Sink collecting the bodies of the written responses.
    #[derive(Default)]
    struct Collect(Vec<(StatusCode, Bytes)>);

    impl Sink<Response<Bytes>> for Collect {
        type Error = SendError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: Response<Bytes>) -> Result<(), Self::Error> {
            let (parts, body) = item.into_parts();
            self.0.push((parts.status, body));
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    fn request(path: &str) -> Request<Bytes> {
        Request::get(path).body(Bytes::new()).unwrap()
    }

    /// Answers `/i` with body `i` after `(5 - i) * 100ms`, so later requests finish first.
    fn delayed_responder() -> Arc<impl Responder> {
        Arc::new(make_responder(|request: Request<Bytes>, scheduler: Scheduler| async move {
            let index: u64 = request.uri().path().trim_start_matches('/').parse()?;
            scheduler.sleep(Duration::from_millis((5 - index) * 100)).await?;
            Ok::<_, BoxError>(Response::new(Bytes::from(index.to_string())))
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn responses_follow_request_order() {
        let scheduler = Scheduler::current();
        let (mut coordinator, writer) = PipelineCoordinator::new(delayed_responder(), scheduler, 16);

        for i in 0..5 {
            coordinator.dispatch(request(&format!("/{i}"))).await.unwrap();
        }
        assert_eq!(coordinator.in_flight(), 5);
        drop(coordinator);

        let mut sink = Collect::default();
        writer.drain(&mut sink).await.unwrap();

        let bodies: Vec<_> = sink.0.iter().map(|(_, body)| body.clone()).collect();
        assert_eq!(bodies, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn responders_run_concurrently() {
        let scheduler = Scheduler::current();
        let (mut coordinator, writer) = PipelineCoordinator::new(delayed_responder(), scheduler, 16);

        let started = tokio::time::Instant::now();
        for i in 0..5 {
            coordinator.dispatch(request(&format!("/{i}"))).await.unwrap();
        }
        drop(coordinator);
        writer.drain(&mut Collect::default()).await.unwrap();

        // the slowest responder alone takes 500ms
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_become_internal_errors_in_place() {
        let responder = Arc::new(make_responder(|request: Request<Bytes>, _scheduler: Scheduler| async move {
            match request.uri().path() {
                "/fail" => Err::<Response<Bytes>, BoxError>("backend down".into()),
                "/panic" => panic!("responder bug"),
                path => Ok(Response::new(Bytes::copy_from_slice(path.as_bytes()))),
            }
        }));

        let (mut coordinator, writer) = PipelineCoordinator::new(responder, Scheduler::current(), 16);
        coordinator.dispatch(request("/a")).await.unwrap();
        coordinator.dispatch(request("/fail")).await.unwrap();
        coordinator.dispatch(request("/panic")).await.unwrap();
        coordinator.reject(status_response(StatusCode::BAD_REQUEST)).await.unwrap();
        drop(coordinator);

        let mut sink = Collect::default();
        writer.drain(&mut sink).await.unwrap();

        let statuses: Vec<_> = sink.0.iter().map(|(status, _)| *status).collect();
        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR, StatusCode::BAD_REQUEST]
        );
        assert_eq!(sink.0[0].1, "/a");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_waits_for_room() {
        let (mut coordinator, writer) = PipelineCoordinator::new(delayed_responder(), Scheduler::current(), 2);

        coordinator.dispatch(request("/1")).await.unwrap();
        coordinator.dispatch(request("/2")).await.unwrap();

        let third = tokio::time::timeout(Duration::from_millis(50), coordinator.dispatch(request("/3"))).await;
        assert!(third.is_err(), "a third request must wait for a written response");

        let writing = tokio::spawn(async move {
            let mut sink = Collect::default();
            writer.drain(&mut sink).await.map(|()| sink.0.len())
        });

        coordinator.dispatch(request("/3")).await.unwrap();
        drop(coordinator);
        assert_eq!(writing.await.unwrap().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_writing_and_cancels_the_rest() {
        let scheduler = Scheduler::current();
        let (mut coordinator, writer) = PipelineCoordinator::new(delayed_responder(), scheduler.clone(), 16);

        coordinator.dispatch(request("/4")).await.unwrap();
        coordinator.dispatch(request("/0")).await.unwrap();

        let shutdown = scheduler.clone();
        scheduler.schedule(Duration::from_millis(50), async move { shutdown.shutdown() });

        let mut sink = Collect::default();
        let result = writer.drain(&mut sink).await;
        assert!(matches!(result, Err(ConnectionError::Cancelled)));
        assert!(sink.0.is_empty());

        // the writer is gone, nothing more can be dispatched
        assert!(matches!(coordinator.dispatch(request("/1")).await, Err(ConnectionError::Closed)));
    }
}
