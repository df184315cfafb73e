//! Request responders.
//!
//! A [`Responder`] turns one complete request into one complete response. Responders of
//! the same connection run concurrently, each as a task of the connection's
//! [`Scheduler`], so they may take as long as they need without holding up the requests
//! pipelined behind them.
//!
//! Plain async functions and closures become responders through [`make_responder`]:
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use micro_http_semantics::handler::make_responder;
//! use micro_http_semantics::protocol::BoxError;
//! use micro_http_semantics::scheduler::Scheduler;
//!
//! async fn echo(request: Request<Bytes>, _scheduler: Scheduler) -> Result<Response<Bytes>, BoxError> {
//!     Ok(Response::new(request.into_body()))
//! }
//!
//! let responder = make_responder(echo);
//! ```

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use crate::protocol::BoxError;
use crate::scheduler::Scheduler;

#[async_trait]
pub trait Responder: Send + Sync + 'static {
    type Error: Into<BoxError>;

    /// Produces the response to `request`.
    ///
    /// `scheduler` belongs to the connection the request came from: work submitted to it
    /// is cancelled when the connection closes.
    async fn respond(&self, request: Request<Bytes>, scheduler: Scheduler) -> Result<Response<Bytes>, Self::Error>;
}

#[derive(Debug)]
pub struct ResponderFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Responder for ResponderFn<F>
where
    F: Fn(Request<Bytes>, Scheduler) -> Fut + Send + Sync + 'static,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response<Bytes>, Err>> + Send,
{
    type Error = Err;

    async fn respond(&self, request: Request<Bytes>, scheduler: Scheduler) -> Result<Response<Bytes>, Self::Error> {
        (self.f)(request, scheduler).await
    }
}

pub fn make_responder<F, Err, Fut>(f: F) -> ResponderFn<F>
where
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response<Bytes>, Err>>,
    F: Fn(Request<Bytes>, Scheduler) -> Fut,
{
    ResponderFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[tokio::test]
    async fn closure_responder() {
        let responder = make_responder(|request: Request<Bytes>, _scheduler: Scheduler| async move {
            let status = if request.uri().path() == "/missing" { StatusCode::NOT_FOUND } else { StatusCode::OK };
            Ok::<_, BoxError>(Response::builder().status(status).body(Bytes::from_static(b"hi"))?)
        });

        let scheduler = Scheduler::current();
        let found = responder.respond(Request::get("/").body(Bytes::new()).unwrap(), scheduler.clone()).await.unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(found.body().as_ref(), b"hi");

        let missing = responder.respond(Request::get("/missing").body(Bytes::new()).unwrap(), scheduler).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn responder_errors_are_boxable() {
        let responder = make_responder(|_request: Request<Bytes>, _scheduler: Scheduler| async {
            Err::<Response<Bytes>, _>(std::io::Error::other("backend down"))
        });

        let error = responder.respond(Request::get("/").body(Bytes::new()).unwrap(), Scheduler::current()).await.unwrap_err();
        let error: BoxError = error.into();
        assert_eq!(error.to_string(), "backend down");
    }
}
