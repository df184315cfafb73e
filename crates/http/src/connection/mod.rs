//! HTTP/1.1 connections.
//!
//! - [`HttpConnection`]: the server side, answering pipelined requests concurrently
//!   while writing the responses in request order
//! - [`PipelineCoordinator`] / [`PipelineWriter`]: the ordering machinery behind it,
//!   usable on its own with any response sink
//! - [`ClientConnection`]: the client side, sending pipelined requests over TCP
//!
//! Every connection runs on its own child [`Scheduler`](crate::scheduler::Scheduler):
//! closing the connection cancels the responders still working for it.

mod client;
mod http_connection;
mod pipeline;

pub use client::ClientConnection;
pub use http_connection::HttpConnection;
pub use pipeline::PipelineCoordinator;
pub use pipeline::PipelineWriter;
