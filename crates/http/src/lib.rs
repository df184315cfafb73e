//! HTTP/1.1 semantics on top of tokio
//!
//! This crate implements the semantic layer of an HTTP/1.1 stack: cookies, content
//! negotiation, ordered delivery of pipelined responses and client side protocol
//! upgrades. The wire framing underneath is deliberately small: bodies are buffered
//! whole and delimited by `Content-Length`.
//!
//! # Features
//!
//! - `Cookie` and `Set-Cookie` parsing and serialization with every RFC 6265 attribute
//! - `Accept` header parsing, media range matching and preference ordering
//! - Pipelined requests answered concurrently, responses written in request order
//! - Protocol upgrades (`101 Switching Protocols`) with an explicit state machine
//! - Cancellation of all the work of a connection when it closes
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use micro_http_semantics::cookie::CookieAttributeSet;
//! use micro_http_semantics::handler::make_responder;
//! use micro_http_semantics::negotiation::MediaType;
//! use micro_http_semantics::protocol::{BoxError, RequestExt, ResponseExt};
//! use micro_http_semantics::scheduler::Scheduler;
//! use micro_http_semantics::server::start_server;
//! use tracing::{Level, error, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let responder = make_responder(hello_world);
//!     let server = match start_server("127.0.0.1", 8080, responder, |e| error!(cause = %e, "connection failed")).await {
//!         Ok(server) => server,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     info!(address = %server.local_addr(), "started");
//!     server.on_close().await;
//! }
//!
//! async fn hello_world(request: Request<Bytes>, _scheduler: Scheduler) -> Result<Response<Bytes>, BoxError> {
//!     let visits = request.cookies().get("visits").and_then(|c| c.value().parse::<u32>().ok()).unwrap_or(0);
//!
//!     let json = MediaType::new("application", "json");
//!     let body = if request.accept().accepts(&json) {
//!         format!("{{\"visits\":{visits}}}")
//!     } else {
//!         format!("visits: {visits}\r\n")
//!     };
//!
//!     let mut response = Response::builder().status(StatusCode::OK).body(Bytes::from(body))?;
//!     response.set_cookie("visits", &CookieAttributeSet::builder((visits + 1).to_string()).path("/").build())?;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`cookie`]: cookie attribute sets, `Cookie` / `Set-Cookie` codec
//! - [`negotiation`]: media types and `Accept` preferences
//! - [`connection`]: server and client connections, the response pipeline
//! - [`upgrade`]: protocol upgrade negotiation
//! - [`scheduler`]: cancellable tasks, one child scheduler per connection
//! - [`server`]: the TCP accept loop
//! - [`codec`]: HTTP/1.1 framing
//! - [`protocol`]: request and response extensions, the error types
//! - [`handler`]: the [`Responder`](handler::Responder) trait
//! - [`config`]: connection limits
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: top-level error of a served connection
//! - [`protocol::ParseError`]: malformed or oversized messages
//! - [`protocol::SendError`]: messages that can't be written
//! - [`protocol::ConnectionError`]: transport failures, closure and cancellation
//! - [`protocol::UpgradeError`]: rejected or failed upgrades
//!
//! # Limitations
//!
//! - HTTP/1.1 only (currently HTTP/2 or HTTP/3 is not supported)
//! - No TLS support (use a reverse proxy for HTTPS)
//! - No chunked transfer encoding
//! - Maximum header size: 8KB, maximum number of headers: 64 (configurable)

pub mod codec;
pub mod config;
pub mod connection;
pub mod cookie;
pub mod handler;
pub mod negotiation;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod upgrade;

mod utils;
pub(crate) use utils::ensure;
