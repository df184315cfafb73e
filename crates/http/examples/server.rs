//! A small server greeting visitors, counting visits with a cookie and answering JSON
//! to clients that prefer it.
//!
//! ```shell
//! cargo run --example server
//! curl -v -H 'Accept: application/json' http://127.0.0.1:8080/
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use micro_http_semantics::cookie::CookieAttributeSet;
use micro_http_semantics::handler::make_responder;
use micro_http_semantics::negotiation::MediaType;
use micro_http_semantics::protocol::{BoxError, RequestExt, ResponseExt};
use micro_http_semantics::scheduler::Scheduler;
use micro_http_semantics::server::start_server;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let responder = make_responder(greet);
    let server = match start_server("127.0.0.1", 8080, responder, |e| error!(cause = %e, "connection failed")).await {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    info!(address = %server.local_addr(), "start listening");
    tokio::select! {
        () = server.on_close() => {}
        _ = tokio::signal::ctrl_c() => server.shutdown(),
    }
}

async fn greet(request: Request<Bytes>, scheduler: Scheduler) -> Result<Response<Bytes>, BoxError> {
    let path = request.uri().path().to_string();
    info!(path, "request");

    if path == "/slow" {
        scheduler.sleep(Duration::from_secs(1)).await?;
    }

    let visits = request.cookies().get("visits").and_then(|cookie| cookie.value().parse::<u64>().ok()).unwrap_or(0) + 1;

    let json = MediaType::new("application", "json");
    let text = MediaType::new("text", "plain");
    let offered = [json.clone(), text.clone()];
    let (content_type, body) = match request.accept().preferred(&offered) {
        Some(media_type) if *media_type == json => (json, format!("{{\"path\":\"{path}\",\"visits\":{visits}}}")),
        Some(_) => (text, format!("Hello World! visit {visits} of {path}\r\n")),
        None => {
            return Ok(Response::builder().status(StatusCode::NOT_ACCEPTABLE).body(Bytes::new())?);
        }
    };

    let mut response =
        Response::builder().status(StatusCode::OK).header(CONTENT_TYPE, content_type.to_string()).body(Bytes::from(body))?;
    response.set_cookie("visits", &CookieAttributeSet::builder(visits.to_string()).path("/").http_only(true).build())?;
    Ok(response)
}
