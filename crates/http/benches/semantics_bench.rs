use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use http::{Request, Response};
use micro_http_semantics::codec::{RequestDecoder, ResponseEncoder};
use micro_http_semantics::cookie::{CookieAttributeSet, CookieHeader, SameSite, parse, parse_cookie_header, serialize};
use futures::SinkExt;
use micro_http_semantics::connection::PipelineCoordinator;
use micro_http_semantics::handler::make_responder;
use micro_http_semantics::negotiation::{Accept, MediaType};
use micro_http_semantics::protocol::{BoxError, SendError};
use micro_http_semantics::scheduler::Scheduler;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

const COOKIE_HEADER: &str = "session=38afes7a8; theme=dark; lang=en-US; tracking=\"a b c\"; _ga=GA1.2.1234567890.1234567890";
const SET_COOKIE_HEADER: &str = "session=38afes7a8; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=3600; Domain=example.com; Path=/; Secure; HttpOnly; SameSite=Lax";
const ACCEPT_HEADER: &str = "text/html, application/xhtml+xml, application/xml;q=0.9, image/webp, */*;q=0.8";

fn bench_cookies(c: &mut Criterion) {
    c.bench_function("parse_cookie_header", |b| {
        b.iter(|| black_box(parse_cookie_header(black_box(COOKIE_HEADER))));
    });

    c.bench_function("parse_set_cookie", |b| {
        b.iter(|| black_box(parse(black_box(SET_COOKIE_HEADER))));
    });

    let cookie = CookieAttributeSet::builder("38afes7a8")
        .max_age(3600)
        .domain("example.com")
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    c.bench_function("serialize_set_cookie", |b| {
        b.iter(|| black_box(serialize("session", black_box(&cookie), CookieHeader::SetCookie)));
    });
}

fn bench_accept(c: &mut Criterion) {
    c.bench_function("parse_accept", |b| {
        b.iter(|| black_box(Accept::parse(black_box(ACCEPT_HEADER))));
    });

    let accept = Accept::parse(ACCEPT_HEADER);
    let candidates = vec![MediaType::new("application", "json"), MediaType::new("application", "xml"), MediaType::new("text", "html")];
    c.bench_function("preferred_media_type", |b| {
        b.iter(|| black_box(accept.preferred(black_box(&candidates))));
    });
}

fn bench_codec(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\nCookie: a=1; b=2\r\n\r\n";
    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::default();
            let mut bytes = BytesMut::from(&request[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    let response = Response::new(Bytes::from_static(b"Hello World!"));
    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut bytes = BytesMut::new();
            ResponseEncoder::new().encode(response.clone(), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let responder = Arc::new(make_responder(|request: Request<Bytes>, _scheduler: Scheduler| async move {
        Ok::<_, BoxError>(Response::new(request.into_body()))
    }));

    c.bench_function("pipeline_16_requests", |b| {
        b.to_async(&runtime).iter(|| {
            let responder = Arc::clone(&responder);
            async move {
                let (mut coordinator, writer) = PipelineCoordinator::new(responder, Scheduler::current(), 16);
                for _ in 0..16 {
                    coordinator.dispatch(Request::new(Bytes::from_static(b"ping"))).await.unwrap();
                }
                drop(coordinator);

                let mut sink = futures::sink::drain::<Response<Bytes>>().sink_map_err(|never| -> SendError { match never {} });
                writer.drain(&mut sink).await.unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_cookies, bench_accept, bench_codec, bench_pipeline);
criterion_main!(benches);
