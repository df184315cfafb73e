//! HTTP request header handling.
//!
//! [`RequestHeader`] wraps a bodyless `http::Request<()>` as produced by the request
//! decoder, [`RequestExt`] exposes the cookies and the `Accept` preferences of any
//! request.

use http::header::{ACCEPT, COOKIE};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::cookie::{CookieMap, parse_cookie_header_into};
use crate::negotiation::{Accept, parse_accept};

/// Represents an HTTP request header.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

/// Semantic accessors over the headers of a request.
pub trait RequestExt {
    /// Every cookie of every `Cookie` header, the last duplicate wins.
    fn cookies(&self) -> CookieMap;

    /// The `Accept` preferences, `*/*` when the header is absent.
    fn accept(&self) -> Accept;
}

impl<B> RequestExt for Request<B> {
    fn cookies(&self) -> CookieMap {
        cookies_of(self.headers())
    }

    fn accept(&self) -> Accept {
        accept_of(self.headers())
    }
}

impl RequestExt for RequestHeader {
    fn cookies(&self) -> CookieMap {
        cookies_of(self.headers())
    }

    fn accept(&self) -> Accept {
        accept_of(self.headers())
    }
}

fn cookies_of(headers: &HeaderMap) -> CookieMap {
    let mut cookies = CookieMap::new();
    for value in headers.get_all(COOKIE) {
        // a header that isn't visible ASCII can't hold cookies
        if let Ok(value) = value.to_str() {
            parse_cookie_header_into(value, &mut cookies);
        }
    }
    cookies
}

fn accept_of(headers: &HeaderMap) -> Accept {
    let mut values = headers.get_all(ACCEPT).iter().peekable();
    if values.peek().is_none() {
        return Accept::any();
    }

    values
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_accept)
        .collect()
}
