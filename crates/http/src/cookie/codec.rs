//! Textual form of cookies, as carried by `Cookie` and `Set-Cookie` headers.
//!
//! Parsing never fails loudly: malformed input yields `None` (or is skipped inside a
//! `Cookie` header) and unusable attributes are dropped, following
//! [RFC 6265 section 5.2](https://www.rfc-editor.org/rfc/rfc6265#section-5.2).

use std::fmt::Write;

use http::HeaderName;
use http::header::{COOKIE, InvalidHeaderValue, SET_COOKIE};
use tracing::trace;

use super::{CookieAttributeSet, CookieAttributeSetBuilder, CookieMap, SameSite};
use crate::utils::split_unquoted;

/// The header a cookie is serialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieHeader {
    /// Request side, `name=value` only
    Cookie,
    /// Response side, `name=value` followed by the attributes
    SetCookie,
}

impl CookieHeader {
    pub fn header_name(&self) -> HeaderName {
        match self {
            CookieHeader::Cookie => COOKIE,
            CookieHeader::SetCookie => SET_COOKIE,
        }
    }
}

/// Error returned when a cookie can't be turned into a header.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("invalid cookie name {name:?}, expected a token")]
    InvalidName { name: String },

    #[error("invalid cookie header value: {source}")]
    InvalidHeaderValue {
        #[from]
        source: InvalidHeaderValue,
    },
}

impl CookieError {
    pub fn invalid_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidName { name: name.into() }
    }
}

/// Returns true if `name` is a non empty RFC 7230 token, the only names
/// [`serialize`] renders unambiguously.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_tchar)
}

/// Parses a single cookie: `name=value` optionally followed by `; attribute[=value]`.
///
/// Returns `None` if there is no `=` or the name is empty.
///
/// ```
/// use micro_http_semantics::cookie::parse;
///
/// let (name, cookie) = parse("vapor=; Secure; HttpOnly").unwrap();
/// assert_eq!(name, "vapor");
/// assert_eq!(cookie.value(), "");
/// assert!(cookie.is_secure() && cookie.is_http_only());
/// ```
pub fn parse(raw: &str) -> Option<(String, CookieAttributeSet)> {
    let Some(eq) = raw.find('=') else {
        trace!(cookie = raw, "cookie without '=', ignored");
        return None;
    };

    let name = raw[..eq].trim();
    if name.is_empty() || name.contains(';') {
        trace!(cookie = raw, "cookie without name, ignored");
        return None;
    }

    let (value, attributes) = split_value(&raw[eq + 1..]);

    let mut builder = CookieAttributeSet::builder(value);
    for attribute in attributes.split(';') {
        builder = apply_attribute(builder, attribute);
    }

    Some((name.to_owned(), builder.build()))
}

/// Serializes a cookie for the given header.
///
/// For [`CookieHeader::Cookie`] the output is exactly `name=value`. For
/// [`CookieHeader::SetCookie`] the present attributes follow in the order
/// `Expires, Max-Age, Domain, Path, Secure, HttpOnly, SameSite`.
///
/// `name` is written as given, callers building headers check it with
/// [`is_valid_name`] first.
pub fn serialize(name: &str, cookie: &CookieAttributeSet, header: CookieHeader) -> String {
    let mut buf = String::with_capacity(name.len() + cookie.value().len() + 1);
    buf.push_str(name);
    buf.push('=');
    write_value(&mut buf, cookie.value());

    if header == CookieHeader::Cookie {
        return buf;
    }

    if let Some(expires) = cookie.expires() {
        buf.push_str("; Expires=");
        buf.push_str(&httpdate::fmt_http_date(expires));
    }
    if let Some(max_age) = cookie.max_age() {
        // writing into a String can't fail
        let _ = write!(buf, "; Max-Age={max_age}");
    }
    if let Some(domain) = cookie.domain() {
        buf.push_str("; Domain=");
        buf.push_str(domain);
    }
    if let Some(path) = cookie.path() {
        buf.push_str("; Path=");
        buf.push_str(path);
    }
    if cookie.is_secure() {
        buf.push_str("; Secure");
    }
    if cookie.is_http_only() {
        buf.push_str("; HttpOnly");
    }
    if let Some(same_site) = cookie.same_site() {
        buf.push_str("; SameSite=");
        buf.push_str(same_site.as_str());
    }

    buf
}

/// Parses a `Cookie` request header (`a=1; b=2`) into a [`CookieMap`].
///
/// Pairs that don't parse are skipped, a repeated name keeps the last value.
pub fn parse_cookie_header(raw: &str) -> CookieMap {
    let mut cookies = CookieMap::new();
    parse_cookie_header_into(raw, &mut cookies);
    cookies
}

pub(crate) fn parse_cookie_header_into(raw: &str, cookies: &mut CookieMap) {
    for pair in split_unquoted(raw, b';') {
        if pair.trim().is_empty() {
            continue;
        }
        // request cookies carry no attributes, only the value is kept
        if let Some((name, cookie)) = parse(pair) {
            cookies.insert(name, CookieAttributeSet::new(cookie.value()));
        }
    }
}

/// Splits what follows `name=` into the value and the attribute list.
fn split_value(rest: &str) -> (String, &str) {
    let trimmed = rest.trim_start();
    if let Some(quoted) = trimmed.strip_prefix('"') {
        if let Some(end) = closing_quote(quoted) {
            let remainder = &quoted[end + 1..];
            let (trailing, attributes) = remainder.split_once(';').unwrap_or((remainder, ""));
            if trailing.trim().is_empty() {
                return (unescape(&quoted[..end]), attributes);
            }
            trace!(value = rest, "text after closing quote, value taken literally");
        }
        // an unterminated quote is taken literally
    }

    match rest.find(';') {
        Some(i) => (rest[..i].trim().to_owned(), &rest[i + 1..]),
        None => (rest.trim().to_owned(), ""),
    }
}

fn closing_quote(quoted: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in quoted.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    value
}

fn apply_attribute(builder: CookieAttributeSetBuilder, raw: &str) -> CookieAttributeSetBuilder {
    let raw = raw.trim();
    if raw.is_empty() {
        return builder;
    }

    let (name, value) = match raw.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (raw, None),
    };

    match (name.to_ascii_lowercase().as_str(), value) {
        ("expires", Some(value)) => match httpdate::parse_http_date(value) {
            Ok(expires) => builder.expires(expires),
            Err(_) => {
                trace!(expires = value, "unparsable Expires attribute, ignored");
                builder
            }
        },
        ("max-age", Some(value)) => match value.parse::<i64>() {
            // zero or negative means the cookie expires right away
            Ok(seconds) => builder.max_age(u64::try_from(seconds).unwrap_or(0)),
            Err(_) => {
                trace!(max_age = value, "non numeric Max-Age attribute, ignored");
                builder
            }
        },
        ("domain", Some(value)) => builder.domain(value),
        ("path", Some(value)) => builder.path(value),
        ("secure", _) => builder.secure(true),
        ("httponly", _) => builder.http_only(true),
        ("samesite", Some(value)) => match value.parse::<SameSite>() {
            Ok(same_site) => builder.same_site(same_site),
            Err(_) => {
                trace!(same_site = value, "unknown SameSite attribute, ignored");
                builder
            }
        },
        _ => {
            trace!(attribute = raw, "unknown cookie attribute, ignored");
            builder
        }
    }
}

/// tchar from RFC 7230 section 3.2.6
#[inline]
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// cookie-octet from RFC 6265 section 4.1.1
#[inline]
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

fn write_value(buf: &mut String, value: &str) {
    if value.bytes().all(is_cookie_octet) {
        buf.push_str(value);
        return;
    }

    buf.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}
