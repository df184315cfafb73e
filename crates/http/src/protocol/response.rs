//! HTTP response header handling.
//!
//! [`ResponseHead`] is a response before its body is attached, [`ResponseExt`] reads
//! and writes `Set-Cookie` headers.

use http::header::SET_COOKIE;
use http::{HeaderValue, Response};

use crate::cookie::{CookieAttributeSet, CookieError, CookieHeader, CookieMap, is_valid_name, parse, serialize};

/// Type alias for HTTP response headers.
pub type ResponseHead = Response<()>;

pub trait ResponseExt {
    /// Appends a `Set-Cookie` header carrying `cookie` and its attributes.
    ///
    /// Fails if `name` is not a token or the serialized cookie is not a valid header value.
    fn set_cookie(&mut self, name: &str, cookie: &CookieAttributeSet) -> Result<(), CookieError>;

    /// Every cookie set by the response, attributes included.
    fn cookies(&self) -> CookieMap;
}

impl<B> ResponseExt for Response<B> {
    fn set_cookie(&mut self, name: &str, cookie: &CookieAttributeSet) -> Result<(), CookieError> {
        if !is_valid_name(name) {
            return Err(CookieError::invalid_name(name));
        }
        let value = HeaderValue::try_from(serialize(name, cookie, CookieHeader::SetCookie))?;
        self.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }

    fn cookies(&self) -> CookieMap {
        self.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::SameSite;

    #[test]
    fn set_cookie_round_trip() {
        let mut response = Response::new(());
        let session = CookieAttributeSet::builder("abc").path("/").http_only(true).same_site(SameSite::Strict).build();
        response.set_cookie("session", &session).unwrap();
        response.set_cookie("theme", &CookieAttributeSet::new("dark")).unwrap();

        let values: Vec<_> = response.headers().get_all(SET_COOKIE).iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(values, vec!["session=abc; Path=/; HttpOnly; SameSite=Strict", "theme=dark"]);

        let cookies = response.cookies();
        assert_eq!(cookies.get("session"), Some(&session));
        assert_eq!(cookies.get("theme").map(CookieAttributeSet::value), Some("dark"));
    }

    #[test]
    fn set_cookie_rejects_control_characters() {
        let mut response = Response::new(());
        assert!(response.set_cookie("bad", &CookieAttributeSet::new("a\nb")).is_err());
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn set_cookie_rejects_names_that_are_not_tokens() {
        let mut response = Response::new(());

        let error = response.set_cookie("a=b", &CookieAttributeSet::new("v")).unwrap_err();
        assert!(matches!(error, CookieError::InvalidName { ref name } if name == "a=b"));
        assert!(response.set_cookie("a b", &CookieAttributeSet::new("v")).is_err());
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
