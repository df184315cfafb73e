use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Latest instant an HTTP-date can express, `Fri, 31 Dec 9999 23:59:59 GMT`.
const MAX_HTTP_DATE: Duration = Duration::from_secs(253_402_300_799);

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `SameSite` token is not one of `Strict`, `Lax` or `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SameSite value")]
pub struct UnknownSameSite;

impl FromStr for SameSite {
    type Err = UnknownSameSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strict") {
            Ok(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Ok(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(SameSite::None)
        } else {
            Err(UnknownSameSite)
        }
    }
}

/// The value of a cookie together with its `Set-Cookie` attributes.
///
/// The value is always present, though it may be empty (`vapor=`). Instances are
/// immutable, build them with [`CookieAttributeSet::builder`] or obtain them from
/// [`parse`](super::parse).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieAttributeSet {
    value: String,
    expires: Option<SystemTime>,
    max_age: Option<u64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl CookieAttributeSet {
    /// A cookie carrying only a value, as found in a `Cookie` request header.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self { value: value.into(), ..Default::default() }
    }

    pub fn builder<S: Into<String>>(value: S) -> CookieAttributeSetBuilder {
        CookieAttributeSetBuilder { inner: Self::new(value) }
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// `Max-Age` in seconds.
    #[inline]
    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    #[inline]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[inline]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[inline]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    #[inline]
    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    #[inline]
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Returns true if any attribute besides the value is set.
    pub fn has_attributes(&self) -> bool {
        self.expires.is_some()
            || self.max_age.is_some()
            || self.domain.is_some()
            || self.path.is_some()
            || self.secure
            || self.http_only
            || self.same_site.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CookieAttributeSetBuilder {
    inner: CookieAttributeSet,
}

impl CookieAttributeSetBuilder {
    /// Instants outside the HTTP-date range are clamped to 1970 or to the year 9999.
    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.inner.expires = Some(clamp_http_date(expires));
        self
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.inner.max_age = Some(seconds);
        self
    }

    /// Characters outside `av-octet` (controls, `;`, non ASCII) are dropped.
    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.inner.domain = Some(attribute_value(domain.into()));
        self
    }

    /// Characters outside `av-octet` (controls, `;`, non ASCII) are dropped.
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.inner.path = Some(attribute_value(path.into()));
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.inner.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.inner.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.inner.same_site = Some(same_site);
        self
    }

    pub fn build(self) -> CookieAttributeSet {
        self.inner
    }
}

fn clamp_http_date(time: SystemTime) -> SystemTime {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since_epoch) if since_epoch <= MAX_HTTP_DATE => time,
        Ok(_) => SystemTime::UNIX_EPOCH + MAX_HTTP_DATE,
        Err(_) => SystemTime::UNIX_EPOCH,
    }
}

/// av-octet from RFC 6265 section 4.1.1
#[inline]
fn is_av_octet(c: char) -> bool {
    matches!(c, ' '..=':' | '<'..='~')
}

fn attribute_value(mut value: String) -> String {
    if !value.chars().all(is_av_octet) {
        value.retain(is_av_octet);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_tokens() {
        assert_eq!("strict".parse::<SameSite>(), Ok(SameSite::Strict));
        assert_eq!("LAX".parse::<SameSite>(), Ok(SameSite::Lax));
        assert_eq!(" None ".parse::<SameSite>(), Ok(SameSite::None));
        assert_eq!("sometimes".parse::<SameSite>(), Err(UnknownSameSite));
    }

    #[test]
    fn builder_sets_every_attribute() {
        let expires = SystemTime::UNIX_EPOCH + Duration::from_secs(1_445_412_480);
        let cookie = CookieAttributeSet::builder("a3fWa")
            .expires(expires)
            .max_age(60)
            .domain("example.com")
            .path("/docs")
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();

        assert_eq!(cookie.value(), "a3fWa");
        assert_eq!(cookie.expires(), Some(expires));
        assert_eq!(cookie.max_age(), Some(60));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.path(), Some("/docs"));
        assert!(cookie.is_secure());
        assert!(cookie.is_http_only());
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(cookie.has_attributes());
    }

    #[test]
    fn expires_is_clamped_to_http_dates() {
        let before_epoch = SystemTime::UNIX_EPOCH - Duration::from_secs(1);
        let cookie = CookieAttributeSet::builder("v").expires(before_epoch).build();
        assert_eq!(cookie.expires(), Some(SystemTime::UNIX_EPOCH));

        let year_10000 = SystemTime::UNIX_EPOCH + MAX_HTTP_DATE + Duration::from_secs(86_400);
        let cookie = CookieAttributeSet::builder("v").expires(year_10000).build();
        assert_eq!(cookie.expires(), Some(SystemTime::UNIX_EPOCH + MAX_HTTP_DATE));
    }

    #[test]
    fn domain_and_path_drop_separators_and_controls() {
        let cookie = CookieAttributeSet::builder("v").path("/; Domain=evil.example").domain("exa\r\nmple.com;").build();

        assert_eq!(cookie.path(), Some("/ Domain=evil.example"));
        assert_eq!(cookie.domain(), Some("example.com"));
    }

    #[test]
    fn plain_value_has_no_attributes() {
        let cookie = CookieAttributeSet::new("");
        assert_eq!(cookie.value(), "");
        assert!(!cookie.has_attributes());
    }
}
