//! Cookie parsing and serialization.
//!
//! - [`parse`] turns one `name=value; attr...` string into a name and a
//!   [`CookieAttributeSet`]
//! - [`serialize`] renders a cookie for either a `Cookie` or a `Set-Cookie` header
//! - [`parse_cookie_header`] reads every pair of a `Cookie` request header into a
//!   [`CookieMap`]
//!
//! Request cookies never carry attributes, so serializing for
//! [`CookieHeader::Cookie`] and parsing back only preserves the name and the value.

mod attributes;
mod codec;

use std::collections::BTreeMap;
use std::collections::btree_map;

use tracing::debug;

pub use attributes::CookieAttributeSet;
pub use attributes::CookieAttributeSetBuilder;
pub use attributes::SameSite;
pub use attributes::UnknownSameSite;
pub use codec::CookieError;
pub use codec::CookieHeader;
pub use codec::is_valid_name;
pub use codec::parse;
pub use codec::parse_cookie_header;
pub use codec::serialize;

pub(crate) use codec::parse_cookie_header_into;

/// Cookies keyed by name, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieMap {
    inner: BTreeMap<String, CookieAttributeSet>,
}

impl CookieMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CookieAttributeSet> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Inserts a cookie, returning the one previously stored under the same name.
    pub fn insert<S: Into<String>>(&mut self, name: S, cookie: CookieAttributeSet) -> Option<CookieAttributeSet> {
        self.inner.insert(name.into(), cookie)
    }

    pub fn remove(&mut self, name: &str) -> Option<CookieAttributeSet> {
        self.inner.remove(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, CookieAttributeSet> {
        self.inner.iter()
    }

    /// Renders every cookie as one `Cookie` request header value, `a=1; b=2`.
    ///
    /// Cookies whose name is not a token are left out.
    pub fn to_cookie_header(&self) -> String {
        self.inner
            .iter()
            .filter(|(name, _)| {
                let valid = is_valid_name(name);
                if !valid {
                    debug!(name = %name, "cookie name is not a token, left out of the Cookie header");
                }
                valid
            })
            .map(|(name, cookie)| serialize(name, cookie, CookieHeader::Cookie))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<'a> IntoIterator for &'a CookieMap {
    type Item = (&'a String, &'a CookieAttributeSet);
    type IntoIter = btree_map::Iter<'a, String, CookieAttributeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl IntoIterator for CookieMap {
    type Item = (String, CookieAttributeSet);
    type IntoIter = btree_map::IntoIter<String, CookieAttributeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, CookieAttributeSet)> for CookieMap {
    fn from_iter<T: IntoIterator<Item = (S, CookieAttributeSet)>>(iter: T) -> Self {
        let mut cookies = CookieMap::new();
        cookies.extend(iter);
        cookies
    }
}

impl<S: Into<String>> Extend<(S, CookieAttributeSet)> for CookieMap {
    fn extend<T: IntoIterator<Item = (S, CookieAttributeSet)>>(&mut self, iter: T) {
        for (name, cookie) in iter {
            self.insert(name, cookie);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_round_trip() {
        let cookies: CookieMap =
            [("b", CookieAttributeSet::new("2")), ("a", CookieAttributeSet::new("x y"))].into_iter().collect();

        let header = cookies.to_cookie_header();
        assert_eq!(header, r#"a="x y"; b=2"#);
        assert_eq!(parse_cookie_header(&header), cookies);
    }

    #[test]
    fn cookie_header_leaves_out_invalid_names() {
        let cookies: CookieMap = [
            ("a=b", CookieAttributeSet::new("v")),
            ("ok", CookieAttributeSet::new("1")),
            ("x; y", CookieAttributeSet::new("2")),
        ]
        .into_iter()
        .collect();

        assert_eq!(cookies.to_cookie_header(), "ok=1");
    }

    #[test]
    fn insert_replaces() {
        let mut cookies = CookieMap::new();
        assert!(cookies.insert("a", CookieAttributeSet::new("1")).is_none());
        let previous = cookies.insert("a", CookieAttributeSet::new("2"));

        assert_eq!(previous.as_ref().map(CookieAttributeSet::value), Some("1"));
        assert_eq!(cookies.len(), 1);
        assert!(cookies.contains("a"));
        assert_eq!(cookies.remove("a").as_ref().map(CookieAttributeSet::value), Some("2"));
        assert!(cookies.is_empty());
    }
}
