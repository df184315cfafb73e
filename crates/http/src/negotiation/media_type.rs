use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use mime::Mime;

/// The wildcard token accepted in place of a type or a subtype.
pub const WILDCARD: &str = "*";

/// A media type or media range such as `text/html`, `text/*` or `*/*`.
///
/// Type, subtype and parameter names are kept lower-cased, parameter values as
/// written. Equality ignores the order parameters were given in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    parameters: BTreeMap<String, String>,
}

impl MediaType {
    pub fn new<T: AsRef<str>, S: AsRef<str>>(type_: T, subtype: S) -> Self {
        Self {
            type_: type_.as_ref().to_ascii_lowercase(),
            subtype: subtype.as_ref().to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    /// `*/*`
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn with_parameter<K: AsRef<str>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.parameters.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    #[inline]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    #[inline]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    #[inline]
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// `type/subtype` without parameters
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Returns true for `*/*`.
    pub fn is_any(&self) -> bool {
        self.type_ == WILDCARD && self.subtype == WILDCARD
    }

    /// Returns true for `type/*` ranges, including `*/*`.
    pub fn is_subtype_wildcard(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// Builds a media type from a parsed [`Mime`], skipping the parameters `skip`
    /// returns true for.
    pub(crate) fn from_mime_filtered<F>(mime: &Mime, skip: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let (type_, subtype) = mime.essence_str().split_once('/').unwrap_or((mime.essence_str(), WILDCARD));
        let mut media_type = MediaType::new(type_, subtype);
        for (name, value) in mime.params() {
            if !skip(name.as_str()) {
                media_type = media_type.with_parameter(name.as_str(), value.as_str());
            }
        }
        media_type
    }
}

impl From<&Mime> for MediaType {
    fn from(mime: &Mime) -> Self {
        MediaType::from_mime_filtered(mime, |_| false)
    }
}

impl From<Mime> for MediaType {
    fn from(mime: Mime) -> Self {
        MediaType::from(&mime)
    }
}

impl TryFrom<&MediaType> for Mime {
    type Error = mime::FromStrError;

    fn try_from(media_type: &MediaType) -> Result<Self, Self::Error> {
        media_type.to_string().parse()
    }
}

impl FromStr for MediaType {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).parse::<Mime>().map(MediaType::from)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

/// Drops the optional whitespace around `;` and `=` that the mime grammar refuses.
pub(crate) fn normalize(raw: &str) -> String {
    raw.split(';')
        .map(|part| match part.split_once('=') {
            Some((name, value)) => format!("{}={}", name.trim(), value.trim()),
            None => part.trim().to_owned(),
        })
        .collect::<Vec<_>>()
        .join(";")
}
