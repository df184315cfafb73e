//! `Accept` header parsing and media type preference comparison.
//!
//! refer: [RFC 9110 section 12.5.1](https://www.rfc-editor.org/rfc/rfc9110#section-12.5.1)

use std::cmp::Ordering;

use mime::Mime;
use tracing::trace;

use super::MediaType;
use super::media_type::{WILDCARD, normalize};

const QUALITY_PARAM: &str = "q";

/// How specifically an [`AcceptEntry`] matched a media type, least specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// matched through `*/*`
    Universal,
    /// matched through `type/*`
    SubtypeWildcard,
    /// identical type and subtype
    Exact,
}

/// One media range of an `Accept` header together with its quality value.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    media_type: MediaType,
    quality: f32,
}

impl AcceptEntry {
    /// Creates an entry, clamping `quality` into `[0, 1]`. NaN becomes 1.0.
    pub fn new(media_type: MediaType, quality: f32) -> Self {
        let quality = if quality.is_nan() { 1.0 } else { quality.clamp(0.0, 1.0) };
        Self { media_type, quality }
    }

    #[inline]
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    #[inline]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Returns how this entry matches `candidate`, or `None` if it doesn't.
    pub fn matches(&self, candidate: &MediaType) -> Option<Precedence> {
        let range = &self.media_type;
        if range.type_() == candidate.type_() && range.subtype() == candidate.subtype() {
            Some(Precedence::Exact)
        } else if range.type_() == candidate.type_() && range.subtype() == WILDCARD {
            Some(Precedence::SubtypeWildcard)
        } else if range.is_any() {
            Some(Precedence::Universal)
        } else {
            None
        }
    }
}

/// Parses an `Accept` header value, keeping the textual order of its entries.
///
/// Items that aren't media ranges are skipped, a missing or unusable `q` means 1.0
/// and out of range values are clamped.
///
/// ```
/// use micro_http_semantics::negotiation::parse_accept;
///
/// let entries = parse_accept("text/html, application/xml;q=0.9, */*;q=0.8");
/// assert_eq!(entries.len(), 3);
/// assert_eq!(entries[1].media_type().essence(), "application/xml");
/// assert_eq!(entries[1].quality(), 0.9);
/// ```
pub fn parse_accept(raw: &str) -> Vec<AcceptEntry> {
    raw.split(',').filter(|item| !item.trim().is_empty()).filter_map(parse_entry).collect()
}

fn parse_entry(item: &str) -> Option<AcceptEntry> {
    let mime = match normalize(item).parse::<Mime>() {
        Ok(mime) => mime,
        Err(e) => {
            trace!(item, cause = %e, "skip invalid media range");
            return None;
        }
    };

    let quality = mime.get_param(QUALITY_PARAM).map_or(1.0, |q| parse_quality(q.as_str()));
    let media_type = MediaType::from_mime_filtered(&mime, |name| name.eq_ignore_ascii_case(QUALITY_PARAM));
    Some(AcceptEntry::new(media_type, quality))
}

fn parse_quality(raw: &str) -> f32 {
    match raw.trim().parse::<f32>() {
        Ok(quality) => quality,
        Err(_) => {
            trace!(quality = raw, "invalid quality value, fallback to 1.0");
            1.0
        }
    }
}

/// The best entry for `candidate`: the most specific match, then the highest quality.
fn best_match(candidate: &MediaType, context: &[AcceptEntry]) -> Option<(Precedence, f32)> {
    context
        .iter()
        .filter_map(|entry| entry.matches(candidate).map(|precedence| (precedence, entry.quality())))
        .max_by(|(p1, q1), (p2, q2)| p1.cmp(p2).then(q1.total_cmp(q2)))
}

/// Compares how much `context` prefers `a` over `b`.
///
/// Each candidate is resolved to its best matching entry (most specific first,
/// highest quality among equally specific ones). The results are ordered by quality,
/// ties broken by specificity. A candidate that matches nothing ranks below every
/// candidate that matches something, even with `q=0`.
///
/// Returns [`Ordering::Greater`] if `a` is preferred.
pub fn compare_preference(a: &MediaType, b: &MediaType, context: &[AcceptEntry]) -> Ordering {
    match (best_match(a, context), best_match(b, context)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some((p1, q1)), Some((p2, q2))) => q1.total_cmp(&q2).then(p1.cmp(&p2)),
    }
}

/// A parsed `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct Accept {
    entries: Vec<AcceptEntry>,
}

impl Accept {
    pub fn parse(raw: &str) -> Self {
        Self { entries: parse_accept(raw) }
    }

    /// `*/*`, what a request without an `Accept` header means.
    pub fn any() -> Self {
        Self { entries: vec![AcceptEntry::new(MediaType::any(), 1.0)] }
    }

    pub fn entries(&self) -> &[AcceptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// See [`compare_preference`].
    pub fn compare(&self, a: &MediaType, b: &MediaType) -> Ordering {
        compare_preference(a, b, &self.entries)
    }

    /// The quality of the entry `candidate` resolves to, `None` if nothing matches.
    pub fn quality_of(&self, candidate: &MediaType) -> Option<f32> {
        best_match(candidate, &self.entries).map(|(_, quality)| quality)
    }

    /// Returns true if some entry matches `candidate` with a non zero quality.
    pub fn accepts(&self, candidate: &MediaType) -> bool {
        self.quality_of(candidate).is_some_and(|quality| quality > 0.0)
    }

    /// Picks the most preferred acceptable candidate, the earliest one on ties.
    pub fn preferred<'c>(&self, candidates: &'c [MediaType]) -> Option<&'c MediaType> {
        let mut best: Option<&MediaType> = None;
        for candidate in candidates.iter().filter(|candidate| self.accepts(candidate)) {
            match best {
                Some(current) if self.compare(candidate, current) != Ordering::Greater => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

impl Default for Accept {
    fn default() -> Self {
        Self::any()
    }
}

impl FromIterator<AcceptEntry> for Accept {
    fn from_iter<T: IntoIterator<Item = AcceptEntry>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
