//! Content negotiation over the `Accept` request header.
//!
//! [`parse_accept`] turns a header value into weighted [`AcceptEntry`] values and
//! [`compare_preference`] decides which of two media types the client prefers. The
//! [`Accept`] type bundles both for use in responders.
//!
//! Preference is decided by the quality value of the entry each candidate resolves
//! to, and only then by how specific that entry is. The position of an entry in the
//! header never matters.

mod accept;
mod media_type;

pub use accept::Accept;
pub use accept::AcceptEntry;
pub use accept::Precedence;
pub use accept::compare_preference;
pub use accept::parse_accept;
pub use media_type::MediaType;
pub use media_type::WILDCARD;
