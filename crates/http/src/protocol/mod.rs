//! Protocol types shared by the codec, the connections and the semantic modules.
//!
//! - **Request Processing** ([`request`]): [`RequestHeader`] and [`RequestExt`] for
//!   cookie and `Accept` access
//! - **Response Processing** ([`response`]): [`ResponseHead`] and [`ResponseExt`] for
//!   `Set-Cookie` headers
//! - **Error Handling** ([`error`]): the error taxonomy
//!   - [`HttpError`]: top-level error of a connection
//!   - [`ParseError`]: malformed or oversized messages
//!   - [`SendError`]: response or request writing errors
//!   - [`ConnectionError`]: transport failures, closure and cancellation
//!   - [`UpgradeError`]: rejected or failed protocol upgrades
//!   - [`TaskError`]: scheduled tasks that never produced a value

mod request;
pub use request::RequestExt;
pub use request::RequestHeader;

mod response;
pub use response::ResponseExt;
pub use response::ResponseHead;

mod error;
pub use error::BoxError;
pub use error::ConnectionError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::TaskError;
pub use error::UpgradeError;
