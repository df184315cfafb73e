//! Client side protocol upgrades (`Connection: Upgrade`).
//!
//! An [`Upgrader`] describes one upgrade: the request asking for it, what a valid answer
//! looks like, and how to build the upgraded protocol from the raw connection. The
//! [`UpgradeNegotiator`] runs the exchange and tracks its [`UpgradeState`]:
//!
//! ```text
//! Idle -> RequestSent -> Upgraded
//!                     -> Rejected(status)   the peer answered, but refused
//!                     -> Failed             no valid answer, or the upgrader failed
//! ```
//!
//! [`ProtocolUpgrader`] covers the common case of switching to a named protocol and
//! handing back the connection as an [`Upgraded`] stream.

mod negotiator;
mod protocol;

pub use negotiator::UpgradeNegotiator;
pub use protocol::ProtocolUpgrader;
pub use protocol::Upgraded;

use async_trait::async_trait;
use bytes::BytesMut;
use http::{Request, StatusCode};

use crate::protocol::{BoxError, ResponseHead};

/// One protocol upgrade over a connection of type `IO`.
#[async_trait]
pub trait Upgrader<IO>: Send + Sized {
    type Output;

    /// The request asking the peer to switch protocols.
    fn build_request(&self) -> Request<()>;

    /// Whether `response` accepts the upgrade.
    fn is_valid_response(&self, response: &ResponseHead) -> bool;

    /// Builds the upgraded protocol once the peer accepted the switch.
    async fn upgrade(self, context: UpgradeContext<IO>, response: ResponseHead) -> Result<Self::Output, BoxError>;
}

/// Progress of an [`UpgradeNegotiator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    Idle,
    RequestSent,
    Upgraded,
    Rejected(StatusCode),
    Failed,
}

impl UpgradeState {
    /// Whether the negotiation is over, successfully or not.
    pub fn is_finished(&self) -> bool {
        !matches!(self, UpgradeState::Idle | UpgradeState::RequestSent)
    }
}

/// The connection handed to [`Upgrader::upgrade`].
///
/// `read_buf` holds the bytes the peer sent right after its answer, they belong to the
/// upgraded protocol and must be consumed before reading from `io`.
#[derive(Debug)]
pub struct UpgradeContext<IO> {
    io: IO,
    read_buf: BytesMut,
}

impl<IO> UpgradeContext<IO> {
    pub fn new(io: IO, read_buf: BytesMut) -> Self {
        Self { io, read_buf }
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn read_buf(&self) -> &[u8] {
        &self.read_buf
    }

    pub fn into_parts(self) -> (IO, BytesMut) {
        (self.io, self.read_buf)
    }
}
