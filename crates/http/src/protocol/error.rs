use std::error::Error;
use std::io;

use http::StatusCode;
use thiserror::Error;

/// Boxed error returned by responders and upgraders.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("connection error: {source}")]
    ConnectionError {
        #[from]
        source: ConnectionError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-encoding: {encoding}")]
    UnsupportedTransferEncoding { encoding: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { encoding: str.to_string() }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid head: {reason}")]
    InvalidHead { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Transport level failures: the peer was never reached, went away, or the
/// connection was torn down locally.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("can't connect to {address}: {source}")]
    Connect { address: String, source: io::Error },

    #[error("can't bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("connection closed")]
    Closed,

    #[error("connection cancelled")]
    Cancelled,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("malformed message: {source}")]
    Protocol {
        #[from]
        source: ParseError,
    },

    #[error("can't send message: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

impl ConnectionError {
    pub fn connect<A: ToString>(address: A, source: io::Error) -> Self {
        Self::Connect { address: address.to_string(), source }
    }

    pub fn bind<A: ToString>(address: A, source: io::Error) -> Self {
        Self::Bind { address: address.to_string(), source }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConnectionError::Cancelled)
    }
}

/// Failure of a protocol upgrade attempt.
///
/// [`UpgradeError::Rejected`] means the peer answered and refused the switch,
/// [`UpgradeError::Connection`] means no valid answer was ever received.
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("protocol upgrade rejected with status {status}")]
    Rejected { status: StatusCode },

    #[error("protocol upgrade failed: {source}")]
    Connection {
        #[from]
        source: ConnectionError,
    },

    #[error("upgraded protocol failed to start: {source}")]
    Upgrader { source: BoxError },

    #[error("upgrade negotiation already finished")]
    Finished,
}

impl UpgradeError {
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, UpgradeError::Rejected { .. })
    }

    #[inline]
    pub fn is_connection(&self) -> bool {
        matches!(self, UpgradeError::Connection { .. })
    }
}

/// Outcome of a scheduled task that never produced its value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    #[error("task cancelled")]
    Cancelled,

    #[error("task panicked")]
    Panicked,
}
