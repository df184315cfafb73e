//! Connection limits shared by server and client connections.
//!
//! The defaults follow the limits the codec has always enforced: 8KB of header
//! bytes, 64 header fields and an 8KB read buffer.

/// Maximum size in bytes allowed for the entire header section
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Maximum number of header fields allowed in one message
pub const DEFAULT_MAX_HEADERS: usize = 64;

/// Initial capacity of the read buffer of a connection
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Maximum `Content-Length` body accepted before the message is rejected
pub const DEFAULT_MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Maximum number of pipelined requests waiting for their response
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Limits applied to a single HTTP connection.
///
/// ```
/// use micro_http_semantics::config::ConnectionConfig;
///
/// let config = ConnectionConfig::builder().max_in_flight(4).max_headers(32).build();
/// assert_eq!(config.max_in_flight(), 4);
/// assert_eq!(config.max_headers(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    max_header_bytes: usize,
    max_headers: usize,
    read_buffer_capacity: usize,
    max_body_bytes: u64,
    max_in_flight: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_headers: DEFAULT_MAX_HEADERS,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder { config: Self::default() }
    }

    #[inline]
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    #[inline]
    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    #[inline]
    pub fn read_buffer_capacity(&self) -> usize {
        self.read_buffer_capacity
    }

    #[inline]
    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    #[inline]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.max_header_bytes = max_header_bytes;
        self
    }

    pub fn max_headers(mut self, max_headers: usize) -> Self {
        self.config.max_headers = max_headers;
        self
    }

    pub fn read_buffer_capacity(mut self, read_buffer_capacity: usize) -> Self {
        self.config.read_buffer_capacity = read_buffer_capacity;
        self
    }

    pub fn max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    /// Sets the pipelining depth. A value of zero is raised to one, a connection
    /// always has room for the request being answered.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.config.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_header_bytes(), 8 * 1024);
        assert_eq!(config.max_headers(), 64);
        assert_eq!(config.read_buffer_capacity(), 8 * 1024);
        assert_eq!(config.max_in_flight(), DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn in_flight_never_zero() {
        assert_eq!(ConnectionConfig::builder().max_in_flight(0).build().max_in_flight(), 1);
    }
}
