//! Client configuration.
//!
//! Ports, buffer sizes and timeouts are passed explicitly into the transport
//! session instead of living in process-wide globals. `ClientConfig` is
//! deserializable so callers can load it from any serde format; the CLI
//! builds it from flags and environment variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HttpcError, Result};
use crate::url::DEFAULT_HTTP_PORT;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Which socket type carries the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// TCP: reliable ordered byte stream, body framed by `Content-Length`.
    #[default]
    Stream,
    /// UDP: one request datagram out, one response datagram back.
    Datagram,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub transport: TransportKind,
    pub default_port: u16,
    /// Bytes requested per stream read.
    pub read_chunk_size: usize,
    /// Upper bound on the header block before the boundary is seen.
    pub max_header_size: usize,
    /// Receive buffer for the single response datagram.
    pub datagram_buffer_size: usize,
    /// Local endpoint bound before sending a datagram.
    pub datagram_bind: SocketAddr,
    #[serde(with = "opt_millis")]
    pub read_timeout: Option<Duration>,
    #[serde(with = "opt_millis")]
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stream,
            default_port: DEFAULT_HTTP_PORT,
            read_chunk_size: 1024,
            max_header_size: 64 * 1024,
            datagram_buffer_size: 65_535,
            datagram_bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            read_timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl ClientConfig {
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_port == 0 {
            return Err(invalid("default port must be non-zero"));
        }
        if self.read_chunk_size == 0 {
            return Err(invalid("read chunk size must be >= 1"));
        }
        if self.max_header_size == 0 {
            return Err(invalid("max header size must be >= 1"));
        }
        if self.datagram_buffer_size == 0 {
            return Err(invalid("datagram buffer size must be >= 1"));
        }
        if self.read_timeout == Some(Duration::ZERO) || self.connect_timeout == Some(Duration::ZERO) {
            // std rejects zero timeouts; `None` is the way to disable them
            return Err(invalid("timeouts must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> HttpcError {
    HttpcError::Config(msg.to_string())
}

/// `Option<Duration>` as an optional number of milliseconds.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
