//! Error types for the httpc client core.
//!
//! # Design
//! One enum covers every fallible operation of a request/response exchange.
//! `Transport` keeps the underlying `io::Error` as its source so callers can
//! still inspect the OS error kind. A body that is not valid JSON is never an
//! error; the parser falls back to the raw text instead.

use std::io;

use thiserror::Error;

/// Errors returned by the URL decomposer, serializer, transport and parser.
#[derive(Debug, Error)]
pub enum HttpcError {
    /// The URL has no usable hostname, or its port is not a valid number.
    #[error("invalid URL: {0}")]
    UrlParse(String),

    /// Name resolution, connect, bind, send or receive failed at the OS level.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The response does not follow the expected status-line, header or
    /// framing grammar.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A verb outside GET, PUT, POST and DELETE was requested.
    #[error("unsupported verb: {0}")]
    UnsupportedVerb(String),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A structured request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl HttpcError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        HttpcError::Protocol(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HttpcError>;
