//! Minimal HTTP/1.1 client built directly on TCP and UDP sockets.
//!
//! # Overview
//! One call performs one request/response exchange over a freshly opened
//! connection: URL decomposition, request serialization, transport, response
//! framing and parsing. No connection reuse, TLS, chunked encoding,
//! redirects or retries.
//!
//! # Design
//! - `url`: `ParsedUrl`, split from the generic URI grammar.
//! - `request`: `HttpRequest` and its exact wire bytes.
//! - `transport`: `TransportSession`, one owned socket, closed on every path.
//! - `receiver`: `StreamReceiver` (boundary scan + `Content-Length`) and
//!   `DatagramReceiver` (one datagram, no second read). They are kept as
//!   separate types because their framing contracts differ.
//! - `response`: `HttpResponse` parsing with a JSON-or-text body.
//! - `client`: `HttpClient`, which runs the whole exchange.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod receiver;
pub mod request;
pub mod response;
pub mod transport;
pub mod url;

pub use client::HttpClient;
pub use config::{ClientConfig, TransportKind};
pub use error::{HttpcError, Result};
pub use headers::HeaderMap;
pub use receiver::{DatagramReceiver, DatagramSource, RawResponse, StreamReceiver};
pub use request::{HttpMethod, HttpRequest, RequestBody, RequestHeaders};
pub use response::{HttpResponse, ResponseBody};
pub use transport::TransportSession;
pub use url::ParsedUrl;
