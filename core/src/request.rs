//! HTTP/1.1 request messages and their wire serialization.
//!
//! # Design
//! `HttpRequest` is plain data: a method, a decomposed URL, optional headers
//! and an optional body. `to_bytes` produces exactly what goes on the wire:
//!
//! ```text
//! <METHOD> <path-or-/><query> HTTP/1.1\r\n
//! Host: <hostname>\r\n
//! <caller headers, in order>\r\n
//! Content-Length: <n>\r\n        (only when a body is present)
//! \r\n
//! <body bytes>
//! ```
//!
//! No `Connection`, `Transfer-Encoding` or chunked framing is ever emitted, so
//! the output always follows the same framing rules the response receiver
//! expects on the reply side.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{HttpcError, Result};
use crate::headers::HeaderMap;
use crate::url::ParsedUrl;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = HttpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(HttpcError::UnsupportedVerb(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestHeaders {
    /// Name/value pairs, written as `Name: Value\r\n` in insertion order.
    Pairs(HeaderMap),
    /// A pre-formatted header block appended verbatim. The caller is
    /// responsible for its CRLF line endings.
    Raw(String),
}

impl From<HeaderMap> for RequestHeaders {
    fn from(map: HeaderMap) -> Self {
        RequestHeaders::Pairs(map)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Encoded as compact UTF-8 JSON.
    Json(serde_json::Value),
    /// Sent as the UTF-8 bytes of the text, unchanged.
    Text(String),
    /// Sent unchanged.
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Canonical byte encoding of the body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            RequestBody::Json(value) => {
                serde_json::to_vec(value).map_err(|e| HttpcError::Serialization(e.to_string()))
            }
            RequestBody::Text(text) => Ok(text.as_bytes().to_vec()),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: ParsedUrl,
    pub headers: Option<RequestHeaders>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: ParsedUrl) -> Self {
        Self {
            method,
            url,
            headers: None,
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: impl Into<RequestHeaders>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize the request into the exact bytes to transmit.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = self.body.as_ref().map(RequestBody::encode).transpose()?;

        let mut head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\n",
            self.method,
            self.url.request_target(),
            self.url.hostname
        );

        match &self.headers {
            Some(RequestHeaders::Pairs(map)) => {
                let mut map = map.clone();
                if body.is_some() && map.remove_ignore_case("Content-Length") > 0 {
                    warn!("dropping caller-supplied Content-Length in favour of the computed one");
                }
                for (name, value) in map.iter() {
                    head.push_str(name);
                    head.push_str(": ");
                    head.push_str(value);
                    head.push_str("\r\n");
                }
            }
            Some(RequestHeaders::Raw(block)) => head.push_str(block),
            None => {}
        }

        if let Some(body) = &body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        if let Some(body) = body {
            bytes.extend_from_slice(&body);
        }
        Ok(bytes)
    }
}
