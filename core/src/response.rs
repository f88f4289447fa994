//! HTTP response messages and the parser that builds them.
//!
//! # Design
//! The parser works on a `RawResponse` that a receiver has already framed,
//! so it never touches the network. The status line and every header line
//! must match the grammar; anything else is a `Protocol` error naming the
//! offending line. The body is decoded as JSON when it parses and kept as
//! text otherwise; that fallback is not an error.

use serde::Serialize;

use crate::error::{HttpcError, Result};
use crate::headers::HeaderMap;
use crate::receiver::RawResponse;

/// Response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Decode `bytes` as UTF-8 JSON, falling back to the text itself.
    pub fn decode(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text.into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }
}

/// A parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponse {
    #[serde(skip)]
    pub version: String,
    #[serde(rename = "status_code")]
    pub status: u16,
    #[serde(rename = "status")]
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn parse(raw: &RawResponse) -> Result<Self> {
        Self::from_parts(&raw.head, &raw.body)
    }

    /// Parse a header block (without the trailing blank line) and a body.
    pub fn from_parts(head: &[u8], body: &[u8]) -> Result<Self> {
        let head = std::str::from_utf8(head)
            .map_err(|e| HttpcError::protocol(format!("header block is not UTF-8: {e}")))?;
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap_or_default();
        let (version, status, status_text) = parse_status_line(status_line)?;

        let mut headers = HeaderMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(": ")
                .ok_or_else(|| HttpcError::protocol(format!("malformed header line: {line:?}")))?;
            headers.insert(name, value);
        }

        Ok(HttpResponse {
            version: version.to_string(),
            status,
            status_text: status_text.to_string(),
            headers,
            body: ResponseBody::decode(body),
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// `HTTP/<version> <code> <reason>`; the reason may be empty.
fn parse_status_line(line: &str) -> Result<(&str, u16, &str)> {
    let malformed = || HttpcError::protocol(format!("malformed status line: {line:?}"));

    let (version, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let number = version.strip_prefix("HTTP/").ok_or_else(malformed)?;
    let valid_version = match number.split_once('.') {
        Some((major, minor)) => is_digits(major) && (minor.is_empty() || is_digits(minor)),
        None => is_digits(number),
    };
    if !valid_version {
        return Err(malformed());
    }

    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    if code.len() != 3 || !is_digits(code) {
        return Err(malformed());
    }
    let status = code.parse::<u16>().map_err(|_| malformed())?;

    Ok((number, status, reason))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
