//! URL decomposition into the parts an HTTP/1.1 request needs.
//!
//! The generic URI grammar from RFC 3986 appendix B splits the input into
//! scheme, authority, path, query and fragment. The authority is then split
//! into hostname and port. No DNS lookup or hostname validation happens here:
//! an input without an authority yields an empty hostname, which the
//! transport session refuses to connect to.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HttpcError, Result};

/// Port used when the authority does not name one.
pub const DEFAULT_HTTP_PORT: u16 = 80;

static URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?").expect("URI pattern compiles")
});

static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme pattern compiles"));

/// A URL split into the pieces used for connecting and for the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub hostname: String,
    pub port: u16,
    /// Path component, possibly empty.
    pub path: String,
    /// Query including its leading `?`, or empty.
    pub query: String,
}

impl ParsedUrl {
    /// Decompose `url`, defaulting the port to 80.
    pub fn parse(url: &str) -> Result<Self> {
        Self::parse_with_default_port(url, DEFAULT_HTTP_PORT)
    }

    /// Decompose `url`, using `default_port` when the authority has no port.
    ///
    /// Inputs with neither a scheme nor a leading `/` (`localhost:8080/get`)
    /// are read as if they started with `//`, so the first segment is taken
    /// as the authority.
    pub fn parse_with_default_port(url: &str, default_port: u16) -> Result<Self> {
        let url = url.trim();
        let normalized: Cow<'_, str> = if needs_authority_prefix(url) {
            Cow::Owned(format!("//{url}"))
        } else {
            Cow::Borrowed(url)
        };

        let caps = URI_PATTERN
            .captures(&normalized)
            .ok_or_else(|| HttpcError::UrlParse(url.to_string()))?;

        let authority = caps.get(4).map_or("", |m| m.as_str());
        let (hostname, port) = split_authority(authority, default_port)
            .map_err(|bad| HttpcError::UrlParse(format!("invalid port {bad:?} in {url:?}")))?;

        Ok(ParsedUrl {
            hostname: hostname.to_string(),
            port,
            path: caps.get(5).map_or("", |m| m.as_str()).to_string(),
            query: caps.get(6).map_or("", |m| m.as_str()).to_string(),
        })
    }

    /// The request-target for the request line: path (or `/`) plus query.
    pub fn request_target(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        format!("{path}{}", self.query)
    }
}

fn needs_authority_prefix(url: &str) -> bool {
    !url.is_empty() && !SCHEME_PREFIX.is_match(url) && !url.starts_with('/')
}

/// Split `[userinfo@]host[:port]`. On a bad port the offending text is
/// returned as the error.
fn split_authority(authority: &str, default_port: u16) -> std::result::Result<(&str, u16), String> {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    let (host, port) = if let Some(rest) = host_port.strip_prefix('[') {
        // IPv6 literal
        match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (host_port, None),
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    match port {
        None | Some("") => Ok((host, default_port)),
        Some(p) => p.parse::<u16>().map(|p| (host, p)).map_err(|_| p.to_string()),
    }
}
