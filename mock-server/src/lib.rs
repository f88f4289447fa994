//! httpbin-style test server reachable over TCP and UDP.
//!
//! `app()` answers the handful of endpoints the client is exercised against.
//! `run` serves it over TCP; `run_datagram` decodes each incoming datagram as
//! an HTTP/1.1 request, routes it through the same app and answers with the
//! complete response in a single datagram.

use std::collections::BTreeMap;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, Query},
    http::{HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, UdpSocket};
use tower::ServiceExt;

/// Largest datagram the responder reads or writes.
pub const MAX_DATAGRAM: usize = 65_507;

pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /deny\n";

/// What the echo endpoints report back about a request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub args: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
}

pub fn app() -> Router {
    Router::new()
        .route("/get", get(echo))
        .route("/delete", delete(echo))
        .route("/post", post(echo_with_body))
        .route("/put", put(echo_with_body))
        .route("/headers", get(headers))
        .route("/status/{code}", any(status))
        .route("/robots.txt", get(robots))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Answer every datagram on `socket` until an I/O error occurs.
pub async fn run_datagram(socket: UdpSocket) -> Result<(), std::io::Error> {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (n, peer) = socket.recv_from(&mut buf).await?;
        let reply = match decode_request(&buf[..n]) {
            Some(request) => {
                tracing::debug!(%peer, method = %request.method(), uri = %request.uri(), "datagram request");
                let response = match app().oneshot(request).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                };
                encode_response(response).await
            }
            None => {
                tracing::warn!(%peer, bytes = n, "undecodable datagram");
                encode_response(StatusCode::BAD_REQUEST.into_response()).await
            }
        };
        socket.send_to(&reply, peer).await?;
    }
}

/// Parse a request line, headers and body out of one datagram.
pub fn decode_request(datagram: &[u8]) -> Option<Request<Body>> {
    let split = datagram.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = std::str::from_utf8(&datagram[..split]).ok()?;
    let body = datagram[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?;
    let target = request_line.next()?;

    let mut builder = Request::builder().method(method).uri(target);
    for line in lines {
        let (name, value) = line.split_once(':')?;
        // the body length is whatever followed the blank line
        if name.trim().eq_ignore_ascii_case("content-length") {
            continue;
        }
        builder = builder.header(name.trim(), value.trim());
    }
    builder
        .header("content-length", body.len())
        .body(Body::from(body))
        .ok()
}

/// Serialize a response as HTTP/1.1 bytes with an explicit Content-Length.
/// A body too large for one datagram is replaced by an empty 500.
pub async fn encode_response(response: Response) -> Vec<u8> {
    let (mut parts, body) = response.into_parts();
    let body = match to_bytes(body, MAX_DATAGRAM).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "response body does not fit in one datagram");
            parts.status = StatusCode::INTERNAL_SERVER_ERROR;
            parts.headers.clear();
            Bytes::new()
        }
    };

    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        parts.status.as_u16(),
        parts.status.canonical_reason().unwrap_or("")
    );
    for (name, value) in &parts.headers {
        if name == "content-length" {
            continue;
        }
        if let Ok(value) = value.to_str() {
            out.push_str(&format!("{}: {value}\r\n", name.as_str()));
        }
    }
    out.push_str(&format!("content-length: {}\r\n\r\n", body.len()));

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&body);
    bytes
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

async fn echo(uri: Uri, Query(args): Query<BTreeMap<String, String>>, headers: HeaderMap) -> Json<Echo> {
    Json(Echo {
        args,
        headers: header_map(&headers),
        url: uri.to_string(),
        ..Echo::default()
    })
}

async fn echo_with_body(
    uri: Uri,
    Query(args): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    Json(Echo {
        args,
        headers: header_map(&headers),
        url: uri.to_string(),
        json: serde_json::from_str(&body).ok(),
        data: Some(body),
    })
}

async fn headers(headers: HeaderMap) -> Json<BTreeMap<String, BTreeMap<String, String>>> {
    Json(BTreeMap::from([("headers".to_string(), header_map(&headers))]))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn robots() -> &'static str {
    ROBOTS_TXT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_omits_absent_body_fields() {
        let echo = Echo {
            url: "/get".to_string(),
            ..Echo::default()
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["url"], "/get");
        assert!(json.get("data").is_none());
        assert!(json.get("json").is_none());
    }

    #[test]
    fn decode_request_reads_line_headers_and_body() {
        let request =
            decode_request(b"POST /post?x=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 999\r\n\r\nabc").unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.uri(), "/post?x=1");
        assert_eq!(request.headers()["host"], "localhost");
        assert_eq!(request.headers()["content-length"], "3");
    }

    #[test]
    fn decode_request_rejects_garbage() {
        assert!(decode_request(b"no terminator").is_none());
        assert!(decode_request(b"GET\r\n\r\n").is_none());
        assert!(decode_request(b"GET / HTTP/1.1\r\nbroken header\r\n\r\n").is_none());
    }

    #[tokio::test]
    async fn encode_response_sets_content_length() {
        let bytes = encode_response((StatusCode::IM_A_TEAPOT, "short and stout").into_response()).await;
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 418 I'm a teapot\r\n"));
        assert!(text.contains("content-length: 15\r\n\r\nshort and stout"));
    }

    #[tokio::test]
    async fn encode_response_turns_oversized_body_into_500() {
        let huge = "x".repeat(MAX_DATAGRAM + 1);
        let bytes = encode_response((StatusCode::OK, huge).into_response()).await;
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n");
    }
}
