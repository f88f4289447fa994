//! One-shot HTTP client over raw sockets.
//!
//! # Design
//! `HttpClient` holds only its `ClientConfig` and carries no state between
//! calls. Every exchange follows the same path: decompose the URL, serialize
//! the request, open a fresh transport session, send, receive a framed
//! response, close, parse. The session is closed before parsing and is also
//! released by `Drop` when any step fails, so no socket outlives the call.

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::{HttpMethod, HttpRequest, RequestBody, RequestHeaders};
use crate::response::HttpResponse;
use crate::transport::TransportSession;
use crate::url::ParsedUrl;

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an `HttpRequest` without touching the network.
    pub fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: Option<RequestHeaders>,
        body: Option<RequestBody>,
    ) -> Result<HttpRequest> {
        let url = ParsedUrl::parse_with_default_port(url, self.config.default_port)?;
        debug!(%method, host = %url.hostname, port = url.port, target = %url.request_target(), "parsed URL");
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Perform one exchange for an already-built request.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.config.validate()?;
        let wire = request.to_bytes()?;

        let mut session = TransportSession::open(&request.url.hostname, request.url.port, &self.config)?;
        debug!(transport = ?self.config.transport, "session open");

        session.send(&wire)?;
        debug!(bytes = wire.len(), request = %String::from_utf8_lossy(&wire), "request sent");

        let raw = session.receive()?;
        session.close();

        let response = HttpResponse::parse(&raw)?;
        info!(
            method = %request.method,
            host = %request.url.hostname,
            status = response.status,
            "response received"
        );
        Ok(response)
    }

    pub fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: Option<RequestHeaders>,
        body: Option<RequestBody>,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, url, headers, body)?;
        self.send(&request)
    }

    pub fn get(&self, url: &str, headers: Option<RequestHeaders>) -> Result<HttpResponse> {
        self.request(HttpMethod::Get, url, headers, None)
    }

    pub fn delete(&self, url: &str, headers: Option<RequestHeaders>) -> Result<HttpResponse> {
        self.request(HttpMethod::Delete, url, headers, None)
    }

    pub fn post(&self, url: &str, headers: Option<RequestHeaders>, body: Option<RequestBody>) -> Result<HttpResponse> {
        self.request(HttpMethod::Post, url, headers, body)
    }

    pub fn put(&self, url: &str, headers: Option<RequestHeaders>, body: Option<RequestBody>) -> Result<HttpResponse> {
        self.request(HttpMethod::Put, url, headers, body)
    }
}
