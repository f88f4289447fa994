//! Command-line surface of `httpc`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use httpc_core::{ClientConfig, HeaderMap, RequestBody, RequestHeaders, TransportKind};

#[derive(Debug, Parser)]
#[command(name = "httpc")]
#[command(about = "Minimal HTTP/1.1 client over raw TCP or UDP sockets")]
#[command(version, disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Log every step of the exchange
    #[arg(short = 'v', short_alias = 'V', long, global = true)]
    pub verbose: bool,

    /// Send the request as a single UDP datagram instead of over TCP
    #[arg(long, global = true)]
    pub udp: bool,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET request
    Get(ReadArgs),
    /// DELETE request
    Delete(ReadArgs),
    /// POST request
    Post(WriteArgs),
    /// PUT request
    Put(WriteArgs),
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Header to send, as 'Key:Value' (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// URL to send the request to
    pub url: String,
}

impl ReadArgs {
    pub fn header_map(&self) -> HeaderMap {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    pub fn request_headers(&self) -> Option<RequestHeaders> {
        (!self.headers.is_empty()).then(|| RequestHeaders::Pairs(self.header_map()))
    }
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub common: ReadArgs,

    /// Inline data to send as the request body
    #[arg(short = 'd', long = "data", short_alias = 'D', alias = "inlinedata", conflicts_with = "file")]
    pub data: Option<String>,

    /// File whose contents are sent as the request body
    #[arg(short = 'f', long = "file", short_alias = 'F')]
    pub file: Option<PathBuf>,
}

impl WriteArgs {
    /// Headers and body for the request. A file body gets a `Content-Type`
    /// guessed from its extension unless one was given with `-H`.
    pub fn payload(&self) -> anyhow::Result<(Option<RequestHeaders>, Option<RequestBody>)> {
        if let Some(path) = &self.file {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let mut headers = self.common.header_map();
            if !headers.contains_ignore_case("Content-Type") {
                let mime = new_mime_guess::from_path(path).first_or_octet_stream();
                headers.insert("Content-Type", mime.to_string());
            }
            return Ok((Some(RequestHeaders::Pairs(headers)), Some(RequestBody::Bytes(bytes))));
        }

        let body = self.data.clone().map(RequestBody::Text);
        Ok((self.common.request_headers(), body))
    }
}

/// Socket parameters, each overridable from the environment.
#[derive(Debug, Args)]
pub struct TransportArgs {
    /// Port used when the URL does not name one
    #[arg(long, global = true, default_value = "80", env = "HTTPC_DEFAULT_PORT")]
    pub default_port: u16,

    /// Bytes requested per TCP read
    #[arg(long, global = true, default_value = "1024", env = "HTTPC_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Largest accepted response header block, in bytes
    #[arg(long, global = true, default_value = "65536", env = "HTTPC_MAX_HEADER_SIZE")]
    pub max_header_size: usize,

    /// Receive buffer for the UDP response datagram
    #[arg(long, global = true, default_value = "65535", env = "HTTPC_DATAGRAM_BUFFER")]
    pub datagram_buffer: usize,

    /// Local address bound before sending over UDP
    #[arg(long, global = true, default_value = "0.0.0.0:0", env = "HTTPC_BIND")]
    pub bind: SocketAddr,

    /// Read timeout in milliseconds (0 waits forever)
    #[arg(long, global = true, default_value = "30000", env = "HTTPC_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// TCP connect timeout in milliseconds (0 uses the OS default)
    #[arg(long, global = true, default_value = "10000", env = "HTTPC_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,
}

impl TransportArgs {
    pub fn to_config(&self, udp: bool) -> ClientConfig {
        let transport = if udp { TransportKind::Datagram } else { TransportKind::Stream };
        ClientConfig {
            transport,
            default_port: self.default_port,
            read_chunk_size: self.chunk_size,
            max_header_size: self.max_header_size,
            datagram_buffer_size: self.datagram_buffer,
            datagram_bind: self.bind,
            read_timeout: millis(self.timeout_ms),
            connect_timeout: millis(self.connect_timeout_ms),
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Parse a `Key:Value` header flag.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid header {s:?}: use the 'Key:Value' format"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid header {s:?}: empty name"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
