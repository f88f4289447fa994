//! Response framing over stream and datagram transports.
//!
//! # Design
//! HTTP/1.1 has no message length on the wire until the header block has
//! been read, so each transport gets its own receiver:
//!
//! - `StreamReceiver` reads chunks into a buffer until the `\r\n\r\n`
//!   boundary appears, takes the body length from `Content-Length` (zero when
//!   absent) and then reads exactly that many body bytes. Reads may return any
//!   number of bytes; one byte per read frames the same as one large read.
//! - `DatagramReceiver` performs a single receive. The boundary splits that
//!   one datagram; whatever follows it is the whole body, whatever
//!   `Content-Length` says. A second receive is never issued.
//!
//! Both hand a `RawResponse` (header bytes, body bytes) to the parser.

use std::io::{self, Read};
use std::net::UdpSocket;

use tracing::{debug, trace, warn};

use crate::error::{HttpcError, Result};

/// Blank line separating the header block from the body.
pub const BOUNDARY: &[u8] = b"\r\n\r\n";

/// A response split at the boundary. `head` excludes the boundary itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub head: Vec<u8>,
    pub body: Vec<u8>,
}

/// Position of the first boundary at or after `from`.
pub fn find_boundary(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(BOUNDARY.len())
        .position(|w| w == BOUNDARY)
        .map(|i| i + from)
}

/// Body length declared by the header block. A missing header means zero;
/// repeated headers must all carry the same value.
pub fn content_length(head: &[u8]) -> Result<usize> {
    let head = String::from_utf8_lossy(head);
    let mut declared: Option<usize> = None;
    for line in head.split("\r\n").skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        let value = value.trim();
        let length = value
            .parse::<usize>()
            .map_err(|_| HttpcError::protocol(format!("invalid Content-Length: {value:?}")))?;
        match declared {
            Some(previous) if previous != length => {
                return Err(HttpcError::protocol(format!(
                    "conflicting Content-Length values: {previous} and {length}"
                )));
            }
            _ => declared = Some(length),
        }
    }
    Ok(declared.unwrap_or(0))
}

/// Frames a response read from a byte stream.
#[derive(Debug, Clone)]
pub struct StreamReceiver {
    chunk_size: usize,
    max_header_size: usize,
}

impl StreamReceiver {
    pub fn new(chunk_size: usize, max_header_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_header_size,
        }
    }

    pub fn receive<R: Read>(&self, reader: &mut R) -> Result<RawResponse> {
        let mut buf = Vec::with_capacity(self.chunk_size);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut scan_from = 0;

        let boundary = loop {
            if let Some(pos) = find_boundary(&buf, scan_from) {
                break pos;
            }
            if buf.len() > self.max_header_size {
                return Err(HttpcError::protocol(format!(
                    "no header terminator within {} bytes",
                    self.max_header_size
                )));
            }
            // the boundary may straddle two reads
            scan_from = buf.len().saturating_sub(BOUNDARY.len() - 1);

            let n = read_some(reader, &mut chunk)?;
            if n == 0 {
                return Err(HttpcError::protocol(format!(
                    "connection closed after {} bytes, before the end of the headers",
                    buf.len()
                )));
            }
            trace!(bytes = n, "read header chunk");
            buf.extend_from_slice(&chunk[..n]);
        };

        let mut body = buf.split_off(boundary + BOUNDARY.len());
        buf.truncate(boundary);
        let head = buf;

        let expected = content_length(&head)?;
        debug!(header_bytes = head.len(), content_length = expected, "found header boundary");

        if body.len() > expected {
            warn!(extra = body.len() - expected, "discarding bytes past Content-Length");
            body.truncate(expected);
        }

        while body.len() < expected {
            let want = (expected - body.len()).min(self.chunk_size);
            let n = read_some(reader, &mut chunk[..want])?;
            if n == 0 {
                return Err(HttpcError::protocol(format!(
                    "connection closed after {} of {expected} body bytes",
                    body.len()
                )));
            }
            trace!(bytes = n, "read body chunk");
            body.extend_from_slice(&chunk[..n]);
        }

        Ok(RawResponse { head, body })
    }
}

/// One `read`, retried on `Interrupted`.
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HttpcError::Transport(e)),
        }
    }
}

/// Anything that delivers whole datagrams.
pub trait DatagramSource {
    /// Receive one datagram into `buf`, returning its length.
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Expects a socket already connected to its peer, so datagrams from other
/// senders never reach `recv`.
impl DatagramSource for UdpSocket {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.recv(buf)?;
        debug!(bytes = n, "received datagram");
        Ok(n)
    }
}

/// Frames a response carried by a single datagram.
#[derive(Debug, Clone)]
pub struct DatagramReceiver {
    buffer_size: usize,
}

impl DatagramReceiver {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn receive<S: DatagramSource>(&self, source: &mut S) -> Result<RawResponse> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = loop {
            match source.recv_datagram(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HttpcError::Transport(e)),
            }
        };
        buf.truncate(n);

        let boundary = find_boundary(&buf, 0)
            .ok_or_else(|| HttpcError::protocol(format!("datagram of {n} bytes has no header terminator")))?;

        let body = buf.split_off(boundary + BOUNDARY.len());
        buf.truncate(boundary);
        debug!(header_bytes = buf.len(), body_bytes = body.len(), "split datagram at boundary");

        Ok(RawResponse { head: buf, body })
    }
}
