//! Socket ownership for a single request/response exchange.
//!
//! # Design
//! A `TransportSession` owns exactly one socket, either a connected TCP
//! stream or a UDP socket connected to the peer it sends to. The socket lives
//! in an `Option`: `close` takes it out, so closing twice is a no-op and any
//! later `send`/`receive` fails with `NotConnected`. `Drop` calls `close`, so
//! the socket is released on every exit path, including early returns
//! through `?`.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};

use tracing::{debug, trace};

use crate::config::{ClientConfig, TransportKind, MAX_DATAGRAM_PAYLOAD};
use crate::error::{HttpcError, Result};
use crate::receiver::{DatagramReceiver, RawResponse, StreamReceiver};

enum Socket {
    Stream(TcpStream),
    Datagram { socket: UdpSocket, peer: SocketAddr },
}

pub struct TransportSession {
    socket: Option<Socket>,
    config: ClientConfig,
}

impl TransportSession {
    /// Connect (stream) or bind (datagram) according to `config.transport`.
    pub fn open(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        if host.is_empty() {
            return Err(HttpcError::UrlParse("URL has no hostname to connect to".to_string()));
        }

        let socket = match config.transport {
            TransportKind::Stream => Socket::Stream(connect_stream(host, port, config)?),
            TransportKind::Datagram => {
                let socket = UdpSocket::bind(config.datagram_bind)?;
                socket.set_read_timeout(config.read_timeout)?;
                let peer = resolve_peer(host, port, &socket)?;
                // only datagrams from `peer` are delivered once connected
                socket.connect(peer)?;
                debug!(local = ?socket.local_addr().ok(), %peer, "bound datagram socket");
                Socket::Datagram { socket, peer }
            }
        };

        Ok(Self {
            socket: Some(socket),
            config: config.clone(),
        })
    }

    pub fn kind(&self) -> Option<TransportKind> {
        self.socket.as_ref().map(|s| match s {
            Socket::Stream(_) => TransportKind::Stream,
            Socket::Datagram { .. } => TransportKind::Datagram,
        })
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Transmit a serialized request. A datagram request is sent with
    /// exactly one `send_to` and must fit in one UDP payload.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match self.socket.as_mut().ok_or_else(not_connected)? {
            Socket::Stream(stream) => {
                stream.write_all(bytes)?;
                stream.flush()?;
            }
            Socket::Datagram { socket, peer } => {
                if bytes.len() > MAX_DATAGRAM_PAYLOAD {
                    return Err(HttpcError::protocol(format!(
                        "request of {} bytes does not fit in one datagram (max {MAX_DATAGRAM_PAYLOAD})",
                        bytes.len()
                    )));
                }
                let sent = socket.send(bytes)?;
                trace!(%peer, "datagram sent");
                if sent != bytes.len() {
                    return Err(HttpcError::Transport(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: sent {sent} of {} bytes", bytes.len()),
                    )));
                }
            }
        }
        trace!(bytes = bytes.len(), "request sent");
        Ok(())
    }

    /// Read one framed response using the receiver that matches the socket.
    pub fn receive(&mut self) -> Result<RawResponse> {
        match self.socket.as_mut().ok_or_else(not_connected)? {
            Socket::Stream(stream) => {
                StreamReceiver::new(self.config.read_chunk_size, self.config.max_header_size).receive(stream)
            }
            Socket::Datagram { socket, .. } => DatagramReceiver::new(self.config.datagram_buffer_size).receive(socket),
        }
    }

    /// Release the socket. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Socket::Stream(stream) = &socket {
                // the peer may already be gone
                let _ = stream.shutdown(Shutdown::Both);
            }
            debug!("transport session closed");
        }
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn not_connected() -> HttpcError {
    HttpcError::Transport(io::Error::new(io::ErrorKind::NotConnected, "transport session is closed"))
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(HttpcError::Transport(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host} did not resolve to any address"),
        )));
    }
    Ok(addrs)
}

/// Try each resolved address in turn, returning the last error if none
/// accepts the connection.
fn connect_stream(host: &str, port: u16, config: &ClientConfig) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in resolve(host, port)? {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_read_timeout(config.read_timeout)?;
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect failed");
                last_err = Some(e);
            }
        }
    }
    Err(HttpcError::Transport(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"))
    })))
}

/// Pick a resolved address of the same family as the bound socket.
fn resolve_peer(host: &str, port: u16, socket: &UdpSocket) -> Result<SocketAddr> {
    let addrs = resolve(host, port)?;
    let want_v4 = socket.local_addr()?.is_ipv4();
    Ok(addrs
        .iter()
        .copied()
        .find(|a| a.is_ipv4() == want_v4)
        .unwrap_or(addrs[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn local_config(kind: TransportKind) -> ClientConfig {
        let mut config = ClientConfig::default().with_transport(kind);
        config.datagram_bind = "127.0.0.1:0".parse().unwrap();
        config.read_timeout = Some(Duration::from_secs(5));
        config
    }

    #[test]
    fn empty_hostname_is_rejected_before_connecting() {
        let err = TransportSession::open("", 80, &local_config(TransportKind::Stream)).err().unwrap();
        assert!(matches!(err, HttpcError::UrlParse(_)));
    }

    #[test]
    fn refused_connection_is_transport_error() {
        // bind then drop to find a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let err = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Stream))
            .err()
            .unwrap();
        assert!(matches!(err, HttpcError::Transport(_)));
    }

    #[test]
    fn unresolvable_host_is_transport_error() {
        let err = TransportSession::open("host.invalid", 80, &local_config(TransportKind::Stream))
            .err()
            .unwrap();
        assert!(matches!(err, HttpcError::Transport(_)));
    }

    #[test]
    fn stream_session_sends_and_receives() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = [0u8; 64];
            let n = conn.read(&mut request).unwrap();
            for b in b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok" {
                conn.write_all(&[*b]).unwrap();
            }
            request[..n].to_vec()
        });

        let mut session = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Stream)).unwrap();
        assert_eq!(session.kind(), Some(TransportKind::Stream));
        session.send(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let raw = session.receive().unwrap();
        assert_eq!(raw.body, b"ok".to_vec());
        assert_eq!(server.join().unwrap(), b"GET / HTTP/1.1\r\n\r\n".to_vec());
    }

    #[test]
    fn datagram_session_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1024];
            let (n, from) = server.recv_from(&mut buf).unwrap();
            server
                .send_to(b"HTTP/1.1 200 OK\r\nContent-Length: 99\r\n\r\nshort", from)
                .unwrap();
            buf[..n].to_vec()
        });

        let mut session = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Datagram)).unwrap();
        session.send(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let raw = session.receive().unwrap();
        assert_eq!(raw.body, b"short".to_vec());
        assert_eq!(handle.join().unwrap(), b"GET / HTTP/1.1\r\n\r\n".to_vec());
    }

    #[test]
    fn datagram_session_ignores_other_senders() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1024];
            let (_, from) = server.recv_from(&mut buf).unwrap();
            let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
            stranger.send_to(b"HTTP/1.1 200 OK\r\n\r\nspoofed", from).unwrap();
            server.send_to(b"HTTP/1.1 200 OK\r\n\r\ngenuine", from).unwrap();
        });

        let mut session = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Datagram)).unwrap();
        session.send(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let raw = session.receive().unwrap();
        assert_eq!(raw.body, b"genuine".to_vec());
        handle.join().unwrap();
    }

    #[test]
    fn oversized_datagram_is_refused() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let mut session = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Datagram)).unwrap();
        let err = session.send(&vec![b'x'; MAX_DATAGRAM_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(err, HttpcError::Protocol(_)));
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_io() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let mut session = TransportSession::open("127.0.0.1", port, &local_config(TransportKind::Datagram)).unwrap();
        assert!(session.is_open());
        session.close();
        session.close();
        assert!(!session.is_open());
        assert_eq!(session.kind(), None);
        let err = session.send(b"x").unwrap_err();
        assert!(matches!(err, HttpcError::Transport(ref e) if e.kind() == io::ErrorKind::NotConnected));
        assert!(session.receive().is_err());
    }
}
