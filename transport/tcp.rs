// TCP transport implementation
use crate::traits::{Transport, TransportListener};
use std::io::{Read, Result, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use nix::sys::socket::{setsockopt, sockopt};
use tracing::debug;

const RECV_BUFFER_SIZE: usize = 65536;

/// One TCP peer: either an outbound connection or an accepted one.
pub struct TcpTransport {
    address: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(address: &str) -> Self {
        TcpTransport {
            address: address.to_string(),
            stream: None,
        }
    }

    /// Wrap a stream handed out by a listener's accept.
    pub fn from_stream(stream: TcpStream) -> Self {
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        TcpTransport {
            address,
            stream: Some(stream),
        }
    }

    pub fn peer_address(&self) -> &str {
        &self.address
    }

    /// Bound wait for reads; used by the sender's ACK wait.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        if let Some(ref stream) = self.stream {
            stream.set_read_timeout(timeout)?;
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.address)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.write_all(data)?;
            Ok(data.len())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Not connected",
            ))
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.read(buf)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Not connected",
            ))
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        self.stream = None;
        Ok(())
    }
}

/// Listening socket with non-blocking accept so the accept loop can poll
/// a stop flag instead of parking forever.
pub struct TcpServer {
    address: String,
    listener: Option<TcpListener>,
}

impl TcpServer {
    pub fn new(port: u16) -> Self {
        TcpServer {
            address: format!("0.0.0.0:{}", port),
            listener: None,
        }
    }
}

impl TransportListener for TcpServer {
    type Connection = TcpTransport;

    fn bind(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.address)?;
        listener.set_nonblocking(true)?;
        self.listener = Some(listener);
        Ok(())
    }

    fn accept(&mut self) -> Result<TcpTransport> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "Not bound")
        })?;

        // WouldBlock when no peer is waiting; the caller polls.
        let (stream, peer) = listener.accept()?;
        stream.set_nonblocking(false)?;

        // Large receive buffer for multi-chunk MLLP frames
        if let Err(e) = setsockopt(&stream, sockopt::RcvBuf, &RECV_BUFFER_SIZE) {
            debug!("SO_RCVBUF not applied: {}", e);
        }

        debug!("accepted connection from {}", peer);
        Ok(TcpTransport::from_stream(stream))
    }

    fn local_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port())
    }

    fn shutdown(&mut self) {
        self.listener = None;
    }
}
