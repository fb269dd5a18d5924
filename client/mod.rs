// client: outbound MLLP sender
use std::io;
use std::time::Duration;

use tracing::debug;

use hl7_core::mllp;
use hl7_transport::{TcpTransport, Transport};

const ACK_BUFFER_SIZE: usize = 4096;

/// Sends MLLP-framed HL7 messages to one remote endpoint.
///
/// Failures come back as `Err` results for the caller to retry or log;
/// nothing here terminates the process.
pub struct MllpSender {
    transport: TcpTransport,
    connected: bool,
    expect_ack: bool,
    ack_timeout: Option<Duration>,
}

impl MllpSender {
    pub fn new(host: &str, port: u16) -> Self {
        MllpSender {
            transport: TcpTransport::new(&format!("{}:{}", host, port)),
            connected: false,
            expect_ack: true,
            ack_timeout: None,
        }
    }

    /// Whether `send` waits for and returns the acknowledgment.
    pub fn expect_ack(&mut self, enabled: bool) {
        self.expect_ack = enabled;
    }

    /// Bound the ACK wait. `None` (the default) blocks until the peer
    /// answers or closes.
    pub fn set_ack_timeout(&mut self, timeout: Option<Duration>) {
        self.ack_timeout = timeout;
    }

    /// Connect to the remote endpoint.
    pub fn start(&mut self) -> io::Result<()> {
        self.transport.connect()?;
        self.transport.set_read_timeout(self.ack_timeout)?;
        self.connected = true;
        debug!("connected to {}", self.transport.peer_address());
        Ok(())
    }

    /// Frame and send one message. When an ACK is expected, performs one
    /// bounded read and returns the decoded acknowledgment text.
    pub fn send(&mut self, text: &str) -> io::Result<Option<String>> {
        if !self.connected {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "sender not started",
            ));
        }

        self.transport.send(&mllp::frame(text))?;
        if !self.expect_ack {
            return Ok(None);
        }

        let mut buf = vec![0u8; ACK_BUFFER_SIZE];
        let n = self.transport.receive(&mut buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before acknowledgment",
            ));
        }
        Ok(Some(mllp::unwrap_frame(&buf[..n])))
    }

    /// Close the connection.
    pub fn stop(&mut self) -> io::Result<()> {
        self.connected = false;
        self.transport.disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_before_start_fails() {
        let mut sender = MllpSender::new("127.0.0.1", 9999);
        let err = sender.send("MSH|^~\\&|X").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
