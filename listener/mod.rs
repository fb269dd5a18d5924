// Inbound MLLP endpoint: accept loop plus one receive worker per
// connection, delivering decoded messages over a crossbeam channel.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use hl7_core::{ack, AckCode, FrameBuffer};
use hl7_transport::{TcpServer, TcpTransport, Transport, TransportListener};

const ACCEPT_POLL: Duration = Duration::from_millis(10);
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const CHUNK_SIZE: usize = 65536;

/// Receives MLLP-framed HL7 messages on a TCP port.
///
/// Messages arrive through `recv` as a lazy, unbounded sequence that ends
/// only after `stop`. Within one connection, messages are delivered and
/// acknowledged strictly in arrival order. A connection that never sends
/// the end-block byte stalls its own worker, nothing else.
pub struct MllpListener {
    port: u16,
    ack_enabled: bool,
    stop: Arc<AtomicBool>,
    receiver: Option<Receiver<String>>,
    accept_handle: Option<JoinHandle<()>>,
    local_port: Option<u16>,
}

impl MllpListener {
    /// Port 0 asks the OS for a free port; see `local_port`.
    pub fn new(port: u16) -> Self {
        MllpListener {
            port,
            ack_enabled: true,
            stop: Arc::new(AtomicBool::new(false)),
            receiver: None,
            accept_handle: None,
            local_port: None,
        }
    }

    /// Enable or disable automatic AA acknowledgments. Must be decided
    /// before `start`; the flag is copied into each connection worker.
    pub fn set_ack(&mut self, enabled: bool) {
        self.ack_enabled = enabled;
    }

    /// Bind and start accepting connections.
    pub fn start(&mut self) -> io::Result<()> {
        let mut server = TcpServer::new(self.port);
        server.bind()?;
        self.local_port = server.local_port();
        info!("MLLP listener on port {}", self.local_port.unwrap_or(self.port));

        let (tx, rx) = unbounded();
        self.receiver = Some(rx);
        self.stop.store(false, Ordering::Relaxed);

        let stop = Arc::clone(&self.stop);
        let ack_enabled = self.ack_enabled;
        let handle = thread::Builder::new()
            .name("mllp-accept".to_string())
            .spawn(move || accept_loop(server, tx, stop, ack_enabled))?;
        self.accept_handle = Some(handle);

        Ok(())
    }

    /// Next received message. Blocks until one arrives; returns `None`
    /// once the listener is stopped and the queue is drained.
    pub fn recv(&self) -> Option<String> {
        self.receiver.as_ref()?.recv().ok()
    }

    /// Non-blocking variant of `recv`.
    pub fn try_recv(&self) -> Option<String> {
        self.receiver.as_ref()?.try_recv().ok()
    }

    /// Bound port once started.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// Close the listening socket and end the message sequence. Workers
    /// on live connections notice the flag within one read timeout.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MllpListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    mut server: TcpServer,
    tx: Sender<String>,
    stop: Arc<AtomicBool>,
    ack_enabled: bool,
) {
    while !stop.load(Ordering::Relaxed) {
        match server.accept() {
            Ok(conn) => {
                let tx = tx.clone();
                let stop = Arc::clone(&stop);
                let spawned = thread::Builder::new()
                    .name("mllp-conn".to_string())
                    .spawn(move || connection_loop(conn, tx, stop, ack_enabled));
                if let Err(e) = spawned {
                    warn!("could not spawn connection worker: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                // One failed accept must not take the listener down.
                warn!("accept failed: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    server.shutdown();
    debug!("accept loop stopped");
}

fn connection_loop(
    mut conn: TcpTransport,
    tx: Sender<String>,
    stop: Arc<AtomicBool>,
    ack_enabled: bool,
) {
    let peer = conn.peer_address().to_string();
    let mut framer = FrameBuffer::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    // Bounded reads so the worker can notice the stop flag.
    if let Err(e) = conn.set_read_timeout(Some(READ_TIMEOUT)) {
        warn!("read timeout not applied for {}: {}", peer, e);
    }

    while !stop.load(Ordering::Relaxed) {
        match conn.receive(&mut chunk) {
            Ok(0) => {
                debug!("peer {} closed", peer);
                break;
            }
            Ok(n) => {
                let text = match framer.push(&chunk[..n]) {
                    Some(text) => text,
                    None => continue, // incomplete frame, keep reading
                };

                if ack_enabled {
                    match ack::build_frame(&text, AckCode::Accept) {
                        Ok(frame) => {
                            if let Err(e) = conn.send(&frame) {
                                warn!("ack send to {} failed: {}", peer, e);
                                break;
                            }
                        }
                        Err(e) => warn!("cannot ack message from {}: {}", peer, e),
                    }
                }

                if tx.send(text).is_err() {
                    break; // consumer gone
                }
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                debug!("read error from {}: {}", peer, e);
                break;
            }
        }
    }

    let _ = conn.disconnect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acks_enabled_by_default() {
        let listener = MllpListener::new(0);
        assert!(listener.ack_enabled);
        assert_eq!(listener.local_port(), None);
    }

    #[test]
    fn recv_before_start_is_none() {
        let listener = MllpListener::new(0);
        assert_eq!(listener.recv(), None);
        assert_eq!(listener.try_recv(), None);
    }
}
