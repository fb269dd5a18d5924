// Transport abstraction - keeps the MLLP endpoints off concrete sockets
use std::io::Result;

/// A bidirectional byte stream to one peer.
pub trait Transport: Send {
    fn connect(&mut self) -> Result<()>;
    fn send(&mut self, data: &[u8]) -> Result<usize>;
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn disconnect(&mut self) -> Result<()>;
}

/// An inbound endpoint handing out per-peer connections.
///
/// `accept` must not block indefinitely: implementations return
/// `WouldBlock` when no peer is waiting so the caller's loop can poll a
/// stop flag between attempts.
pub trait TransportListener: Send {
    type Connection: Transport;

    fn bind(&mut self) -> Result<()>;
    fn accept(&mut self) -> Result<Self::Connection>;
    fn local_port(&self) -> Option<u16>;
    fn shutdown(&mut self);
}
