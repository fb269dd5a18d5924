// MLLP (Minimal Lower Layer Protocol) byte framing.
//
// Wire frame: SB + message text + EB + CR. The reassembly side collects
// raw TCP chunks until one carries EB, then strips the envelope bytes
// and hands back the message text.

/// Start block, vertical tab.
pub const SB: u8 = 0x0b;
/// End block, file separator.
pub const EB: u8 = 0x1c;
/// Trailing carriage return.
pub const CR: u8 = 0x0d;

/// Wrap message text in the MLLP envelope.
pub fn frame(text: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(text.len() + 3);
    data.push(SB);
    data.extend_from_slice(text.as_bytes());
    data.push(EB);
    data.push(CR);
    data
}

/// Strip SB/EB bytes from a received buffer and decode the text.
pub fn unwrap_frame(data: &[u8]) -> String {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| *b != SB && *b != EB)
        .collect();
    String::from_utf8_lossy(&cleaned).into_owned()
}

/// Per-connection reassembly buffer for partial TCP reads.
///
/// A frame is complete once a pushed chunk contains EB; everything
/// buffered up to and including that chunk is one message. Until then
/// the caller keeps reading.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer::default()
    }

    /// Append one received chunk. Returns the complete decoded message
    /// when this chunk finishes a frame, `None` while incomplete.
    pub fn push(&mut self, chunk: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(chunk);
        if !chunk.contains(&EB) {
            return None;
        }
        let text = unwrap_frame(&self.pending);
        self.pending.clear();
        Some(text)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
