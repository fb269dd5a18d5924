// Core module: HL7 v2.x codec and MLLP framing (NO I/O dependencies)
pub mod ack;
pub mod batch;
pub mod delimiters;
pub mod error;
pub mod message;
pub mod mllp;

pub use ack::*;
pub use delimiters::*;
pub use error::*;
pub use message::*;
pub use mllp::*;
