// Transport module: socket plumbing beneath the MLLP endpoints
pub mod tcp;
pub mod traits;

pub use tcp::*;
pub use traits::*;
