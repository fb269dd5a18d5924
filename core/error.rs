// Error taxonomy for the codec. Transport failures stay std::io::Error.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Hl7Error {
    /// Input too short to hold the MSH delimiter header, or the five
    /// encoding characters are not distinct printable characters.
    #[error("malformed MSH header: {0}")]
    MalformedHeader(String),

    #[error("empty message")]
    EmptyInput,

    /// A non-empty line too short to carry a 3-character segment type.
    #[error("unparseable segment: {0:?}")]
    MalformedSegment(String),

    /// No MSH segment found; the derived header fields are undefined.
    #[error("message has no MSH segment")]
    MissingMsh,

    /// MSH-10 absent or blank when building an acknowledgment.
    #[error("message has no control id (MSH-10)")]
    MissingControlId,
}
