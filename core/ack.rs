// ACK/NACK construction from a received message's own header.
use std::fmt;

use crate::delimiters::Delimiters;
use crate::error::Hl7Error;
use crate::mllp;

/// MSA-1 disposition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    /// AA - application accept.
    Accept,
    /// AE - application error.
    ApplicationError,
    /// AR - application reject.
    Reject,
}

impl AckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::ApplicationError => "AE",
            AckCode::Reject => "AR",
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the acknowledgment text for a received raw message.
///
/// Reuses the first 12 fields of the sender's MSH with the message-type
/// component replaced by literal "ACK" (trigger event kept), then appends
/// `MSA|<code>|<control-id>`. The line ending follows the input: `\n`
/// when present, `\r` otherwise.
pub fn build(raw: &str, code: AckCode) -> Result<String, Hl7Error> {
    let d = Delimiters::from_header(raw)?;
    let ret = if raw.contains('\n') { '\n' } else { '\r' };

    let header_line = raw.split(ret).next().unwrap_or("");
    let parts: Vec<&str> = header_line.split(d.field).collect();

    let control_id = match parts.get(9) {
        Some(id) if !id.is_empty() => *id,
        _ => return Err(Hl7Error::MissingControlId),
    };

    let field = d.field.to_string();
    let component = d.component.to_string();

    let mut header: Vec<String> = parts.iter().take(12).map(|p| p.to_string()).collect();
    if let Some(msg_type) = header.get_mut(8) {
        let mut comps: Vec<&str> = msg_type.split(d.component).collect();
        comps[0] = "ACK";
        *msg_type = comps.join(&component);
    }

    Ok(format!(
        "{msh}{ret}MSA{field}{code}{field}{control_id}{ret}",
        msh = header.join(&field),
        ret = ret,
        field = field,
        code = code,
        control_id = control_id,
    ))
}

/// Acknowledgment text wrapped in the MLLP envelope, ready for the wire.
pub fn build_frame(raw: &str, code: AckCode) -> Result<Vec<u8>, Hl7Error> {
    Ok(mllp::frame(&build(raw, code)?))
}
