// HL7 encoding characters, declared by the message itself in MSH-1/MSH-2.
use crate::error::Hl7Error;

/// The five separator characters of one message. Extracted from the first
/// 8 characters: "MSH" + field separator + the 4-character MSH-2 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Read the encoding characters from a raw message header.
    ///
    /// Offset 3 is the field separator, offsets 4-7 are the component,
    /// repetition, escape and subcomponent separators in MSH-2 order.
    pub fn from_header(raw: &str) -> Result<Self, Hl7Error> {
        let chars: Vec<char> = raw.chars().take(8).collect();
        if chars.len() < 8 {
            return Err(Hl7Error::MalformedHeader(format!(
                "need at least 8 characters, got {}",
                chars.len()
            )));
        }

        let set = Delimiters {
            field: chars[3],
            component: chars[4],
            repetition: chars[5],
            escape: chars[6],
            subcomponent: chars[7],
        };

        let all = [
            set.field,
            set.component,
            set.repetition,
            set.escape,
            set.subcomponent,
        ];
        for (i, a) in all.iter().enumerate() {
            if a.is_control() {
                return Err(Hl7Error::MalformedHeader(
                    "encoding character is a control character".to_string(),
                ));
            }
            if all[i + 1..].contains(a) {
                return Err(Hl7Error::MalformedHeader(format!(
                    "encoding characters not distinct: {:?}",
                    a
                )));
            }
        }

        Ok(set)
    }

    /// MSH-2 as it appears on the wire.
    pub fn encoding_field(&self) -> String {
        let mut s = String::with_capacity(4);
        s.push(self.component);
        s.push(self.repetition);
        s.push(self.escape);
        s.push(self.subcomponent);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_standard_delimiters() {
        let set = Delimiters::from_header("MSH|^~\\&|APP|FAC").unwrap();
        assert_eq!(set.field, '|');
        assert_eq!(set.component, '^');
        assert_eq!(set.repetition, '~');
        assert_eq!(set.escape, '\\');
        assert_eq!(set.subcomponent, '&');
        assert_eq!(set.encoding_field(), "^~\\&");
    }

    #[test]
    fn rejects_short_header() {
        assert!(matches!(
            Delimiters::from_header("MSH|^~"),
            Err(Hl7Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn rejects_duplicate_characters() {
        assert!(matches!(
            Delimiters::from_header("MSH|^~^&|"),
            Err(Hl7Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn rejects_control_characters() {
        assert!(matches!(
            Delimiters::from_header("MSH|^~\\\t|"),
            Err(Hl7Error::MalformedHeader(_))
        ));
    }
}
