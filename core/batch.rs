// Raw-text splitting for file-based tooling.
//
// File and FTP collaborators deal only in raw message texts; they never
// see the parsed model. A multi-message file is cut at each segment whose
// type matches the boundary marker, usually "MSH". Anything before the
// first boundary (FHS/BHS envelope lines) is dropped.

/// Split multi-message text into raw single-message texts at `marker`
/// segments. Accepts `\n` line endings and emits `\r`-terminated output.
pub fn split_messages(text: &str, marker: &str) -> Vec<String> {
    let normalized = text.replace('\n', "\r");
    let mut messages: Vec<String> = Vec::new();

    for line in normalized.split('\r') {
        if line.is_empty() {
            continue;
        }
        if is_boundary(line, marker) {
            messages.push(String::new());
        }
        if let Some(current) = messages.last_mut() {
            current.push_str(line);
            current.push('\r');
        }
    }

    messages
}

/// Split on the standard "MSH" message boundary.
pub fn split_default(text: &str) -> Vec<String> {
    split_messages(text, "MSH")
}

// The segment type must match exactly: a longer type sharing the
// marker's prefix (say "MSHX" against "MSH") is not a boundary, so the
// character after the marker must be a separator, not more of the name.
fn is_boundary(line: &str, marker: &str) -> bool {
    match line.get(..marker.len()) {
        Some(prefix) if prefix == marker => line[marker.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_messages() {
        let text = "MSH|^~\\&|A||||20240101||ADT^A01|1|P|2.3\rPID|1\rMSH|^~\\&|A||||20240101||ADT^A02|2|P|2.3\rPID|2\r";
        let msgs = split_default(text);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].contains("|1|P|"));
        assert!(msgs[0].ends_with("PID|1\r"));
        assert!(msgs[1].contains("|2|P|"));
    }

    #[test]
    fn drops_envelope_before_first_boundary() {
        let text = "FHS|^~\\&|FILE\rBHS|^~\\&|BATCH\rMSH|^~\\&|A||||20240101||ADT^A01|1|P|2.3\rPID|1\r";
        let msgs = split_default(text);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].starts_with("MSH|"));
    }

    #[test]
    fn custom_marker() {
        let text = "MSH|^~\\&|A\rOBX|1\rOBX|2\r";
        let msgs = split_messages(text, "OBX");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], "OBX|1\r");
        assert_eq!(msgs[1], "OBX|2\r");
    }

    #[test]
    fn prefix_sharing_segment_is_not_a_boundary() {
        let text = "MSH|^~\\&|A||||20240101||ADT^A01|1|P|2.3\rMSHX|custom\rPID|1\r";
        let msgs = split_default(text);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("MSHX|custom\r"));
    }

    #[test]
    fn newline_input() {
        let text = "MSH|^~\\&|A\nPID|1\nMSH|^~\\&|B\nPID|2\n";
        assert_eq!(split_default(text).len(), 2);
    }
}
