// Order-preserving HL7 message model with parse/serialize.
//
// Values live in integer-keyed maps, ordering lives in an explicit
// skeleton: `order` records every segment occurrence in encounter order
// and each segment records its field keys in encounter order. Output is
// rebuilt from the skeleton, never from map iteration order.
use std::collections::{BTreeMap, HashMap};
use std::slice;

use crate::delimiters::Delimiters;
use crate::error::Hl7Error;

/// One component of a field: a scalar or a 1-indexed subcomponent map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Scalar(String),
    Subcomponents(BTreeMap<u32, String>),
}

impl Component {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Component::Scalar(s) => Some(s),
            Component::Subcomponents(_) => None,
        }
    }
}

/// One repetition instance of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    Components(BTreeMap<u32, Component>),
}

/// The stored shape of one field slot, decided once at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSlot {
    Scalar(String),
    Components(BTreeMap<u32, Component>),
    Repetitions(Vec<FieldValue>),
}

impl FieldSlot {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldSlot::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn component(&self, index: u32) -> Option<&Component> {
        match self {
            FieldSlot::Components(map) => map.get(&index),
            _ => None,
        }
    }

    /// First scalar text reachable from this slot. Used for the derived
    /// MSH conveniences where only the leading value matters.
    fn leading_text(&self) -> &str {
        match self {
            FieldSlot::Scalar(s) => s,
            FieldSlot::Components(map) => map
                .get(&1)
                .and_then(|c| c.as_scalar())
                .unwrap_or(""),
            FieldSlot::Repetitions(reps) => match reps.first() {
                Some(FieldValue::Scalar(s)) => s,
                Some(FieldValue::Components(map)) => map
                    .get(&1)
                    .and_then(|c| c.as_scalar())
                    .unwrap_or(""),
                None => "",
            },
        }
    }
}

/// One segment occurrence: value map plus field-key skeleton.
///
/// For MSH the skeleton starts at key 2 - field 1 is the separator
/// character itself and is implied by the rendering, not stored as a
/// field body position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    fields: BTreeMap<u32, FieldSlot>,
    field_keys: Vec<u32>,
}

impl Segment {
    pub fn field(&self, index: u32) -> Option<&FieldSlot> {
        self.fields.get(&index)
    }

    /// Mutable access for in-place scripting of values. The shape of the
    /// message (skeleton, key set) stays fixed after parse.
    pub fn field_mut(&mut self, index: u32) -> Option<&mut FieldSlot> {
        self.fields.get_mut(&index)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field_text(&self, index: u32) -> &str {
        self.field(index).map(|f| f.leading_text()).unwrap_or("")
    }

    fn component_text(&self, field: u32, component: u32) -> &str {
        match self.field(field) {
            Some(FieldSlot::Scalar(s)) => {
                if component == 1 {
                    s
                } else {
                    ""
                }
            }
            Some(slot) => slot
                .component(component)
                .and_then(|c| c.as_scalar())
                .unwrap_or(""),
            None => "",
        }
    }
}

/// Single or repeated occurrences of one segment type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSlot {
    Single(Segment),
    Repeated(Vec<Segment>),
}

impl SegmentSlot {
    pub fn occurrences(&self) -> &[Segment] {
        match self {
            SegmentSlot::Single(seg) => slice::from_ref(seg),
            SegmentSlot::Repeated(segs) => segs,
        }
    }

    fn occurrences_mut(&mut self) -> &mut [Segment] {
        match self {
            SegmentSlot::Single(seg) => slice::from_mut(seg),
            SegmentSlot::Repeated(segs) => segs,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, SegmentSlot::Repeated(_))
    }
}

/// A parsed HL7 message.
#[derive(Debug, Clone)]
pub struct Message {
    segments: HashMap<String, SegmentSlot>,
    /// One entry per segment occurrence, in encounter order.
    order: Vec<String>,
    /// Distinct segment types, in first-encounter order.
    types: Vec<String>,
    delimiters: Delimiters,
    raw: String,
    timestamp: String,
    message_type: String,
    trigger_event: String,
    control_id: String,
    version: String,
}

impl Message {
    /// Parse a raw HL7 message. `\n` line endings are accepted and
    /// normalized to `\r` before splitting.
    ///
    /// Known gap: HL7 escape sequences for literal delimiter characters
    /// are not interpreted; only MSH-2 is exempt from subdivision.
    pub fn parse(raw: &str) -> Result<Message, Hl7Error> {
        if raw.is_empty() {
            return Err(Hl7Error::EmptyInput);
        }

        let delimiters = Delimiters::from_header(raw)?;
        let raw = raw.replace('\n', "\r");

        let mut segments: HashMap<String, SegmentSlot> = HashMap::new();
        let mut order = Vec::new();
        let mut types = Vec::new();

        for line in raw.split('\r') {
            if line.is_empty() {
                continue;
            }
            let name = line
                .get(0..3)
                .ok_or_else(|| Hl7Error::MalformedSegment(line.to_string()))?
                .to_string();

            let segment = parse_segment(&name, line, &delimiters);

            match segments.remove(&name) {
                // Promotion to a repeated segment happens lazily, on the
                // second sighting of the type.
                Some(SegmentSlot::Single(prev)) => {
                    segments.insert(name.clone(), SegmentSlot::Repeated(vec![prev, segment]));
                }
                Some(SegmentSlot::Repeated(mut segs)) => {
                    segs.push(segment);
                    segments.insert(name.clone(), SegmentSlot::Repeated(segs));
                }
                None => {
                    segments.insert(name.clone(), SegmentSlot::Single(segment));
                    types.push(name.clone());
                }
            }
            order.push(name);
        }

        let msh = match segments.get("MSH") {
            Some(slot) => &slot.occurrences()[0],
            None => return Err(Hl7Error::MissingMsh),
        };

        let timestamp = msh.field_text(7).to_string();
        let message_type = msh.component_text(9, 1).to_string();
        let trigger_event = msh.component_text(9, 2).to_string();
        let control_id = msh.field_text(10).to_string();
        let version = msh.field_text(12).to_string();

        Ok(Message {
            segments,
            order,
            types,
            delimiters,
            raw,
            timestamp,
            message_type,
            trigger_event,
            control_id,
            version,
        })
    }

    /// Rebuild the wire text. Walks the recorded skeleton with a
    /// per-type occurrence counter; component and subcomponent maps are
    /// emitted in ascending numeric key order.
    ///
    /// Delimiters are re-read from the model's MSH-1/MSH-2 values, so
    /// scripted edits to the encoding characters take effect on output.
    pub fn serialize(&self) -> Result<String, Hl7Error> {
        let msh = self
            .segments
            .get("MSH")
            .map(|slot| &slot.occurrences()[0])
            .ok_or(Hl7Error::MissingMsh)?;

        let field = msh
            .field(1)
            .and_then(|f| f.as_scalar())
            .and_then(|s| s.chars().next())
            .ok_or(Hl7Error::MissingMsh)?;
        let encoding: Vec<char> = msh
            .field(2)
            .and_then(|f| f.as_scalar())
            .map(|s| s.chars().collect())
            .unwrap_or_default();
        if encoding.len() < 4 {
            return Err(Hl7Error::MalformedHeader(
                "MSH-2 must hold 4 encoding characters".to_string(),
            ));
        }
        let d = Delimiters {
            field,
            component: encoding[0],
            repetition: encoding[1],
            escape: encoding[2],
            subcomponent: encoding[3],
        };

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut out = String::with_capacity(self.raw.len());

        for name in &self.order {
            let n = seen.entry(name.as_str()).or_insert(0);
            let occurrences = self.segments[name].occurrences();
            let segment = &occurrences[*n];
            *n += 1;

            out.push_str(name);
            for key in &segment.field_keys {
                out.push(d.field);
                out.push_str(&render_slot(&segment.fields[key], &d));
            }
            out.push('\r');
        }

        Ok(out)
    }

    /// First occurrence of a segment type.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name).map(|slot| &slot.occurrences()[0])
    }

    /// All occurrences of a segment type, in encounter order.
    pub fn segment_occurrences(&self, name: &str) -> &[Segment] {
        self.segments
            .get(name)
            .map(|slot| slot.occurrences())
            .unwrap_or(&[])
    }

    pub fn segment_mut(&mut self, name: &str) -> Option<&mut Segment> {
        self.segments
            .get_mut(name)
            .map(|slot| &mut slot.occurrences_mut()[0])
    }

    pub fn slot(&self, name: &str) -> Option<&SegmentSlot> {
        self.segments.get(name)
    }

    /// Distinct segment types present, in first-encounter order.
    pub fn segment_types(&self) -> &[String] {
        &self.types
    }

    /// The normalized original text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// MSH-7.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// MSH-9.1.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// MSH-9.2.
    pub fn trigger_event(&self) -> &str {
        &self.trigger_event
    }

    /// MSH-10.
    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    /// MSH-12.
    pub fn version(&self) -> &str {
        &self.version
    }
}

fn parse_segment(name: &str, line: &str, d: &Delimiters) -> Segment {
    // Trim "XYZ" plus the separator character that follows it.
    let body = &line[name.len()..];
    let body = match body.chars().next() {
        Some(c) => &body[c.len_utf8()..],
        None => "",
    };

    let mut segment = Segment::default();
    let is_msh = name == "MSH";
    let mut key = if is_msh {
        // MSH-1 is the separator character itself, never produced by the
        // split; numbering of the split parts starts at 2.
        segment.fields.insert(1, FieldSlot::Scalar(d.field.to_string()));
        2
    } else {
        1
    };

    for text in body.split(d.field) {
        // MSH-2 defines the delimiters and is never subdivided even
        // though it literally contains them.
        let slot = if is_msh && key == 2 {
            FieldSlot::Scalar(text.to_string())
        } else {
            parse_slot(text, d)
        };
        segment.fields.insert(key, slot);
        segment.field_keys.push(key);
        key += 1;
    }

    segment
}

fn parse_slot(text: &str, d: &Delimiters) -> FieldSlot {
    if text.contains(d.repetition) {
        let reps = text
            .split(d.repetition)
            .map(|r| parse_value(r, d))
            .collect();
        return FieldSlot::Repetitions(reps);
    }
    match parse_value(text, d) {
        FieldValue::Scalar(s) => FieldSlot::Scalar(s),
        FieldValue::Components(map) => FieldSlot::Components(map),
    }
}

fn parse_value(text: &str, d: &Delimiters) -> FieldValue {
    if text.contains(d.component) {
        let mut map = BTreeMap::new();
        for (i, part) in text.split(d.component).enumerate() {
            map.insert(i as u32 + 1, parse_component(part, d));
        }
        FieldValue::Components(map)
    } else if text.contains(d.subcomponent) {
        // Subcomponents without a component separator: a single implicit
        // component at index 1.
        let mut map = BTreeMap::new();
        map.insert(1, parse_component(text, d));
        FieldValue::Components(map)
    } else {
        FieldValue::Scalar(text.to_string())
    }
}

fn parse_component(text: &str, d: &Delimiters) -> Component {
    if text.contains(d.subcomponent) {
        let mut map = BTreeMap::new();
        for (i, part) in text.split(d.subcomponent).enumerate() {
            map.insert(i as u32 + 1, part.to_string());
        }
        Component::Subcomponents(map)
    } else {
        Component::Scalar(text.to_string())
    }
}

fn render_slot(slot: &FieldSlot, d: &Delimiters) -> String {
    match slot {
        FieldSlot::Scalar(s) => s.clone(),
        FieldSlot::Components(map) => render_components(map, d),
        FieldSlot::Repetitions(reps) => {
            let parts: Vec<String> = reps
                .iter()
                .map(|rep| match rep {
                    FieldValue::Scalar(s) => s.clone(),
                    FieldValue::Components(map) => render_components(map, d),
                })
                .collect();
            parts.join(&d.repetition.to_string())
        }
    }
}

fn render_components(map: &BTreeMap<u32, Component>, d: &Delimiters) -> String {
    // BTreeMap iterates in ascending key order, which is exactly the
    // mandated numeric component order.
    let parts: Vec<String> = map
        .values()
        .map(|c| match c {
            Component::Scalar(s) => s.clone(),
            Component::Subcomponents(subs) => {
                let subs: Vec<&str> = subs.values().map(String::as_str).collect();
                subs.join(&d.subcomponent.to_string())
            }
        })
        .collect();
    parts.join(&d.component.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADT: &str = "MSH|^~\\&|SND|SNDFAC|RCV|RCVFAC|20240101120000||ADT^A01|MSG00001|P|2.3\rEVN|A01|20240101120000\rPID|1||12345^^^MRN~67890^^^SSN||DOE^JOHN^Q||19700101|M\r";

    #[test]
    fn empty_input_fails() {
        assert_eq!(Message::parse("").unwrap_err(), Hl7Error::EmptyInput);
    }

    #[test]
    fn missing_msh_fails() {
        let err = Message::parse("PID|^~\\&|X\r").unwrap_err();
        assert_eq!(err, Hl7Error::MissingMsh);
    }

    #[test]
    fn derived_header_fields() {
        let msg = Message::parse(ADT).unwrap();
        assert_eq!(msg.timestamp(), "20240101120000");
        assert_eq!(msg.message_type(), "ADT");
        assert_eq!(msg.trigger_event(), "A01");
        assert_eq!(msg.control_id(), "MSG00001");
        assert_eq!(msg.version(), "2.3");
        assert_eq!(msg.segment_types(), ["MSH", "EVN", "PID"]);
    }

    #[test]
    fn msh_field_one_and_two_stay_literal() {
        let msg = Message::parse(ADT).unwrap();
        let msh = msg.segment("MSH").unwrap();
        assert_eq!(msh.field(1).unwrap().as_scalar(), Some("|"));
        assert_eq!(msh.field(2).unwrap().as_scalar(), Some("^~\\&"));
    }

    #[test]
    fn components_and_repetitions() {
        let msg = Message::parse(ADT).unwrap();
        let pid = msg.segment("PID").unwrap();

        match pid.field(3).unwrap() {
            FieldSlot::Repetitions(reps) => {
                assert_eq!(reps.len(), 2);
                match &reps[0] {
                    FieldValue::Components(map) => {
                        assert_eq!(map[&1], Component::Scalar("12345".into()));
                        assert_eq!(map[&4], Component::Scalar("MRN".into()));
                    }
                    other => panic!("expected components, got {:?}", other),
                }
            }
            other => panic!("expected repetitions, got {:?}", other),
        }

        assert_eq!(
            pid.field(5).unwrap().component(2).unwrap().as_scalar(),
            Some("JOHN")
        );
    }

    #[test]
    fn scalar_repetition_round_trip() {
        let raw = "MSH|^~\\&|A|B|C|D|20240101||ORU^R01|X1|P|2.3\rOBX|1|ST|CODE||A~B~C\r";
        let msg = Message::parse(raw).unwrap();
        let obx = msg.segment("OBX").unwrap();
        match obx.field(5).unwrap() {
            FieldSlot::Repetitions(reps) => {
                let vals: Vec<_> = reps
                    .iter()
                    .map(|r| match r {
                        FieldValue::Scalar(s) => s.as_str(),
                        _ => panic!("expected scalars"),
                    })
                    .collect();
                assert_eq!(vals, ["A", "B", "C"]);
            }
            other => panic!("expected repetitions, got {:?}", other),
        }
        assert_eq!(msg.serialize().unwrap(), raw);
    }

    #[test]
    fn implicit_component_for_bare_subcomponents() {
        let raw = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|X1|P|2.3\rZZZ|a&b\r";
        let msg = Message::parse(raw).unwrap();
        let zzz = msg.segment("ZZZ").unwrap();
        match zzz.field(1).unwrap() {
            FieldSlot::Components(map) => match &map[&1] {
                Component::Subcomponents(subs) => {
                    assert_eq!(subs[&1], "a");
                    assert_eq!(subs[&2], "b");
                }
                other => panic!("expected subcomponents, got {:?}", other),
            },
            other => panic!("expected components, got {:?}", other),
        }
        assert_eq!(msg.serialize().unwrap(), raw);
    }

    #[test]
    fn repeated_segments_fold_in_order() {
        let raw = "MSH|^~\\&|A|B|C|D|20240101||ORU^R01|X1|P|2.3\rOBX|1|ST|FIRST\rOBX|2|ST|SECOND\r";
        let msg = Message::parse(raw).unwrap();
        let slot = msg.slot("OBX").unwrap();
        assert!(slot.is_repeated());
        let occ = msg.segment_occurrences("OBX");
        assert_eq!(occ.len(), 2);
        assert_eq!(occ[0].field(3).unwrap().as_scalar(), Some("FIRST"));
        assert_eq!(occ[1].field(3).unwrap().as_scalar(), Some("SECOND"));
        assert_eq!(msg.serialize().unwrap(), raw);
    }

    #[test]
    fn newline_input_normalizes_to_cr() {
        let raw = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|X1|P|2.3\nPID|1\n";
        let msg = Message::parse(raw).unwrap();
        let out = msg.serialize().unwrap();
        assert!(out.contains("\rPID|1\r"));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn scalar_mutation_survives_serialize() {
        let mut msg = Message::parse(ADT).unwrap();
        let evn = msg.segment_mut("EVN").unwrap();
        *evn.field_mut(1).unwrap() = FieldSlot::Scalar("A08".into());
        let out = msg.serialize().unwrap();
        assert!(out.contains("EVN|A08|"));
    }

    #[test]
    fn malformed_segment_is_surfaced() {
        let raw = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|X1|P|2.3\rZZ\r";
        assert!(matches!(
            Message::parse(raw),
            Err(Hl7Error::MalformedSegment(_))
        ));
    }
}
