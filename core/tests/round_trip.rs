// Round-trip fidelity: serialize(parse(m)) must reproduce m byte for byte
// for \r-terminated input.
use hl7_core::{ack, batch, AckCode, FrameBuffer, Message};

const ORU: &str = "MSH|^~\\&|LAB|LABFAC|EHR|HOSP|20240315083000||ORU^R01|LAB0042|P|2.5.1\r\
PID|1||555123^^^MRN^MR~999887^^^SSN^SS||SMITH^JANE^A^^^^L||19851120|F|||12 MAIN ST^^SPRINGFIELD^IL^62704\r\
OBR|1|ORD123|FIL456|CBC^COMPLETE BLOOD COUNT^L|||20240315080000\r\
OBX|1|NM|WBC^LEUKOCYTES^LN||7.2|10*3/uL|4.0-11.0|N|||F\r\
OBX|2|NM|HGB^HEMOGLOBIN^LN||13.8|g/dL|12.0-16.0|N|||F\r\
NTE|1||Specimen slightly hemolyzed&recollected\r";

#[test]
fn oru_round_trips_byte_identical() {
    let msg = Message::parse(ORU).unwrap();
    assert_eq!(msg.serialize().unwrap(), ORU);
}

#[test]
fn round_trip_is_stable_across_reparse() {
    let once = Message::parse(ORU).unwrap().serialize().unwrap();
    let twice = Message::parse(&once).unwrap().serialize().unwrap();
    assert_eq!(once, twice);
}

#[test]
fn newline_input_round_trips_to_cr() {
    let lf = ORU.replace('\r', "\n");
    let msg = Message::parse(&lf).unwrap();
    assert_eq!(msg.serialize().unwrap(), ORU);
}

#[test]
fn repeated_obx_segments_emit_in_original_order() {
    let msg = Message::parse(ORU).unwrap();
    assert_eq!(msg.segment_occurrences("OBX").len(), 2);
    let out = msg.serialize().unwrap();
    let first = out.find("WBC").unwrap();
    let second = out.find("HGB").unwrap();
    assert!(first < second);
}

#[test]
fn derived_fields_match_header() {
    let msg = Message::parse(ORU).unwrap();
    assert_eq!(msg.message_type(), "ORU");
    assert_eq!(msg.trigger_event(), "R01");
    assert_eq!(msg.control_id(), "LAB0042");
    assert_eq!(msg.version(), "2.5.1");
    assert_eq!(msg.timestamp(), "20240315083000");
    assert_eq!(
        msg.segment_types(),
        ["MSH", "PID", "OBR", "OBX", "NTE"]
    );
}

#[test]
fn wire_to_model_and_back() {
    // Full inbound path: framed bytes -> reassembly -> parse -> ack.
    let mut buf = FrameBuffer::new();
    let frame = hl7_core::mllp::frame(ORU);
    let (a, b) = frame.split_at(frame.len() / 2);
    assert_eq!(buf.push(a), None);
    let text = buf.push(b).unwrap();

    let msg = Message::parse(text.trim_end_matches('\r')).unwrap();
    assert_eq!(msg.control_id(), "LAB0042");

    let ack = ack::build(&text, AckCode::Accept).unwrap();
    assert!(ack.contains("|ACK^R01|"));
    assert!(ack.contains("MSA|AA|LAB0042"));
}

#[test]
fn batch_split_then_parse_each() {
    let file = format!("{}{}", ORU, ORU.replace("LAB0042", "LAB0043"));
    let msgs = batch::split_default(&file);
    assert_eq!(msgs.len(), 2);
    assert_eq!(Message::parse(&msgs[0]).unwrap().control_id(), "LAB0042");
    assert_eq!(Message::parse(&msgs[1]).unwrap().control_id(), "LAB0043");
}
