use std::collections::BTreeMap;

use super::*;
use crate::record::MessageHead;

/// Captures every event the parser emits, in order, for assertion.
#[derive(Debug, Default)]
struct RecordingSink {
    heads: Vec<MessageHead>,
    parts: Vec<Vec<u8>>,
    completions: Vec<u32>,
    elements: Vec<Vec<u8>>,
    fields: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
    sd: BTreeMap<String, BTreeMap<String, String>>,
    current_sdid: Option<String>,
    current_field: Option<String>,
}

impl RecordingSink {
    fn body(&self) -> Vec<u8> {
        self.parts.concat()
    }
}

impl MessageSink for RecordingSink {
    fn on_msg_head(&mut self, head: &MessageHead) -> Result<(), SinkError> {
        self.heads.push(head.clone());
        Ok(())
    }

    fn on_msg_part(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.parts.push(bytes.to_vec());
        Ok(())
    }

    fn on_msg_complete(&mut self, msg_length: u32) -> Result<(), SinkError> {
        self.completions.push(msg_length);
        Ok(())
    }

    fn on_sd_element(&mut self, name: &[u8]) -> Result<(), SinkError> {
        self.elements.push(name.to_vec());
        let sdid = String::from_utf8_lossy(name).into_owned();
        self.sd.entry(sdid.clone()).or_default();
        self.current_sdid = Some(sdid);
        Ok(())
    }

    fn on_sd_field(&mut self, name: &[u8]) -> Result<(), SinkError> {
        self.fields.push(name.to_vec());
        self.current_field = Some(String::from_utf8_lossy(name).into_owned());
        Ok(())
    }

    fn on_sd_value(&mut self, value: &[u8]) -> Result<(), SinkError> {
        self.values.push(value.to_vec());
        let sdid = self.current_sdid.clone().expect("value without element");
        let field = self.current_field.clone().expect("value without field");
        self.sd
            .entry(sdid)
            .or_default()
            .insert(field, String::from_utf8_lossy(value).into_owned());
        Ok(())
    }
}

fn parse_all(input: &[u8]) -> (SyslogParser, RecordingSink) {
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(input, &mut sink).expect("parse should succeed");
    (parser, sink)
}

/// Builds a complete octet-counted frame from a payload, computing the
/// count from the payload's own length rather than a hand-counted literal.
fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{} ", payload.len()).into_bytes();
    out.extend_from_slice(payload);
    out
}

/// rsyslogd-style frame with three nil tokens before the bracketed text:
/// per the RFC 5424 grammar and the original implementation's own test
/// fixture, PROCID/MESSAGEID/SD-BLOCK are all nil here, so the bracketed
/// text is body, not structured data.
const SCENARIO_1: &[u8] = b"158 <46>1 2013-04-02T14:12:04.873490-05:00 tohru rsyslogd - - - [origin software=\"rsyslogd\" swVersion=\"7.2.5\" x-pid=\"12662\" x-info=\"http://www.rsyslog.com\"] start";

const SCENARIO_2_TWO_ELEMENTS: &[u8] = b"259 <46>1 2012-12-11T15:48:23.217459-06:00 tohru rsyslogd 6611 12512 [origin_1 software=\"rsyslogd\" swVersion=\"7.2.2\" x-pid=\"12297\" x-info=\"http://www.rsyslog.com\"][origin_2 software=\"rsyslogd\" swVersion=\"7.2.2\" x-pid=\"12297\" x-info=\"http://www.rsyslog.com\"] start";

const SCENARIO_3_NO_SD: &[u8] = b"30 <46>1 - tohru - 6611 - - start";

const SCENARIO_6_BAD_OCTET_COUNT: &[u8] = b"2A <46>1 - tohru - 6611 - - start";

#[test]
fn scenario_three_dashes_before_brackets_has_empty_sd_and_bracket_text_in_body() {
    assert_eq!(SCENARIO_1.len(), 3 + 1 + 158);
    let payload = &SCENARIO_1[4..];
    assert_eq!(payload.len(), 158);

    let (_parser, sink) = parse_all(SCENARIO_1);
    assert_eq!(sink.completions, vec![158]);
    assert_eq!(sink.heads.len(), 1);
    let head = &sink.heads[0];
    assert_eq!(head.priority, 46);
    assert_eq!(head.version, 1);
    assert_eq!(head.timestamp, "2013-04-02T14:12:04.873490-05:00");
    assert_eq!(head.hostname, "tohru");
    assert_eq!(head.appname, "rsyslogd");
    assert_eq!(head.processid, "-");
    assert_eq!(head.messageid, "-");
    assert!(sink.elements.is_empty(), "no SD element should have been opened");
    assert_eq!(
        sink.body(),
        b" - [origin software=\"rsyslogd\" swVersion=\"7.2.5\" x-pid=\"12662\" x-info=\"http://www.rsyslog.com\"] start".to_vec()
    );
}

#[test]
fn scenario_missing_timestamp_and_appname_still_parses_the_rest() {
    let payload = &SCENARIO_3_NO_SD[3..];
    assert_eq!(payload.len(), 30);

    let (_parser, sink) = parse_all(SCENARIO_3_NO_SD);
    assert_eq!(sink.completions, vec![30]);
    let head = &sink.heads[0];
    assert_eq!(head.priority, 46);
    assert_eq!(head.version, 1);
    assert_eq!(head.timestamp, "-");
    assert_eq!(head.hostname, "tohru");
    assert_eq!(head.appname, "-");
    assert_eq!(head.processid, "6611");
    assert_eq!(head.messageid, "-");
    assert!(sink.elements.is_empty());
    assert_eq!(sink.body(), b" start".to_vec());
}

#[test]
fn scenario_chunked_delivery_of_the_actual_message_matches_the_whole_feed() {
    let (_whole, whole_sink) = parse_all(SCENARIO_1);

    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    for chunk in SCENARIO_1.chunks(10) {
        parser.feed(chunk, &mut sink).expect("chunked parse should succeed");
    }
    assert_eq!(sink.heads, whole_sink.heads);
    assert_eq!(sink.body(), whole_sink.body());
    assert_eq!(sink.completions, whole_sink.completions);
}

#[test]
fn scenario_four_copies_back_to_back_complete_four_times_in_order() {
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    for _ in 0..4 {
        parser.feed(SCENARIO_1, &mut sink).expect("parse should succeed");
    }
    assert_eq!(sink.completions, vec![158, 158, 158, 158]);
    assert_eq!(sink.heads.len(), 4);
    assert!(sink.heads.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn scenario_bad_octet_count_is_rejected_before_any_event_fires() {
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(SCENARIO_6_BAD_OCTET_COUNT, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::MalformedOctetCount);
    assert!(sink.heads.is_empty());
    assert!(sink.completions.is_empty());
}

#[test]
fn scenario_thirty_eight_digit_octet_count_overflows() {
    let msg = b"93453958910386509183406981093865109380 <46>1 - tohru - 6611 - - start";
    let prefix_digits = &msg[..38];
    assert_eq!(prefix_digits.len(), 38);
    assert!(prefix_digits.iter().all(u8::is_ascii_digit));

    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(msg, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::OctetCountOverflow);
}

#[test]
fn round_tripping_a_record_through_json_preserves_its_structure() {
    let (_parser, sink) = parse_all(SCENARIO_2_TWO_ELEMENTS);
    let head = sink.heads[0].clone();
    let record = crate::record::MessageRecord {
        body: sink.body(),
        body_length: sink.completions[0],
        head,
    };

    let json = record.to_json();
    let wire: crate::record::WireRecord = serde_json::from_value(json).unwrap();

    assert_eq!(wire.priority, record.head.priority);
    assert_eq!(wire.version, record.head.version);
    assert_eq!(wire.timestamp, record.head.timestamp);
    assert_eq!(wire.hostname, record.head.hostname);
    assert_eq!(wire.appname, record.head.appname);
    assert_eq!(wire.processid, record.head.processid);
    assert_eq!(wire.messageid, record.head.messageid);
    assert_eq!(wire.sd, record.head.sd);
    assert_eq!(wire.message, String::from_utf8_lossy(&record.body));
    assert_eq!(wire.msg_length, record.body_length);
}

#[test]
fn scenario_two_structured_data_elements_are_both_captured() {
    let payload = &SCENARIO_2_TWO_ELEMENTS[4..];
    assert_eq!(payload.len(), 259);

    let (_parser, sink) = parse_all(SCENARIO_2_TWO_ELEMENTS);
    assert_eq!(sink.completions, vec![259]);
    assert_eq!(sink.heads[0].processid, "6611");
    assert_eq!(sink.heads[0].messageid, "12512");
    assert_eq!(sink.elements, vec![b"origin_1".to_vec(), b"origin_2".to_vec()]);
    assert_eq!(sink.sd.len(), 2);
    assert_eq!(sink.sd["origin_1"]["software"], "rsyslogd");
    assert_eq!(sink.sd["origin_1"]["x-info"], "http://www.rsyslog.com");
    assert_eq!(sink.sd["origin_2"]["x-pid"], "12297");
    assert_eq!(sink.body(), b" start".to_vec());
}

#[test]
fn nil_structured_data_block_opens_no_elements() {
    let payload: &[u8] = b"<1>1 - - - - - - hi";
    let frame = framed(payload);
    let (_parser, sink) = parse_all(&frame);
    assert_eq!(sink.completions, vec![payload.len() as u32]);
    assert!(sink.elements.is_empty());
    assert_eq!(sink.body(), b" hi".to_vec());
}

#[test]
fn chunk_boundaries_mid_field_do_not_change_the_result() {
    let (_whole, whole_sink) = parse_all(SCENARIO_2_TWO_ELEMENTS);

    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    for chunk in SCENARIO_2_TWO_ELEMENTS.chunks(3) {
        parser.feed(chunk, &mut sink).expect("chunked parse should succeed");
    }
    assert_eq!(sink.heads, whole_sink.heads);
    assert_eq!(sink.sd, whole_sink.sd);
    assert_eq!(sink.body(), whole_sink.body());
    assert_eq!(sink.completions, whole_sink.completions);
}

#[test]
fn chunk_boundary_splitting_a_single_byte_separator_still_resumes() {
    let payload: &[u8] = b"<1>1 - - - - - - hi";
    let frame = framed(payload);
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let (first, rest) = frame.split_at(2);
    parser.feed(first, &mut sink).unwrap();
    parser.feed(rest, &mut sink).unwrap();
    assert_eq!(sink.completions, vec![payload.len() as u32]);
}

#[test]
fn back_to_back_frames_in_a_single_feed_call_both_parse() {
    let payload: &[u8] = b"<1>1 - - - - - - hi";
    let frame = framed(payload);
    let mut input = Vec::new();
    input.extend_from_slice(&frame);
    input.extend_from_slice(&frame);

    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(&input, &mut sink).unwrap();
    assert_eq!(sink.completions, vec![payload.len() as u32, payload.len() as u32]);
    assert_eq!(sink.heads.len(), 2);
}

#[test]
fn minimal_frame_with_all_nil_fields_is_accepted() {
    let payload: &[u8] = b"<1>1 - - - - - - x";
    let frame = framed(payload);
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(&frame, &mut sink).unwrap();
    assert_eq!(sink.completions, vec![payload.len() as u32]);
}

#[test]
fn ten_digit_octet_count_is_rejected_as_overflow() {
    let msg = b"1234567890 <1>1 - - - - - - x";
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(msg, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::OctetCountOverflow);
}

#[test]
fn non_digit_byte_in_octet_count_is_malformed() {
    let msg = b"2A <1>1 - - - - - - x";
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(msg, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::MalformedOctetCount);
}

#[test]
fn priority_of_zero_is_accepted() {
    let frame = framed(b"<0>1 - - - - - - x");
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(&frame, &mut sink).unwrap();
    assert_eq!(sink.heads[0].priority, 0);
}

#[test]
fn priority_at_the_upper_boundary_191_is_accepted() {
    let frame = framed(b"<191>1 - - - - - - x");
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(&frame, &mut sink).unwrap();
    assert_eq!(sink.heads[0].priority, 191);
}

#[test]
fn priority_of_192_is_out_of_range() {
    let frame = framed(b"<192>1 - - - - - - x");
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(&frame, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::InvalidPriority(192));
}

#[test]
fn escaped_characters_in_sd_values_are_unescaped() {
    let payload = br#"<1>1 - - - - - [x y="a\"b\\c\]d"] hi"#;
    let frame = framed(payload);
    let (_parser, sink) = parse_all(&frame);
    assert_eq!(sink.sd["x"]["y"], "a\"b\\c]d");
}

#[test]
fn structured_data_value_never_closed_is_unterminated() {
    // the stated octet count matches this payload exactly, so the frame
    // ends mid-value with no closing quote ever seen
    let payload: &[u8] = br#"<1>1 - - - - - [x y="ab"#;
    let frame = framed(payload);
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    let err = parser.feed(&frame, &mut sink).unwrap_err();
    assert_eq!(err, ParseError::UnterminatedSDValue);
}

#[test]
fn reset_clears_in_progress_frame_state() {
    let mut parser = SyslogParser::new();
    let mut sink = RecordingSink::default();
    parser.feed(b"500 <1>1 partial", &mut sink).unwrap();
    assert_ne!(parser.state(), ParserState::ExpectingOctetCount);
    parser.reset();
    assert_eq!(parser.state(), ParserState::ExpectingOctetCount);
}
