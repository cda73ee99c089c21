//! Frame slicing along device string boundaries

use std::time::Instant;

use ledflow_control::transport::parse_datagram;
use ledflow_control::{
    ControlError, DeviceSession, MemorySession, ProtocolVersion, SendOutcome, TransportFramer,
    MAX_PAYLOAD,
};
use proptest::prelude::*;

fn frame_of(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_mixed_strings_end_to_end() {
    let frame = frame_of(1200);
    let mut session = MemorySession::new(vec![300, 300, 600]);
    let framer = TransportFramer::new(ProtocolVersion::Current);

    let outcome = framer.send(&mut session, &frame, Instant::now()).unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Sent {
            datagrams: 3,
            bytes: 1200 + 3 * 16
        }
    );

    let sent = session.sent();
    let expected = [&frame[0..300], &frame[300..600], &frame[600..1200]];
    for (index, (packet, slice)) in sent.iter().zip(expected).enumerate() {
        let datagram = parse_datagram(packet).unwrap();
        assert_eq!(datagram.version, ProtocolVersion::Current);
        assert_eq!(datagram.token, &[0x5A; 12]);
        assert_eq!(datagram.fragment as usize, index);
        assert_eq!(datagram.payload, slice);
    }
}

#[test]
fn test_long_string_is_split() {
    let frame = frame_of(2100);
    let fragments = TransportFramer::fragments(&[300, 1800], &frame).unwrap();
    let lengths: Vec<usize> = fragments.iter().map(|f| f.len()).collect();
    assert_eq!(lengths, vec![300, 900, 900]);
    assert_eq!(fragments.concat(), frame);
}

#[test]
fn test_legacy_token_width() {
    let frame = frame_of(9);
    let framer = TransportFramer::new(ProtocolVersion::Legacy);
    let datagrams = framer.datagrams(&[7; 12], &[9], &frame).unwrap();
    assert_eq!(datagrams.len(), 1);
    assert_eq!(datagrams[0].len(), 13 + 9);
    let parsed = parse_datagram(&datagrams[0]).unwrap();
    assert_eq!(parsed.token, &[7; 9]);
    assert_eq!(parsed.payload, frame.as_slice());
}

#[test]
fn test_mismatch_sends_nothing() {
    let frame = frame_of(600);
    let mut session = MemorySession::new(vec![300, 600]);
    let err = TransportFramer::default()
        .send(&mut session, &frame, Instant::now())
        .unwrap_err();
    assert!(matches!(
        err,
        ControlError::ConfigMismatch {
            expected: 600,
            actual: 900
        }
    ));
    assert!(session.sent().is_empty());
}

#[test]
fn test_no_token_sends_nothing() {
    let frame = frame_of(30);
    let mut session = MemorySession::with_token(vec![30], None);
    assert!(session.current_token(Instant::now()).is_none());
    let outcome = TransportFramer::default()
        .send(&mut session, &frame, Instant::now())
        .unwrap();
    assert_eq!(outcome, SendOutcome::NoToken);
    assert!(session.sent().is_empty());
}

proptest! {
    #[test]
    fn prop_fragments_reassemble(strings in prop::collection::vec(1usize..=MAX_PAYLOAD, 1..8)) {
        let total: usize = strings.iter().sum();
        let frame = frame_of(total);
        let framer = TransportFramer::default();
        let datagrams = framer.datagrams(&[1; 12], &strings, &frame).unwrap();

        prop_assert_eq!(datagrams.len(), strings.len());
        let mut reassembled = Vec::with_capacity(total);
        for (index, (packet, len)) in datagrams.iter().zip(&strings).enumerate() {
            let datagram = parse_datagram(packet).unwrap();
            prop_assert_eq!(datagram.fragment as usize, index);
            prop_assert_eq!(datagram.payload.len(), *len);
            prop_assert!(datagram.payload.len() <= MAX_PAYLOAD);
            reassembled.extend_from_slice(datagram.payload);
        }
        prop_assert_eq!(reassembled, frame);
    }

    #[test]
    fn prop_oversized_strings_stay_within_payload(strings in prop::collection::vec(0usize..4000, 1..6)) {
        let total: usize = strings.iter().sum();
        let frame = frame_of(total);
        let fragments = TransportFramer::fragments(&strings, &frame).unwrap();
        let expected: usize = strings.iter().map(|len| len.div_ceil(MAX_PAYLOAD)).sum();
        prop_assert_eq!(fragments.len(), expected);
        prop_assert!(fragments.iter().all(|f| !f.is_empty() && f.len() <= MAX_PAYLOAD));
        prop_assert_eq!(fragments.concat(), frame);
    }
}
