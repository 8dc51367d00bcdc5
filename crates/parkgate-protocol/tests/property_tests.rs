//! Property-based tests for frame encoding and stream parsing.
//!
//! These tests use proptest to generate random frames and byte streams and
//! verify that the framing invariants hold for all of them.

mod common;

use parkgate_core::constants::{MAX_PAYLOAD_LEN, START_BYTE};
use parkgate_protocol::{Frame, ParseEvent, StreamParser, crc8};
use proptest::prelude::*;

/// Strategy for generating encodable frames.
fn valid_frame() -> impl Strategy<Value = Frame> {
    (any::<u8>(), prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN))
        .prop_map(|(id, payload)| Frame::from_raw(id, payload).unwrap())
}

/// Strategy for generating short frames, for multi-frame streams.
fn short_frame() -> impl Strategy<Value = Frame> {
    (1u8..=5u8, prop::collection::vec(any::<u8>(), 0..16))
        .prop_map(|(id, payload)| Frame::from_raw(id, payload).unwrap())
}

/// Strategy for line noise that never contains a start marker.
fn noise() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("start marker", |b| *b != START_BYTE), 1..24)
}

fn frames_in(parser: &mut StreamParser) -> Vec<Frame> {
    parser
        .drain_events()
        .filter_map(|event| match event {
            ParseEvent::Frame(frame) => Some(frame),
            _ => None,
        })
        .collect()
}

proptest! {
    /// Property: every frame survives encode then decode unchanged.
    #[test]
    fn prop_encode_decode_roundtrip(frame in valid_frame()) {
        let wire = frame.encode();
        let decoded = Frame::decode(&wire).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    /// Property: the trailing byte is the CRC of event id and payload.
    #[test]
    fn prop_checksum_covers_body(frame in valid_frame()) {
        let wire = frame.encode();
        prop_assert_eq!(wire[wire.len() - 1], crc8(&wire[2..wire.len() - 1]));
    }

    /// Property: flipping any single bit of an encoded frame is detected.
    #[test]
    fn prop_single_bit_flip_detected(
        frame in valid_frame(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut wire = frame.encode().to_vec();
        let index = position.index(wire.len());
        wire[index] ^= 1 << bit;

        prop_assert!(Frame::decode(&wire).is_err());
    }

    /// Property: decoded frames always satisfy `payload.len() == length - 1`.
    #[test]
    fn prop_length_invariant(frames in prop::collection::vec(short_frame(), 1..8)) {
        let mut parser = StreamParser::new();
        for frame in &frames {
            parser.feed(&frame.encode());
        }

        for frame in frames_in(&mut parser) {
            prop_assert_eq!(frame.payload().len(), frame.length() as usize - 1);
            prop_assert_eq!(frame.encode()[1], frame.length());
        }
    }

    /// Property: chunk boundaries do not change what the parser emits.
    #[test]
    fn prop_chunking_is_transparent(
        frames in prop::collection::vec(short_frame(), 1..8),
        chunk in 1usize..9,
    ) {
        let stream: Vec<u8> = frames.iter().flat_map(|f| f.encode().to_vec()).collect();

        let mut parser = StreamParser::new();
        for piece in stream.chunks(chunk) {
            parser.feed(piece);
        }

        prop_assert_eq!(frames_in(&mut parser), frames);
    }

    /// Property: noise between frames is discarded.
    #[test]
    fn prop_noise_between_frames_ignored(
        frames in prop::collection::vec(short_frame(), 1..6),
        gaps in prop::collection::vec(noise(), 6),
    ) {
        let mut stream = Vec::new();
        for (frame, gap) in frames.iter().zip(&gaps) {
            stream.extend_from_slice(gap);
            stream.extend_from_slice(&frame.encode());
        }

        let mut parser = StreamParser::new();
        parser.feed(&stream);

        prop_assert_eq!(frames_in(&mut parser), frames);
    }

    /// Property: a corrupt header followed by a valid frame yields exactly
    /// that frame.
    #[test]
    fn prop_recovers_after_corrupt_header(
        garbage in noise(),
        declared in any::<prop::sample::Index>(),
        frame in short_frame(),
    ) {
        let wire = frame.encode();

        // Keep the bogus frame within the stream so it completes
        let max_declared = garbage.len() + wire.len() - 2;
        let declared = declared.index(max_declared + 1) as u8;

        let mut stream = vec![START_BYTE, declared];
        stream.extend_from_slice(&garbage);
        stream.extend_from_slice(&wire);

        let bogus_len = declared as usize + 3;
        if declared != 0 {
            prop_assume!(Frame::decode(&stream[..bogus_len]).is_err());
        }

        let mut parser = StreamParser::new();
        parser.feed(&stream);

        prop_assert_eq!(frames_in(&mut parser), vec![frame]);
    }
}
