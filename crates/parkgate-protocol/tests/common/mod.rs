//! Common test utilities for protocol integration tests.
//!
//! Helpers build wire bytes from typed events and pair two codec-wrapped
//! ends of an in-memory duplex pipe, one playing the controller and one
//! playing the gate firmware.

#![allow(dead_code)]

use parkgate_protocol::{Frame, GateCodec, GateEvent, Inbound};
use tokio::io::DuplexStream;
use tokio_util::codec::Framed;

/// Wire bytes of a sequence of events, back to back.
pub fn wire_bytes(events: &[GateEvent]) -> Vec<u8> {
    events
        .iter()
        .flat_map(|event| event.to_frame().unwrap().encode().to_vec())
        .collect()
}

/// Wire bytes of a frame with an arbitrary event id.
pub fn raw_frame(event_id: u8, payload: &[u8]) -> Vec<u8> {
    Frame::from_raw(event_id, payload.to_vec())
        .unwrap()
        .encode()
        .to_vec()
}

/// Two codec-wrapped ends of an in-memory pipe.
pub fn create_framed_duplex(
    buffer_size: usize,
) -> (Framed<DuplexStream, GateCodec>, Framed<DuplexStream, GateCodec>) {
    let (controller, device) = tokio::io::duplex(buffer_size);
    (
        Framed::new(controller, GateCodec::new()),
        Framed::new(device, GateCodec::new()),
    )
}

/// Typed events of every valid frame among `items`.
pub fn events_of(items: &[Inbound]) -> Vec<GateEvent> {
    items
        .iter()
        .filter_map(|item| match item {
            Inbound::Frame(frame) => GateEvent::try_from(frame).ok(),
            _ => None,
        })
        .collect()
}

/// The admission sequence sent for a registered plate.
pub fn welcome_sequence() -> Vec<GateEvent> {
    vec![
        GateEvent::LpStatus(true),
        GateEvent::Servo(90),
        GateEvent::display("Welcome"),
    ]
}
