//! Typed payloads for the known event ids.

use crate::frame::Frame;
use parkgate_core::{EventId, Error, Result, constants::MAX_SERVO_ANGLE};
use std::fmt;

/// A frame with its payload interpreted according to its event id.
///
/// # Example
///
/// ```
/// use parkgate_protocol::{Frame, GateEvent};
///
/// let frame = GateEvent::Servo(90).to_frame().unwrap();
/// assert_eq!(&frame.encode()[..], &[0xAA, 0x02, 0x02, 0x5A, 0xAB]);
///
/// let decoded = GateEvent::try_from(&frame).unwrap();
/// assert_eq!(decoded, GateEvent::Servo(90));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Text for the gate display.
    Display(String),
    /// Barrier angle in degrees, 0-180.
    Servo(u8),
    /// Vehicle presence at the entry sensor.
    CarDetect(bool),
    /// Whether the captured plate is registered.
    LpStatus(bool),
    /// Whether the lot is full.
    ParkFull(bool),
}

impl GateEvent {
    pub fn display(text: impl Into<String>) -> Self {
        GateEvent::Display(text.into())
    }

    pub fn event_id(&self) -> EventId {
        match self {
            GateEvent::Display(_) => EventId::Display,
            GateEvent::Servo(_) => EventId::Servo,
            GateEvent::CarDetect(_) => EventId::CarDetect,
            GateEvent::LpStatus(_) => EventId::LpStatus,
            GateEvent::ParkFull(_) => EventId::ParkFull,
        }
    }

    /// Encode into a frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPayload`] for a servo angle above 180
    /// - [`Error::PayloadTooLong`] for display text longer than the frame
    ///   limit
    pub fn to_frame(&self) -> Result<Frame> {
        let id = self.event_id();
        match self {
            GateEvent::Display(text) => Frame::new(id, text.clone().into_bytes()),
            GateEvent::Servo(angle) => {
                if *angle > MAX_SERVO_ANGLE {
                    return Err(Error::invalid_payload(
                        id,
                        format!("angle {angle} exceeds {MAX_SERVO_ANGLE}"),
                    ));
                }
                Frame::new(id, vec![*angle])
            }
            GateEvent::CarDetect(flag) | GateEvent::LpStatus(flag) | GateEvent::ParkFull(flag) => {
                Frame::new(id, vec![u8::from(*flag)])
            }
        }
    }
}

impl TryFrom<&Frame> for GateEvent {
    type Error = Error;

    fn try_from(frame: &Frame) -> Result<Self> {
        let id = EventId::try_from(frame.event_id())?;
        let payload = frame.payload();

        Ok(match id {
            EventId::Display => {
                let text = std::str::from_utf8(payload)
                    .map_err(|e| Error::invalid_payload(id, e.to_string()))?;
                GateEvent::Display(text.to_string())
            }
            EventId::Servo => {
                let angle = first_byte(id, payload)?;
                if angle > MAX_SERVO_ANGLE {
                    return Err(Error::invalid_payload(
                        id,
                        format!("angle {angle} exceeds {MAX_SERVO_ANGLE}"),
                    ));
                }
                GateEvent::Servo(angle)
            }
            EventId::CarDetect => GateEvent::CarDetect(first_byte(id, payload)? == 1),
            EventId::LpStatus => GateEvent::LpStatus(first_byte(id, payload)? == 1),
            EventId::ParkFull => GateEvent::ParkFull(first_byte(id, payload)? == 1),
        })
    }
}

fn first_byte(id: EventId, payload: &[u8]) -> Result<u8> {
    payload
        .first()
        .copied()
        .ok_or_else(|| Error::invalid_payload(id, "empty payload"))
}

impl TryFrom<Frame> for GateEvent {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self> {
        GateEvent::try_from(&frame)
    }
}

impl fmt::Display for GateEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GateEvent::Display(text) => write!(f, "DISPLAY({text:?})"),
            GateEvent::Servo(angle) => write!(f, "SERVO({angle})"),
            GateEvent::CarDetect(flag) => write!(f, "CAR_DETECT({})", u8::from(*flag)),
            GateEvent::LpStatus(flag) => write!(f, "LP_STATUS({})", u8::from(*flag)),
            GateEvent::ParkFull(flag) => write!(f, "PARK_FULL({})", u8::from(*flag)),
        }
    }
}
