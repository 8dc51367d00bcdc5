use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event identifier carried in byte 2 of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventId {
    /// Text for the peer's display (controller -> device).
    Display = 0x01,

    /// Barrier servo angle (controller -> device).
    Servo = 0x02,

    /// Vehicle presence report (device -> controller).
    CarDetect = 0x03,

    /// Plate registration verdict (controller -> device).
    LpStatus = 0x04,

    /// Lot-full indicator (controller -> device).
    ParkFull = 0x05,
}

impl EventId {
    /// All known event ids in wire order.
    pub const ALL: [EventId; 5] = [
        EventId::Display,
        EventId::Servo,
        EventId::CarDetect,
        EventId::LpStatus,
        EventId::ParkFull,
    ];

    /// Raw wire value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EventId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(EventId::Display),
            0x02 => Ok(EventId::Servo),
            0x03 => Ok(EventId::CarDetect),
            0x04 => Ok(EventId::LpStatus),
            0x05 => Ok(EventId::ParkFull),
            other => Err(Error::UnknownEvent(other)),
        }
    }
}

impl From<EventId> for u8 {
    fn from(id: EventId) -> u8 {
        id.as_u8()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EventId::Display => "DISPLAY",
            EventId::Servo => "SERVO",
            EventId::CarDetect => "CAR_DETECT",
            EventId::LpStatus => "LP_STATUS",
            EventId::ParkFull => "PARK_FULL",
        };
        f.write_str(name)
    }
}

/// Direction of a recorded vehicle movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementAction {
    Entry,
    Exit,
}

impl MovementAction {
    /// Value stored in the `movement_log.action` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementAction::Entry => "entry",
            MovementAction::Exit => "exit",
        }
    }
}

impl fmt::Display for MovementAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entry" => Ok(MovementAction::Entry),
            "exit" => Ok(MovementAction::Exit),
            other => Err(Error::Config(format!("Unknown movement action: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x01, EventId::Display)]
    #[case(0x02, EventId::Servo)]
    #[case(0x03, EventId::CarDetect)]
    #[case(0x04, EventId::LpStatus)]
    #[case(0x05, EventId::ParkFull)]
    fn test_event_id_from_wire(#[case] raw: u8, #[case] expected: EventId) {
        assert_eq!(EventId::try_from(raw).unwrap(), expected);
        assert_eq!(expected.as_u8(), raw);
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x06)]
    #[case(0xAA)]
    #[case(0xFF)]
    fn test_unknown_event_id(#[case] raw: u8) {
        let err = EventId::try_from(raw).unwrap_err();
        assert!(matches!(err, Error::UnknownEvent(v) if v == raw));
    }

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::CarDetect.to_string(), "CAR_DETECT");
        assert_eq!(EventId::ParkFull.to_string(), "PARK_FULL");
    }

    #[test]
    fn test_movement_action_roundtrip() {
        for action in [MovementAction::Entry, MovementAction::Exit] {
            let parsed: MovementAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert!("sideways".parse::<MovementAction>().is_err());
    }
}
