use crate::crc::{Crc8, crc8};
use bytes::{BufMut, Bytes, BytesMut};
use parkgate_core::{EventId, Error, FrameError, Result, constants::*};
use std::fmt;

/// A single wire frame exchanged with the gate controller.
///
/// # Wire Format
///
/// ```text
/// offset  0     1      2        3 ..       last
///         0xAA  LEN    EVENT    PAYLOAD..  CRC8
/// ```
///
/// `LEN` counts the event id plus the payload, so `LEN == 1 + payload.len()`.
/// `CRC8` covers `EVENT ++ PAYLOAD` (see [`crc8`]).
///
/// A `Frame` is immutable: the length byte and checksum are derived from
/// the event id and payload, so an encoded frame always satisfies both
/// invariants.
///
/// # Protocol Flow Example
///
/// **1. Vehicle arrives at the barrier**
/// ```text
/// AA 02 03 01 38        CAR_DETECT(1)
/// ```
///
/// **2. Controller answers with the admission sequence**
/// ```text
/// AA 02 04 01 53        LP_STATUS(1)
/// AA 02 02 5A AB        SERVO(90)
/// AA 08 01 57 65 6C ... DISPLAY("Welcome")
/// ```
///
/// Every frame is acknowledged by the receiving side with `OK\n`, or
/// `ERR\n` when the checksum or shape is wrong.
///
/// # Basic Usage
///
/// ```
/// use parkgate_protocol::Frame;
/// use parkgate_core::EventId;
///
/// let frame = Frame::new(EventId::CarDetect, vec![0x01]).unwrap();
/// assert_eq!(&frame.encode()[..], &[0xAA, 0x02, 0x03, 0x01, 0x38]);
///
/// let decoded = Frame::decode(&[0xAA, 0x02, 0x03, 0x01, 0x38]).unwrap();
/// assert_eq!(decoded, frame);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    event_id: u8,
    payload: Bytes,
}

impl Frame {
    /// Build a frame for a known event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLong`] when the payload exceeds
    /// [`MAX_PAYLOAD_LEN`] bytes.
    pub fn new(event: EventId, payload: impl Into<Bytes>) -> Result<Self> {
        Self::from_raw(event.as_u8(), payload)
    }

    /// Build a frame from a raw event id, known or not.
    pub fn from_raw(event_id: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self { event_id, payload })
    }

    /// Raw event id byte.
    pub fn event_id(&self) -> u8 {
        self.event_id
    }

    /// Event id as a known [`EventId`], `None` for ids this side does not
    /// understand.
    pub fn event(&self) -> Option<EventId> {
        EventId::try_from(self.event_id).ok()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value of the length byte: event id plus payload.
    pub fn length(&self) -> u8 {
        // payload.len() <= 254 is guaranteed by both constructors
        (self.payload.len() + 1) as u8
    }

    /// CRC-8 over the event id and payload.
    pub fn checksum(&self) -> u8 {
        let mut crc = Crc8::new();
        crc.update(&[self.event_id]);
        crc.update(&self.payload);
        crc.finish()
    }

    /// Total number of bytes on the wire.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 1 + FRAME_OVERHEAD
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the wire bytes to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        dst.put_u8(START_BYTE);
        dst.put_u8(self.length());
        dst.put_u8(self.event_id);
        dst.put_slice(&self.payload);
        dst.put_u8(self.checksum());
    }

    /// Validate and parse one complete frame.
    ///
    /// # Errors
    ///
    /// - [`FrameError::TooShort`] for fewer than [`MIN_FRAME_SIZE`] bytes
    /// - [`FrameError::MissingStart`] when byte 0 is not the start marker
    /// - [`FrameError::ZeroLength`] when the length byte is 0
    /// - [`FrameError::LengthMismatch`] when the length byte disagrees with
    ///   the byte count
    /// - [`FrameError::ChecksumMismatch`] when the trailing byte is not the
    ///   CRC-8 of event id and payload
    pub fn decode(raw: &[u8]) -> std::result::Result<Self, FrameError> {
        if raw.len() < MIN_FRAME_SIZE {
            return Err(FrameError::TooShort { len: raw.len() });
        }
        if raw[0] != START_BYTE {
            return Err(FrameError::MissingStart { found: raw[0] });
        }

        let declared = raw[1];
        if declared == 0 {
            return Err(FrameError::ZeroLength);
        }

        let body = &raw[2..raw.len() - 1];
        if body.len() != declared as usize {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: body.len(),
            });
        }

        let expected = crc8(body);
        let actual = raw[raw.len() - 1];
        if expected != actual {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            event_id: body[0],
            payload: Bytes::copy_from_slice(&body[1..]),
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.event() {
            Some(event) => write!(f, "{event}")?,
            None => write!(f, "0x{:02X}", self.event_id)?,
        }
        write!(f, " [")?;
        for (i, byte) in self.payload.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_encode_car_detect() {
        let frame = Frame::new(EventId::CarDetect, vec![0x01]).unwrap();
        assert_eq!(&frame.encode()[..], &[0xAA, 0x02, 0x03, 0x01, 0x38]);
        assert_eq!(frame.length(), 2);
        assert_eq!(frame.wire_len(), 5);
    }

    #[test]
    fn test_encode_display_text() {
        let frame = Frame::new(EventId::Display, &b"Welcome"[..]).unwrap();
        let wire = frame.encode();

        assert_eq!(wire[0], START_BYTE);
        assert_eq!(wire[1], 8);
        assert_eq!(wire[2], 0x01);
        assert_eq!(&wire[3..10], b"Welcome");
        assert_eq!(wire[10], 0xA1);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = Frame::from_raw(0x07, Bytes::new()).unwrap();
        let wire = frame.encode();
        assert_eq!(wire.len(), MIN_FRAME_SIZE);
        assert_eq!(wire[1], 1);
        assert_eq!(wire[3], crc8(&[0x07]));
    }

    #[test]
    fn test_payload_limit() {
        assert!(Frame::new(EventId::Display, vec![b'x'; MAX_PAYLOAD_LEN]).is_ok());

        let err = Frame::new(EventId::Display, vec![b'x'; MAX_PAYLOAD_LEN + 1]).unwrap_err();
        assert!(matches!(
            err,
            Error::PayloadTooLong { len, max } if len == MAX_PAYLOAD_LEN + 1 && max == MAX_PAYLOAD_LEN
        ));
    }

    #[test]
    fn test_decode_valid() {
        let frame = Frame::decode(&[0xAA, 0x02, 0x02, 90, 0xAB]).unwrap();
        assert_eq!(frame.event(), Some(EventId::Servo));
        assert_eq!(frame.payload(), &[90]);
    }

    #[test]
    fn test_decode_unknown_event_keeps_raw_id() {
        let body = [0x42, 0x10];
        let raw = [0xAA, 0x02, body[0], body[1], crc8(&body)];
        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(frame.event_id(), 0x42);
        assert_eq!(frame.event(), None);
    }

    #[rstest]
    #[case(&[0u8; 0], FrameError::TooShort { len: 0 })]
    #[case(&[0xAA, 0x01, 0x03], FrameError::TooShort { len: 3 })]
    #[case(&[0x55, 0x01, 0x03, 0x00], FrameError::MissingStart { found: 0x55 })]
    #[case(&[0xAA, 0x00, 0x03, 0x00], FrameError::ZeroLength)]
    #[case(&[0xAA, 0x03, 0x03, 0x01, 0x38], FrameError::LengthMismatch { declared: 3, actual: 2 })]
    #[case(&[0xAA, 0x02, 0x03, 0x01, 0x39], FrameError::ChecksumMismatch { expected: 0x38, actual: 0x39 })]
    fn test_decode_rejects(#[case] raw: &[u8], #[case] expected: FrameError) {
        assert_eq!(Frame::decode(raw).unwrap_err(), expected);
    }

    #[test]
    fn test_display_format() {
        let frame = Frame::new(EventId::ParkFull, vec![0x01]).unwrap();
        assert_eq!(frame.to_string(), "PARK_FULL [01]");

        let unknown = Frame::from_raw(0x99, vec![0x0A, 0xFF]).unwrap();
        assert_eq!(unknown.to_string(), "0x99 [0A FF]");
    }
}
