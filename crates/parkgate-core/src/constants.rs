//! Core constants for the gate controller wire protocol.
//!
//! This module defines the protocol-level constants shared by the codec,
//! the link layer and the arrival workflow. The values are fixed by the
//! peer firmware; changing them breaks compatibility with deployed
//! barrier controllers.
//!
//! # Frame Structure
//!
//! ```text
//! 0xAA  LEN  EVENT  PAYLOAD...  CRC8
//! ```
//!
//! Where:
//! - `0xAA` - Start marker
//! - `LEN` - Number of bytes in `EVENT` + `PAYLOAD`
//! - `EVENT` - Event identifier (see [`EventId`](crate::EventId))
//! - `CRC8` - Checksum over `EVENT` + `PAYLOAD` (polynomial `0x07`)
//!
//! Frames are acknowledged with an ASCII line, `OK\n` or `ERR\n`.
//!
//! # Usage
//!
//! ```
//! use parkgate_core::constants::*;
//!
//! assert_eq!(START_BYTE, 0xAA);
//! assert_eq!(FRAME_OVERHEAD, 3);
//!
//! // Smallest possible frame: start, length, event id, crc
//! assert_eq!(MIN_FRAME_SIZE, 4);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Start-of-frame marker.
pub const START_BYTE: u8 = 0xAA;

/// Bytes around the length-counted body: start marker, length byte, checksum.
pub const FRAME_OVERHEAD: usize = 3;

/// Minimum wire size of a frame (start, length, event id, checksum).
pub const MIN_FRAME_SIZE: usize = 4;

/// Largest payload accepted by the encoder.
///
/// The length byte counts the event id plus payload; two values are kept
/// in reserve for header overhead.
pub const MAX_PAYLOAD_LEN: usize = 253;

/// Generator polynomial of the frame checksum (CRC-8, MSB first).
pub const CRC8_POLYNOMIAL: u8 = 0x07;

// ============================================================================
// Acknowledgements
// ============================================================================

/// Positive acknowledgement token.
pub const ACK_OK: &str = "OK";

/// Negative acknowledgement token.
pub const ACK_ERR: &str = "ERR";

/// Line terminator after an acknowledgement token.
pub const ACK_TERMINATOR: u8 = b'\n';

/// Longest acknowledgement line kept while scanning for a terminator.
///
/// Anything longer is line noise and is discarded.
pub const MAX_REPLY_LINE: usize = 32;

// ============================================================================
// Barrier
// ============================================================================

/// Servo angle that opens the barrier.
pub const SERVO_OPEN_ANGLE: u8 = 90;

/// Servo angle that closes the barrier.
pub const SERVO_CLOSED_ANGLE: u8 = 0;

/// Largest angle the servo accepts.
pub const MAX_SERVO_ANGLE: u8 = 180;

// ============================================================================
// Display messages
// ============================================================================

/// Shown when the lot has no free space.
pub const MSG_LOT_FULL: &str = "Lot Full";

/// Shown when no plate could be captured.
pub const MSG_NO_PLATE: &str = "No Plate Found";

/// Shown when a registered vehicle is admitted.
pub const MSG_WELCOME: &str = "Welcome";

/// Shown when the captured plate is not registered.
pub const MSG_INVALID_PLATE: &str = "Invalid Plate";

// ============================================================================
// Defaults
// ============================================================================

/// Default number of parking spaces.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Default serial device path.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/serial0";

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default serial read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default wait for an acknowledgement line in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 1000;

/// Default gap after which a partially received frame is dropped.
pub const DEFAULT_STALE_FRAME_MS: u64 = 500;
