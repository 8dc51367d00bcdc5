//! Receiver state machine for gate frames.
//!
//! This module provides a stateful parser for the raw byte stream coming
//! from the serial line. Bytes are processed one at a time; every completed
//! frame is checked with [`Frame::decode`] and reported as a
//! [`ParseEvent`].
//!
//! # Protocol Framing
//!
//! ```text
//! 0xAA  LEN  EVENT  PAYLOAD...  CRC8
//! ```
//!
//! The length byte tells the parser how many more bytes belong to the
//! frame, so there is no end marker. Bytes seen while the parser is waiting
//! for a start marker are reported as [`ParseEvent::Discarded`]; the
//! acknowledgement lines of the peer travel there.
//!
//! # Usage
//!
//! ```
//! use parkgate_protocol::{ParseEvent, StreamParser};
//!
//! let mut parser = StreamParser::new();
//!
//! // Partial data from the serial port
//! parser.feed(&[0xAA, 0x02]);
//! parser.feed(&[0x03, 0x01, 0x38]);
//!
//! match parser.next_event() {
//!     Some(ParseEvent::Frame(frame)) => println!("Received: {frame}"),
//!     Some(ParseEvent::Rejected(err)) => println!("Rejected: {err}"),
//!     Some(ParseEvent::Discarded(bytes)) => println!("Noise: {bytes:?}"),
//!     None => println!("Need more data"),
//! }
//! ```
//!
//! # Resynchronisation
//!
//! When a completed frame fails validation, or a partial frame goes stale,
//! everything after its start marker is scanned again. A genuine frame that
//! arrived right behind a corrupt header is therefore still recovered.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parkgate_core::FrameError;
use parkgate_core::constants::{FRAME_OVERHEAD, MAX_PAYLOAD_LEN, START_BYTE};

use crate::frame::Frame;

/// Largest number of bytes a single frame can occupy on the wire.
const MAX_FRAME_BYTES: usize = MAX_PAYLOAD_LEN + 2 + FRAME_OVERHEAD;

/// Recommended initial capacity for the event queue.
const INITIAL_EVENT_QUEUE_CAPACITY: usize = 4;

/// State machine states for parsing gate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the `0xAA` start marker.
    ///
    /// Any other byte is noise and is discarded.
    AwaitingStart,

    /// Start marker seen; the next byte is the declared length.
    HaveLength,

    /// Collecting the remaining bytes of a frame.
    ///
    /// `length` is the declared length; the frame is complete once
    /// `length + 3` bytes (start, length, body, checksum) are buffered.
    Collecting { length: u8 },
}

/// Outcome of a completed (or aborted) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// A checksum-verified frame.
    Frame(Frame),

    /// A frame that failed validation. The sender should be answered with
    /// `ERR`.
    Rejected(FrameError),

    /// Consecutive bytes that were not part of any frame, replayed bytes
    /// included.
    Discarded(Vec<u8>),
}

impl ParseEvent {
    pub fn is_frame(&self) -> bool {
        matches!(self, ParseEvent::Frame(_))
    }
}

/// Stateful stream parser for gate frames.
///
/// # State Machine
///
/// ```text
/// ┌──────────────┐  0xAA   ┌────────────┐  LEN >= 1  ┌────────────────────┐
/// │AwaitingStart │────────>│ HaveLength │───────────>│ Collecting{length} │
/// └──────────────┘         └────────────┘            └────────────────────┘
///    ^   │  ^                     │ LEN == 0                   │ length + 3
///    │   │  │                     │ (Rejected)                 │ bytes
///    │   └──┘ other bytes         v                            v
///    │        (Discarded)   ┌────────────┐              Frame::decode
///    └──────────────────────│   reset    │<──── Frame / Rejected + replay
///                           └────────────┘
/// ```
///
/// State transitions:
/// - AwaitingStart → HaveLength: start marker found
/// - HaveLength → Collecting: non-zero length byte
/// - HaveLength → AwaitingStart: zero length byte, a rejection is queued
/// - Collecting → AwaitingStart: frame complete, a frame or a rejection is
///   queued; on rejection the bytes after the start marker are replayed
/// - any → AwaitingStart: a byte arrives after the staleness gap; the
///   partial frame is replayed like a rejected one
///
/// # Example
///
/// ```
/// use parkgate_protocol::{ParseEvent, ParserState, StreamParser};
///
/// let mut parser = StreamParser::new();
///
/// parser.feed(&[0xAA, 0x02, 0x03]);
/// assert_eq!(parser.state(), ParserState::Collecting { length: 2 });
///
/// parser.feed(&[0x01, 0x38]);
/// assert_eq!(parser.state(), ParserState::AwaitingStart);
/// assert!(matches!(parser.next_event(), Some(ParseEvent::Frame(_))));
/// ```
#[derive(Debug)]
pub struct StreamParser {
    /// Current state of the parser state machine.
    state: ParserState,

    /// Bytes of the frame being assembled, start marker included.
    buffer: Vec<u8>,

    /// Bytes queued for re-scanning after a rejected frame.
    replay: VecDeque<u8>,

    /// Completed frames and rejections ready for extraction.
    events: VecDeque<ParseEvent>,

    /// Maximum gap between bytes of one frame.
    stale_after: Option<Duration>,

    /// Arrival time of the previous byte, tracked only with `stale_after`.
    last_byte_at: Option<Instant>,
}

impl StreamParser {
    /// Create a parser without a staleness timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::{ParserState, StreamParser};
    ///
    /// let parser = StreamParser::new();
    /// assert_eq!(parser.state(), ParserState::AwaitingStart);
    /// ```
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingStart,
            buffer: Vec::with_capacity(MAX_FRAME_BYTES),
            replay: VecDeque::new(),
            events: VecDeque::with_capacity(INITIAL_EVENT_QUEUE_CAPACITY),
            stale_after: None,
            last_byte_at: None,
        }
    }

    /// Create a parser that drops a partial frame when the next byte
    /// arrives more than `stale_after` after the previous one.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use parkgate_protocol::StreamParser;
    ///
    /// let parser = StreamParser::with_stale_after(Duration::from_millis(500));
    /// assert_eq!(parser.stale_after(), Some(Duration::from_millis(500)));
    /// ```
    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            stale_after: Some(stale_after),
            ..Self::new()
        }
    }

    /// Configured staleness timeout.
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    /// Feed bytes from the serial line into the parser.
    ///
    /// Multiple events may be queued from a single call.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::StreamParser;
    ///
    /// let mut parser = StreamParser::new();
    /// parser.feed(&[0xAA, 0x02, 0x05, 0x01, 0x46, 0xAA, 0x02, 0x05, 0x00, 0x41]);
    /// assert_eq!(parser.events_available(), 2);
    /// ```
    pub fn feed(&mut self, bytes: &[u8]) {
        let now = Instant::now();
        for &byte in bytes {
            self.push_at(byte, now);
        }
    }

    /// Process a single byte received at `now`.
    pub fn push_at(&mut self, byte: u8, now: Instant) {
        self.expire_stale(now);
        self.drain_replay();
        self.step(byte);
        self.drain_replay();
    }

    /// Extract the next queued event, if any.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::{ParseEvent, StreamParser};
    /// use parkgate_core::FrameError;
    ///
    /// let mut parser = StreamParser::new();
    /// parser.feed(&[0xAA, 0x00]);
    ///
    /// assert_eq!(parser.next_event(), Some(ParseEvent::Rejected(FrameError::ZeroLength)));
    /// assert_eq!(parser.next_event(), None);
    /// ```
    pub fn next_event(&mut self) -> Option<ParseEvent> {
        self.events.pop_front()
    }

    /// Returns current parser state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Returns number of events ready for extraction.
    pub fn events_available(&self) -> usize {
        self.events.len()
    }

    /// Number of bytes held for the frame currently being assembled.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clear all internal buffers and reset state.
    ///
    /// Used when the serial link is reopened: a partial frame from the old
    /// connection must not be completed by bytes from the new one.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::{ParserState, StreamParser};
    ///
    /// let mut parser = StreamParser::new();
    /// parser.feed(&[0xAA, 0x05, 0x01]);
    /// parser.clear();
    ///
    /// assert_eq!(parser.state(), ParserState::AwaitingStart);
    /// assert_eq!(parser.buffered(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.reset();
        self.replay.clear();
        self.events.clear();
        self.last_byte_at = None;
    }

    /// Returns an iterator that drains all currently queued events.
    ///
    /// # Example
    ///
    /// ```
    /// use parkgate_protocol::StreamParser;
    ///
    /// let mut parser = StreamParser::new();
    /// parser.feed(&[0xAA, 0x02, 0x03, 0x01, 0x38]);
    /// parser.feed(&[0xAA, 0x02, 0x03, 0x00, 0x3F]);
    ///
    /// let events: Vec<_> = parser.drain_events().collect();
    /// assert_eq!(events.len(), 2);
    /// assert_eq!(parser.events_available(), 0);
    /// ```
    pub fn drain_events(&mut self) -> DrainEvents<'_> {
        DrainEvents { parser: self }
    }

    /// Abandon a partial frame whose bytes stopped arriving. Its bytes after
    /// the start marker are queued for re-scanning.
    fn expire_stale(&mut self, now: Instant) {
        let Some(limit) = self.stale_after else {
            return;
        };

        if self.state != ParserState::AwaitingStart
            && let Some(last) = self.last_byte_at
            && now.saturating_duration_since(last) > limit
        {
            self.schedule_replay();
            self.reset();
        }
        self.last_byte_at = Some(now);
    }

    /// Advance the state machine by one byte.
    fn step(&mut self, byte: u8) {
        match self.state {
            ParserState::AwaitingStart => {
                if byte != START_BYTE {
                    self.discard(byte);
                    return;
                }
                self.buffer.clear();
                self.buffer.push(byte);
                self.state = ParserState::HaveLength;
            }
            ParserState::HaveLength => {
                if byte == 0 {
                    self.events.push_back(ParseEvent::Rejected(FrameError::ZeroLength));
                    self.reset();
                } else {
                    self.buffer.push(byte);
                    self.state = ParserState::Collecting { length: byte };
                }
            }
            ParserState::Collecting { length } => {
                self.buffer.push(byte);
                if self.buffer.len() == length as usize + FRAME_OVERHEAD {
                    self.complete_frame();
                }
            }
        }
    }

    /// Report a byte outside any frame, merged with a directly preceding
    /// discard.
    fn discard(&mut self, byte: u8) {
        if let Some(ParseEvent::Discarded(bytes)) = self.events.back_mut() {
            bytes.push(byte);
        } else {
            self.events.push_back(ParseEvent::Discarded(vec![byte]));
        }
    }

    /// Validate the buffered frame and queue the outcome.
    fn complete_frame(&mut self) {
        match Frame::decode(&self.buffer) {
            Ok(frame) => self.events.push_back(ParseEvent::Frame(frame)),
            Err(err) => {
                self.events.push_back(ParseEvent::Rejected(err));
                self.schedule_replay();
            }
        }
        self.reset();
    }

    /// Queue everything after the discarded start marker for re-scanning,
    /// ahead of any bytes already waiting.
    fn schedule_replay(&mut self) {
        for &byte in self.buffer[1..].iter().rev() {
            self.replay.push_front(byte);
        }
    }

    /// Re-scan replayed bytes. Each rejection or expiry drops at least the
    /// start marker, so the queue always shrinks.
    fn drain_replay(&mut self) {
        while let Some(byte) = self.replay.pop_front() {
            self.step(byte);
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParserState::AwaitingStart;
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that drains events from a [`StreamParser`].
///
/// This iterator is created by [`StreamParser::drain_events`].
pub struct DrainEvents<'a> {
    parser: &'a mut StreamParser,
}

impl<'a> Iterator for DrainEvents<'a> {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_event()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parser.events_available();
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for DrainEvents<'a> {
    fn len(&self) -> usize {
        self.parser.events_available()
    }
}
