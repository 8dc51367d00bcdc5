//! Tokio codec for the gate serial line.
//!
//! This module provides a Tokio-compatible codec that multiplexes the two
//! kinds of traffic found on the serial line: binary frames and the ASCII
//! acknowledgement lines that answer them.
//!
//! # Overview
//!
//! `GateCodec` wraps the [`StreamParser`] and a [`LineAssembler`]. It
//! implements:
//! - [`Decoder`]: splits the byte stream into [`Inbound`] items
//! - [`Encoder<Frame>`] and [`Encoder<GateEvent>`]: frame output
//! - [`Encoder<Reply>`]: acknowledgement output (`OK\n` / `ERR\n`)
//!
//! # Architecture
//!
//! ```text
//! serial bytes -> StreamParser --> Inbound::Frame / Inbound::Corrupt
//!                      │
//!                      └ ParseEvent::Discarded -> LineAssembler -> Inbound::Reply
//! ```
//!
//! Only bytes the parser discards are considered for acknowledgement lines,
//! so text inside a frame payload is never mistaken for an `OK`. Bytes
//! released by a rejected or stale frame count as discarded, so an `OK`
//! following a stray start marker still reaches the waiting sender.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use parkgate_protocol::{GateCodec, GateEvent, Inbound, Reply};
//! use tokio_util::codec::Framed;
//!
//! # async fn example(port: tokio::io::DuplexStream) -> parkgate_core::Result<()> {
//! let mut framed = Framed::new(port, GateCodec::new());
//!
//! framed.send(GateEvent::ParkFull(false)).await?;
//!
//! while let Some(item) = framed.next().await {
//!     match item? {
//!         Inbound::Frame(frame) => {
//!             println!("Received: {frame}");
//!             framed.send(Reply::Ack).await?;
//!         }
//!         Inbound::Corrupt(err) => {
//!             println!("Rejected: {err}");
//!             framed.send(Reply::Nack).await?;
//!         }
//!         Inbound::Reply(reply) => println!("Peer answered {reply}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Frame, GateEvent, LineAssembler, ParseEvent, Reply, StreamParser};
use parkgate_core::{Error, FrameError, Result};

/// One item read from the serial line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A checksum-verified frame; answer with [`Reply::Ack`].
    Frame(Frame),
    /// A frame that failed validation; answer with [`Reply::Nack`].
    Corrupt(FrameError),
    /// An acknowledgement line for a frame this side sent.
    Reply(Reply),
}

/// Tokio codec for the gate serial protocol.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use parkgate_protocol::{GateCodec, Inbound, Reply};
///
/// let mut codec = GateCodec::new();
/// let mut buffer = BytesMut::from(&b"OK\n\xAA\x02\x03\x01\x38"[..]);
///
/// assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Inbound::Reply(Reply::Ack)));
/// assert!(matches!(codec.decode(&mut buffer).unwrap(), Some(Inbound::Frame(_))));
/// assert_eq!(codec.decode(&mut buffer).unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct GateCodec {
    /// Frame state machine.
    parser: StreamParser,

    /// Acknowledgement line assembly for bytes outside frames.
    lines: LineAssembler,

    /// Decoded items not yet handed out.
    ready: VecDeque<Inbound>,
}

impl GateCodec {
    /// Create a codec without a staleness timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec whose parser drops partial frames after `stale_after`
    /// of silence.
    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            parser: StreamParser::with_stale_after(stale_after),
            ..Self::default()
        }
    }

    /// Access the underlying parser state (for diagnostics).
    pub fn parser(&self) -> &StreamParser {
        &self.parser
    }

    /// Drop all partial input, used when the channel is reopened.
    pub fn reset(&mut self) {
        self.parser.clear();
        self.lines.reset();
        self.ready.clear();
    }

    fn push_byte(&mut self, byte: u8, now: Instant) {
        self.parser.push_at(byte, now);

        while let Some(event) = self.parser.next_event() {
            match event {
                ParseEvent::Discarded(bytes) => {
                    let replies = bytes.into_iter().filter_map(|b| self.lines.push(b));
                    self.ready.extend(replies.map(Inbound::Reply));
                }
                ParseEvent::Frame(frame) => {
                    self.lines.reset();
                    self.ready.push_back(Inbound::Frame(frame));
                }
                ParseEvent::Rejected(err) => {
                    self.lines.reset();
                    self.ready.push_back(Inbound::Corrupt(err));
                }
            }
        }
    }
}

impl Decoder for GateCodec {
    type Item = Inbound;
    type Error = Error;

    /// Decode the next item from the byte stream.
    ///
    /// All bytes in `src` are consumed into the parser; items are queued
    /// internally and returned one per call.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Inbound))` - A frame, rejection or reply is available
    /// - `Ok(None)` - Need more data
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            let now = Instant::now();
            let bytes = src.split();
            for &byte in bytes.iter() {
                self.push_byte(byte, now);
            }
        }

        Ok(self.ready.pop_front())
    }
}

impl Encoder<Frame> for GateCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst);
        Ok(())
    }
}

impl Encoder<&Frame> for GateCodec {
    type Error = Error;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst);
        Ok(())
    }
}

impl Encoder<GateEvent> for GateCodec {
    type Error = Error;

    /// Encode a typed event.
    ///
    /// # Errors
    ///
    /// Returns the [`GateEvent::to_frame`] error for invalid payloads;
    /// nothing is written in that case.
    fn encode(&mut self, item: GateEvent, dst: &mut BytesMut) -> Result<()> {
        item.to_frame()?.encode_into(dst);
        Ok(())
    }
}

impl Encoder<Reply> for GateCodec {
    type Error = Error;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(dst);
        Ok(())
    }
}
