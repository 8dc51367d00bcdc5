//! Command/acknowledgement exchange with the gate firmware.
//!
//! Every frame sent to the firmware is answered with an ASCII line, `OK`
//! when it verified the frame and `ERR` when it did not. [`LinkSession`]
//! writes one frame at a time and waits, bounded by the ack timeout, for
//! that line.
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────── exchange lock ────────────┐
//! send(event) ──┤ drain stale replies → write → await reply ├──> Ok / Err
//!               └───────────────────────────────────────┘
//!                         │ writer lock          ▲ replies (mpsc)
//!                         ▼                      │
//! respond(reply) ──> FramedWrite<GateCodec>    receive loop (supervisor)
//! ```
//!
//! The receive loop owns the read half and routes acknowledgement lines
//! into the session. The write half sits behind its own short lock, so the
//! receive loop can answer inbound frames while a `send` is still waiting
//! for its acknowledgement.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace, warn};

use parkgate_core::{Error, Result};
use parkgate_protocol::{Frame, GateCodec, GateEvent, Reply};

use crate::state::LinkState;

/// Replies buffered between the receive loop and a waiting `send`.
const REPLY_BUFFER: usize = 8;

/// Boxed write half of the serial channel.
pub type LinkWriter = Box<dyn AsyncWrite + Send + Unpin>;

type FrameSink = FramedWrite<LinkWriter, GateCodec>;

struct Inner {
    writer: Mutex<Option<FrameSink>>,
    exchange: Mutex<mpsc::Receiver<Reply>>,
    replies: mpsc::Sender<Reply>,
    state: watch::Sender<LinkState>,
    ack_timeout: Duration,
}

/// Shared handle to the serial link.
///
/// Cheap to clone; all clones talk over the same channel.
///
/// # Example
///
/// ```no_run
/// use parkgate_link::LinkSession;
/// use parkgate_protocol::GateEvent;
/// use std::time::Duration;
///
/// # async fn example(session: LinkSession) {
/// match session.send(GateEvent::Servo(90)).await {
///     Ok(()) => println!("barrier confirmed"),
///     Err(e) => println!("barrier not confirmed: {e}"),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct LinkSession {
    inner: Arc<Inner>,
}

impl LinkSession {
    /// Create a detached session.
    ///
    /// Sends fail with [`Error::LinkUnavailable`] until a writer is
    /// attached, normally by the [`Supervisor`](crate::Supervisor).
    pub fn new(ack_timeout: Duration) -> Self {
        let (replies, reply_rx) = mpsc::channel(REPLY_BUFFER);
        let (state, _) = watch::channel(LinkState::Disconnected);

        Self {
            inner: Arc::new(Inner {
                writer: Mutex::new(None),
                exchange: Mutex::new(reply_rx),
                replies,
                state,
                ack_timeout,
            }),
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        self.inner.ack_timeout
    }

    /// Send a typed event and wait for the firmware's acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPayload`] if the event cannot be encoded (nothing
    ///   is sent)
    /// - [`Error::LinkUnavailable`] if no channel is open or the write fails
    /// - [`Error::AckRejected`] if the firmware answered `ERR`
    /// - [`Error::AckMismatch`] if it answered anything else
    /// - [`Error::AckTimeout`] if no line arrived in time
    pub async fn send(&self, event: GateEvent) -> Result<()> {
        let frame = event.to_frame()?;
        self.send_frame(frame).await
    }

    /// Send a prebuilt frame and wait for the acknowledgement.
    ///
    /// Only one exchange is in flight at a time; concurrent callers queue.
    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        let mut replies = self.inner.exchange.lock().await;

        // Lines that arrived while nobody was waiting answer nothing we sent
        while let Ok(stale) = replies.try_recv() {
            debug!(reply = %stale, "Discarding stale acknowledgement");
        }

        self.write(&frame).await?;
        trace!(%frame, "Frame sent, awaiting acknowledgement");

        let outcome = match tokio::time::timeout(self.inner.ack_timeout, replies.recv()).await {
            Ok(Some(Reply::Ack)) => Ok(()),
            Ok(Some(Reply::Nack)) => Err(Error::AckRejected),
            Ok(Some(Reply::Unrecognized(line))) => Err(Error::AckMismatch(line)),
            Ok(None) => Err(Error::LinkUnavailable),
            Err(_) => Err(Error::AckTimeout {
                duration_ms: self.inner.ack_timeout.as_millis() as u64,
            }),
        };

        match &outcome {
            Ok(()) => debug!(%frame, "Frame acknowledged"),
            Err(e) => warn!(%frame, error = %e, "Frame not acknowledged"),
        }
        outcome
    }

    /// Answer an inbound frame with `OK` or `ERR`.
    ///
    /// Does not wait for any exchange in progress.
    pub async fn respond(&self, reply: Reply) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        let sink = writer.as_mut().ok_or(Error::LinkUnavailable)?;

        sink.send(reply).await.map_err(|e| {
            warn!(error = %e, "Failed to write acknowledgement");
            Error::LinkUnavailable
        })
    }

    async fn write(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        let sink = writer.as_mut().ok_or(Error::LinkUnavailable)?;

        sink.send(frame).await.map_err(|e| {
            warn!(%frame, error = %e, "Failed to write frame");
            Error::LinkUnavailable
        })
    }

    /// Hand an acknowledgement line to the waiting `send`, if any.
    pub(crate) fn deliver_reply(&self, reply: Reply) {
        if let Err(e) = self.inner.replies.try_send(reply) {
            debug!(error = %e, "Acknowledgement dropped");
        }
    }

    /// Install the write half of a freshly opened channel.
    pub async fn attach(&self, writer: LinkWriter) {
        *self.inner.writer.lock().await = Some(FramedWrite::new(writer, GateCodec::new()));
        self.set_state(LinkState::Connected);
    }

    /// Drop the write half; later sends fail fast.
    pub async fn detach(&self) {
        self.inner.writer.lock().await.take();
        self.set_state(LinkState::Disconnected);
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        self.inner.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Watch connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.inner.state.subscribe()
    }

    /// Wait until the channel is open.
    pub async fn connected(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|state| state.is_connected()).await;
    }
}

impl fmt::Debug for LinkSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSession")
            .field("state", &self.state())
            .field("ack_timeout", &self.inner.ack_timeout)
            .finish()
    }
}
