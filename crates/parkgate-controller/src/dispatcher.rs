//! Routes verified inbound frames to the arrival workflow.
//!
//! The dispatcher is the single consumer of the link's frame channel, so
//! at most one arrival runs at a time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parkgate_core::Error;
use parkgate_hardware::PlateCapture;
use parkgate_protocol::{Frame, GateEvent};

use crate::arrival::{ArrivalController, ArrivalOutcome, PresenceChange};
use crate::collaborators::{CommandSink, MovementSink, PlateRegistry};

/// What the dispatcher did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A rising presence edge ran an arrival.
    Arrival(ArrivalOutcome),
    /// The barrier sensor went clear.
    PresenceCleared,
    /// Presence reading equal to the last one.
    Duplicate,
    /// Valid frame the controller has no handler for.
    Unhandled(u8),
    /// Known event with an unusable payload.
    Malformed,
}

pub struct Dispatcher<P, R, M, S> {
    controller: Arc<ArrivalController<P, R, M, S>>,
}

impl<P, R, M, S> Dispatcher<P, R, M, S>
where
    P: PlateCapture,
    R: PlateRegistry,
    M: MovementSink,
    S: CommandSink,
{
    pub fn new(controller: Arc<ArrivalController<P, R, M, S>>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<ArrivalController<P, R, M, S>> {
        &self.controller
    }

    /// Handle one frame.
    ///
    /// The frame has already been acknowledged by the link; nothing here is
    /// reported back to the firmware except the commands the arrival sends.
    pub async fn dispatch(&self, frame: &Frame) -> Dispatched {
        let event = match GateEvent::try_from(frame) {
            Ok(event) => event,
            Err(Error::UnknownEvent(id)) => {
                warn!(event = id, "Unhandled event");
                return Dispatched::Unhandled(id);
            }
            Err(e) => {
                warn!(%frame, error = %e, "Malformed event payload");
                return Dispatched::Malformed;
            }
        };

        match event {
            GateEvent::CarDetect(present) => match self.controller.on_presence(present).await {
                PresenceChange::Arrived(outcome) => Dispatched::Arrival(outcome),
                PresenceChange::Cleared => Dispatched::PresenceCleared,
                PresenceChange::Unchanged => Dispatched::Duplicate,
            },
            other => {
                let id = other.event_id();
                warn!(event = %id, "Unhandled event");
                Dispatched::Unhandled(id.as_u8())
            }
        }
    }

    /// Consume frames until the channel closes or `cancel` fires.
    ///
    /// An arrival in progress runs to completion before cancellation is
    /// observed.
    pub async fn run(self, mut frames: mpsc::Receiver<Frame>, cancel: CancellationToken) {
        info!("Dispatcher started");

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let dispatched = self.dispatch(&frame).await;
            debug!(?dispatched, "Frame dispatched");
        }

        info!("Dispatcher stopped");
    }
}
