//! Receive loop and reconnection.
//!
//! The [`Supervisor`] owns the connector. It opens the channel, attaches
//! the write half to the [`LinkSession`] and runs the receive loop on the
//! read half until the channel fails, then backs off and starts over:
//!
//! ```text
//! Disconnected ──connect()──> Connecting ──ok──> Connected ──EOF/error──┐
//!      ▲                          │                                    │
//!      └──────── backoff ◄────────┴── err ◄────────────────────────────┘
//! ```
//!
//! Inside the receive loop every verified frame is acknowledged with `OK`
//! and forwarded to the dispatcher channel; corrupt frames are answered
//! with `ERR`; acknowledgement lines go to the session.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use parkgate_core::{Error, Result};
use parkgate_hardware::Connector;
use parkgate_protocol::{Frame, GateCodec, Inbound, Reply};

use crate::backoff::Backoff;
use crate::config::LinkConfig;
use crate::session::LinkSession;
use crate::state::LinkState;

/// Why the receive loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    /// Channel closed or failed; reconnect
    Lost,
    /// Shutdown requested
    Cancelled,
    /// Nobody consumes frames any more
    Abandoned,
}

/// Keeps the serial channel open and feeds inbound frames to a consumer.
pub struct Supervisor<C: Connector> {
    connector: C,
    session: LinkSession,
    frames: mpsc::Sender<Frame>,
    config: LinkConfig,
}

impl<C: Connector> Supervisor<C> {
    /// Create a supervisor delivering verified frames to `frames`.
    pub fn new(
        connector: C,
        session: LinkSession,
        frames: mpsc::Sender<Frame>,
        config: LinkConfig,
    ) -> Self {
        Self {
            connector,
            session,
            frames,
            config,
        }
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    /// Run until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LinkUnavailable`] only when the channel could not be
    /// opened within `max_startup_attempts`. After the first successful
    /// connection, failures are retried indefinitely.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let endpoint = self.connector.describe();
        let mut backoff = Backoff::new(self.config.reconnect.clone());
        let mut failed_attempts: u32 = 0;
        let mut ever_connected = false;

        info!(%endpoint, "Link supervisor started");

        loop {
            self.session.set_state(LinkState::Connecting);

            let opened = tokio::select! {
                _ = cancel.cancelled() => break,
                opened = self.connector.connect() => opened,
            };

            match opened {
                Ok(io) => {
                    ever_connected = true;
                    failed_attempts = 0;
                    backoff.reset();

                    let (reader, writer) = tokio::io::split(io);
                    self.session.attach(Box::new(writer)).await;
                    info!(%endpoint, "Link connected");

                    let exit = self.pump(reader, &cancel).await;
                    self.session.detach().await;

                    match exit {
                        PumpExit::Lost => warn!(%endpoint, "Link lost"),
                        PumpExit::Cancelled => break,
                        PumpExit::Abandoned => {
                            info!("Frame consumer closed, stopping link");
                            break;
                        }
                    }
                }
                Err(e) => {
                    failed_attempts += 1;
                    warn!(%endpoint, attempt = failed_attempts, error = %e, "Link connection failed");

                    if !ever_connected
                        && let Some(max) = self.config.max_startup_attempts
                        && failed_attempts >= max
                    {
                        self.session.set_state(LinkState::Disconnected);
                        error!(%endpoint, attempts = failed_attempts, "Giving up on serial link");
                        return Err(Error::LinkUnavailable);
                    }
                }
            }

            self.session.set_state(LinkState::Disconnected);
            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.session.detach().await;
        info!(%endpoint, "Link supervisor stopped");
        Ok(())
    }

    fn codec(&self) -> GateCodec {
        match self.config.stale_after {
            Some(stale_after) if stale_after > Duration::ZERO => {
                GateCodec::with_stale_after(stale_after)
            }
            _ => GateCodec::new(),
        }
    }

    async fn pump<R>(&self, reader: R, cancel: &CancellationToken) -> PumpExit
    where
        R: AsyncRead + Unpin,
    {
        // Fresh codec per connection: partial input from a dead channel is gone
        let mut inbound = FramedRead::new(reader, self.codec());

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return PumpExit::Cancelled,
                item = inbound.next() => item,
            };

            match item {
                Some(Ok(Inbound::Frame(frame))) => {
                    debug!(%frame, "Frame received");
                    if let Err(e) = self.session.respond(Reply::Ack).await {
                        warn!(error = %e, "Could not acknowledge frame");
                    }

                    match self.frames.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(frame)) => {
                            warn!(%frame, "Dispatcher busy, frame dropped");
                        }
                        Err(TrySendError::Closed(_)) => return PumpExit::Abandoned,
                    }
                }
                Some(Ok(Inbound::Corrupt(reason))) => {
                    warn!(%reason, "Inbound frame rejected");
                    if let Err(e) = self.session.respond(Reply::Nack).await {
                        warn!(error = %e, "Could not reject frame");
                    }
                }
                Some(Ok(Inbound::Reply(reply))) => {
                    trace!(%reply, "Acknowledgement received");
                    self.session.deliver_reply(reply);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Link read failed");
                    return PumpExit::Lost;
                }
                None => return PumpExit::Lost,
            }
        }
    }
}
