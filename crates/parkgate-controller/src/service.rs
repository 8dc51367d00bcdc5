//! Gate service: link supervisor, dispatcher and capacity announcer.
//!
//! # Architecture
//!
//! ```text
//!                ┌────────────┐  frames (mpsc)  ┌────────────┐
//! serial ◄──────►│ Supervisor │────────────────►│ Dispatcher │──► ArrivalController
//!                └─────┬──────┘                 └────────────┘          │
//!                      │ LinkState (watch)                               │ commands
//!                      ▼                                                 ▼
//!                ┌────────────┐      PARK_FULL(is_full)           LinkSession
//!                │ Announcer  │──────────────────────────────────────────►
//!                └────────────┘
//! ```
//!
//! Each box is one task in a [`JoinSet`]; a shared [`CancellationToken`]
//! stops them all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parkgate_core::constants::SERVO_OPEN_ANGLE;
use parkgate_core::{Error, Result};
use parkgate_hardware::{Connector, PlateCapture};
use parkgate_link::{LinkConfig, LinkSession, LinkState, Supervisor};

use crate::arrival::ArrivalController;
use crate::collaborators::{MovementSink, PlateRegistry};
use crate::dispatcher::Dispatcher;
use crate::lot::LotState;

/// Service settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub link: LinkConfig,

    /// Repeat the lot-full announcement this often while connected.
    ///
    /// `None` announces only when a connection is established.
    pub status_interval: Option<Duration>,

    /// Servo angle that opens the barrier.
    pub open_angle: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            status_interval: None,
            open_angle: SERVO_OPEN_ANGLE,
        }
    }
}

/// Assembles and starts the gate controller.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use parkgate_controller::{GateService, LotState, ServiceConfig};
/// use parkgate_controller::mock::{MemoryMovementLog, MemoryRegistry};
/// use parkgate_hardware::Connector;
/// use parkgate_hardware::mock::MockCapture;
///
/// # async fn example(connector: impl Connector) -> parkgate_core::Result<()> {
/// let service = GateService::new(connector, ServiceConfig::default());
/// let mut handle = service.start(
///     Arc::new(LotState::new(100)),
///     MockCapture::new(),
///     MemoryRegistry::new(),
///     MemoryMovementLog::new(),
/// );
///
/// tokio::select! {
///     _ = tokio::signal::ctrl_c() => {}
///     _ = handle.closed() => {}
/// }
/// handle.shutdown().await
/// # }
/// ```
pub struct GateService<C: Connector> {
    connector: C,
    session: LinkSession,
    config: ServiceConfig,
}

impl<C: Connector> GateService<C> {
    pub fn new(connector: C, config: ServiceConfig) -> Self {
        let session = LinkSession::new(config.link.ack_timeout);
        Self {
            connector,
            session,
            config,
        }
    }

    /// Session used for outbound commands.
    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    /// Spawn the service tasks on the current runtime.
    pub fn start<P, R, M>(
        self,
        lot: Arc<LotState>,
        capture: P,
        registry: R,
        movements: M,
    ) -> GateHandle<P, R, M>
    where
        P: PlateCapture + 'static,
        R: PlateRegistry + 'static,
        M: MovementSink + 'static,
    {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        let (frames_tx, frames_rx) = mpsc::channel(self.config.link.frame_buffer.max(1));
        // Subscribe before the supervisor can connect so the first
        // connection is not missed
        let states = self.session.subscribe();

        let controller = Arc::new(
            ArrivalController::new(
                Arc::clone(&lot),
                capture,
                registry,
                movements,
                self.session.clone(),
            )
            .with_open_angle(self.config.open_angle),
        );

        let supervisor = Supervisor::new(
            self.connector,
            self.session.clone(),
            frames_tx,
            self.config.link,
        );
        tasks.spawn(supervisor.run(cancel.clone()));

        let dispatcher = Dispatcher::new(Arc::clone(&controller));
        let dispatch_cancel = cancel.clone();
        tasks.spawn(async move {
            dispatcher.run(frames_rx, dispatch_cancel).await;
            Ok(())
        });

        tasks.spawn(announce(
            Arc::clone(&controller),
            states,
            self.config.status_interval,
            cancel.clone(),
        ));

        info!(capacity = lot.snapshot().capacity, "Gate service started");

        GateHandle {
            session: self.session,
            controller,
            cancel,
            tasks,
        }
    }
}

/// Sends `PARK_FULL` on every new connection and, optionally, on a timer.
async fn announce<P, R, M>(
    controller: Arc<ArrivalController<P, R, M, LinkSession>>,
    mut states: watch::Receiver<LinkState>,
    interval: Option<Duration>,
    cancel: CancellationToken,
) -> Result<()>
where
    P: PlateCapture,
    R: PlateRegistry,
    M: MovementSink,
{
    let mut ticker = interval.filter(|period| !period.is_zero()).map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    loop {
        let tick = async {
            match ticker.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let connected = states.borrow_and_update().is_connected();
                if connected {
                    controller.announce_capacity().await;
                }
            }
            _ = tick => {
                if states.borrow().is_connected() {
                    controller.announce_capacity().await;
                }
            }
        }
    }

    debug!("Capacity announcer stopped");
    Ok(())
}

/// Running gate service.
pub struct GateHandle<P, R, M> {
    session: LinkSession,
    controller: Arc<ArrivalController<P, R, M, LinkSession>>,
    cancel: CancellationToken,
    tasks: JoinSet<Result<()>>,
}

impl<P, R, M> GateHandle<P, R, M>
where
    P: PlateCapture,
    R: PlateRegistry,
    M: MovementSink,
{
    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    pub fn lot(&self) -> &Arc<LotState> {
        self.controller.lot()
    }

    /// Controller shared with the dispatcher.
    pub fn controller(&self) -> &Arc<ArrivalController<P, R, M, LinkSession>> {
        &self.controller
    }

    /// A vehicle left the lot: free its space, log the exit and clear the
    /// lot-full indicator on the firmware if it was lit.
    ///
    /// Returns the spaces still occupied.
    ///
    /// # Errors
    ///
    /// [`Error::LotEmpty`] when no space is taken.
    pub async fn record_departure(&self, plate: &str) -> Result<u32> {
        self.controller.record_departure(plate).await
    }

    /// Wait for the first service task to end on its own.
    ///
    /// Returns that task's result, or `None` if no task is running. The
    /// supervisor only ends early when the serial link never opened.
    pub async fn closed(&mut self) -> Option<Result<()>> {
        let result = self.tasks.join_next().await?;
        Some(match TaskTermination::classify(result) {
            TaskTermination::Success | TaskTermination::Cancelled => Ok(()),
            TaskTermination::Error(e) => Err(e),
            TaskTermination::Panic(message) => Err(Error::TaskFailed(message)),
        })
    }

    /// Stop all tasks and wait for them.
    ///
    /// # Errors
    ///
    /// The first error a task returned, or [`Error::TaskFailed`] if one
    /// panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();

        let mut first_error = None;
        while let Some(result) = self.tasks.join_next().await {
            let failure = match TaskTermination::classify(result) {
                TaskTermination::Success | TaskTermination::Cancelled => continue,
                TaskTermination::Error(e) => {
                    warn!(error = %e, "Service task failed");
                    e
                }
                TaskTermination::Panic(message) => {
                    error!(%message, "Service task panicked");
                    Error::TaskFailed(message)
                }
            };
            first_error.get_or_insert(failure);
        }

        info!("Gate service stopped");
        first_error.map_or(Ok(()), Err)
    }
}

#[derive(Debug)]
enum TaskTermination {
    Success,
    Error(Error),
    Cancelled,
    Panic(String),
}

impl TaskTermination {
    fn classify(result: std::result::Result<Result<()>, JoinError>) -> Self {
        match result {
            Ok(Ok(())) => Self::Success,
            Ok(Err(e)) => Self::Error(e),
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(e) => Self::Panic(e.to_string()),
        }
    }
}
