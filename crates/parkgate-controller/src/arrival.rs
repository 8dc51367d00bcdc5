//! Vehicle arrival workflow.
//!
//! A rising presence edge at the barrier runs one arrival:
//!
//! ```text
//! lot full? ──yes──> PARK_FULL(1), DISPLAY("Lot Full")
//!    │no
//! capture plate ──none──> DISPLAY("No Plate Found")
//!    │
//! registered? ──no──> LP_STATUS(0), DISPLAY("Invalid Plate")
//!    │yes
//! take a space ──lot filled meanwhile──> PARK_FULL(1), DISPLAY("Lot Full")
//!    │
//! [PARK_FULL(1) if last space] LP_STATUS(1), SERVO(open), DISPLAY("Welcome"), log entry
//! ```
//!
//! Collaborator failures degrade to "no plate", "not registered" or "not
//! logged". Unconfirmed gate commands are logged and the workflow carries
//! on with the next step.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use parkgate_core::constants::{
    MSG_INVALID_PLATE, MSG_LOT_FULL, MSG_NO_PLATE, MSG_WELCOME, SERVO_OPEN_ANGLE,
};
use parkgate_core::{MovementAction, Result};
use parkgate_hardware::PlateCapture;
use parkgate_protocol::GateEvent;

use crate::collaborators::{CommandSink, MovementSink, PlateRegistry};
use crate::lot::{Admission, LotState};

/// How an arrival ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// No space; the vehicle was turned away without a capture.
    LotFull,
    /// No plate could be read.
    NoPlate,
    /// Registered plate, barrier opened.
    Admitted { plate: String, occupied: u32 },
    /// Plate read but not registered.
    Denied { plate: String },
}

/// Result of a `CAR_DETECT` reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    /// Rising edge; an arrival ran.
    Arrived(ArrivalOutcome),
    /// Falling edge.
    Cleared,
    /// Same reading as the last one.
    Unchanged,
}

/// Drives the barrier for arriving and departing vehicles.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use parkgate_controller::{ArrivalController, ArrivalOutcome, LotState};
/// use parkgate_controller::mock::{MemoryMovementLog, MemoryRegistry, RecordingCommands};
/// use parkgate_hardware::mock::MockCapture;
///
/// #[tokio::main]
/// async fn main() {
///     let controller = ArrivalController::new(
///         Arc::new(LotState::new(10)),
///         MockCapture::returning("30A12345"),
///         MemoryRegistry::with_plates(["30A12345"]),
///         MemoryMovementLog::new(),
///         RecordingCommands::new(),
///     );
///
///     let outcome = controller.on_vehicle_detected().await;
///     assert_eq!(
///         outcome,
///         ArrivalOutcome::Admitted { plate: "30A12345".into(), occupied: 1 }
///     );
/// }
/// ```
pub struct ArrivalController<P, R, M, S> {
    lot: Arc<LotState>,
    capture: P,
    registry: R,
    movements: M,
    commands: S,
    open_angle: u8,
}

impl<P, R, M, S> ArrivalController<P, R, M, S>
where
    P: PlateCapture,
    R: PlateRegistry,
    M: MovementSink,
    S: CommandSink,
{
    pub fn new(lot: Arc<LotState>, capture: P, registry: R, movements: M, commands: S) -> Self {
        Self {
            lot,
            capture,
            registry,
            movements,
            commands,
            open_angle: SERVO_OPEN_ANGLE,
        }
    }

    /// Servo angle that opens the barrier.
    pub fn with_open_angle(mut self, angle: u8) -> Self {
        self.open_angle = angle;
        self
    }

    pub fn lot(&self) -> &Arc<LotState> {
        &self.lot
    }

    /// Handle a `CAR_DETECT` reading.
    ///
    /// Only a change of presence does anything: a rising edge runs an
    /// arrival, a falling edge just records that the sensor is clear. The
    /// edge is detected and recorded under one lock.
    pub async fn on_presence(&self, present: bool) -> PresenceChange {
        if !self.lot.update_presence(present) {
            debug!(present, "Presence unchanged, ignoring");
            return PresenceChange::Unchanged;
        }

        if present {
            info!("Vehicle detected at barrier");
            PresenceChange::Arrived(self.on_vehicle_detected().await)
        } else {
            info!("Barrier sensor clear");
            PresenceChange::Cleared
        }
    }

    /// Run the arrival workflow once.
    pub async fn on_vehicle_detected(&self) -> ArrivalOutcome {
        if self.lot.is_full() {
            info!(capacity = self.lot.snapshot().capacity, "Lot full, turning vehicle away");
            self.turn_away().await;
            return ArrivalOutcome::LotFull;
        }

        let plate = match self.capture.capture_plate().await {
            Ok(Some(plate)) => plate,
            Ok(None) => {
                info!("No plate found");
                self.command(GateEvent::display(MSG_NO_PLATE)).await;
                return ArrivalOutcome::NoPlate;
            }
            Err(e) => {
                error!(error = %e, "Plate capture failed");
                self.command(GateEvent::display(MSG_NO_PLATE)).await;
                return ArrivalOutcome::NoPlate;
            }
        };
        info!(plate = %plate, "Plate captured");

        let registered = match self.registry.is_registered(&plate).await {
            Ok(registered) => registered,
            Err(e) => {
                error!(plate = %plate, error = %e, "Registry lookup failed");
                false
            }
        };

        if !registered {
            info!(plate = %plate, "Plate not registered");
            self.command(GateEvent::LpStatus(false)).await;
            self.command(GateEvent::display(MSG_INVALID_PLATE)).await;
            return ArrivalOutcome::Denied { plate };
        }

        let (occupied, now_full) = match self.lot.try_admit() {
            Admission::Admitted { occupied, now_full } => (occupied, now_full),
            Admission::Full => {
                info!(plate = %plate, "Lot filled while identifying vehicle");
                self.turn_away().await;
                return ArrivalOutcome::LotFull;
            }
        };

        if now_full {
            self.command(GateEvent::ParkFull(true)).await;
        }
        self.command(GateEvent::LpStatus(true)).await;
        self.command(GateEvent::Servo(self.open_angle)).await;
        self.command(GateEvent::display(MSG_WELCOME)).await;

        if let Err(e) = self
            .movements
            .record_movement(&plate, MovementAction::Entry)
            .await
        {
            error!(plate = %plate, error = %e, "Failed to log entry");
        }

        info!(plate = %plate, occupied, "Vehicle admitted");
        ArrivalOutcome::Admitted { plate, occupied }
    }

    /// Free a space for a departing vehicle and log the exit.
    ///
    /// Returns the new occupancy. Clears the lot-full indicator if the lot
    /// was full.
    ///
    /// # Errors
    ///
    /// [`Error::LotEmpty`](parkgate_core::Error::LotEmpty) if no space is
    /// taken; nothing is logged in that case.
    pub async fn record_departure(&self, plate: &str) -> Result<u32> {
        let release = self.lot.release()?;

        if release.was_full {
            self.command(GateEvent::ParkFull(false)).await;
        }

        if let Err(e) = self
            .movements
            .record_movement(plate, MovementAction::Exit)
            .await
        {
            error!(plate = %plate, error = %e, "Failed to log exit");
        }

        info!(plate = %plate, occupied = release.occupied, "Vehicle departed");
        Ok(release.occupied)
    }

    /// Tell the firmware whether the lot is full. Returns the state sent.
    pub async fn announce_capacity(&self) -> bool {
        let snapshot = self.lot.snapshot();
        debug!(
            occupied = snapshot.occupied,
            capacity = snapshot.capacity,
            "Announcing capacity"
        );
        self.command(GateEvent::ParkFull(snapshot.is_full())).await;
        snapshot.is_full()
    }

    async fn turn_away(&self) {
        self.command(GateEvent::ParkFull(true)).await;
        self.command(GateEvent::display(MSG_LOT_FULL)).await;
    }

    async fn command(&self, event: GateEvent) {
        if let Err(e) = self.commands.send_command(event.clone()).await {
            if e.is_unconfirmed_command() {
                debug!(%event, error = %e, "Gate command unconfirmed");
            } else {
                warn!(%event, error = %e, "Gate command failed");
            }
        }
    }
}
