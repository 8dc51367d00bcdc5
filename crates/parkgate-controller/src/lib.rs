//! Arrival control for the parking gate.
//!
//! This crate holds the lot occupancy state and the workflow that runs when
//! a vehicle reaches the barrier: capture its plate, check the registry,
//! open the barrier or refuse entry, and log the movement. [`GateService`]
//! wires the workflow to the serial link.
//!
//! Collaborators are traits ([`PlateRegistry`], [`MovementSink`],
//! [`CommandSink`] plus [`PlateCapture`](parkgate_hardware::PlateCapture)),
//! implemented by the storage repositories, the link session and the
//! in-memory fakes in [`mock`].

pub mod arrival;
pub mod collaborators;
pub mod dispatcher;
pub mod lot;
pub mod mock;
pub mod service;

pub use arrival::{ArrivalController, ArrivalOutcome, PresenceChange};
pub use collaborators::{CommandSink, MovementSink, PlateRegistry};
pub use dispatcher::{Dispatched, Dispatcher};
pub use lot::{Admission, LotSnapshot, LotState, Release};
pub use service::{GateHandle, GateService, ServiceConfig};
