//! Interfaces the arrival workflow consumes.
//!
//! The workflow needs three things besides plate capture: a registration
//! check, a movement log and a way to send gate commands. Each is a trait
//! here, implemented for the production types (SQLite repositories and the
//! serial [`LinkSession`]) and for the in-memory doubles in
//! [`mock`](crate::mock).
//!
//! Storage errors are folded into [`Error::Collaborator`]; the workflow
//! only logs them.

use std::future::Future;
use std::sync::Arc;

use parkgate_core::{Error, MovementAction, Result};
use parkgate_link::LinkSession;
use parkgate_protocol::GateEvent;
use parkgate_storage::repositories::{
    MovementLogRepository, PlateRepository, SqliteMovementLogRepository, SqlitePlateRepository,
};

/// Answers whether a plate may enter.
pub trait PlateRegistry: Send + Sync {
    fn is_registered(&self, plate: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Append-only record of entries and exits.
pub trait MovementSink: Send + Sync {
    fn record_movement(
        &self,
        plate: &str,
        action: MovementAction,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Delivers a command to the gate firmware and reports whether it was
/// confirmed.
pub trait CommandSink: Send + Sync {
    fn send_command(&self, event: GateEvent) -> impl Future<Output = Result<()>> + Send;
}

impl PlateRegistry for SqlitePlateRepository {
    async fn is_registered(&self, plate: &str) -> Result<bool> {
        PlateRepository::is_registered(self, plate)
            .await
            .map_err(|e| Error::Collaborator(e.to_string()))
    }
}

impl MovementSink for SqliteMovementLogRepository {
    async fn record_movement(&self, plate: &str, action: MovementAction) -> Result<()> {
        self.record(plate, action)
            .await
            .map(|_| ())
            .map_err(|e| Error::Collaborator(e.to_string()))
    }
}

impl CommandSink for LinkSession {
    fn send_command(&self, event: GateEvent) -> impl Future<Output = Result<()>> + Send {
        self.send(event)
    }
}

impl<T: PlateRegistry> PlateRegistry for Arc<T> {
    fn is_registered(&self, plate: &str) -> impl Future<Output = Result<bool>> + Send {
        (**self).is_registered(plate)
    }
}

impl<T: MovementSink> MovementSink for Arc<T> {
    fn record_movement(
        &self,
        plate: &str,
        action: MovementAction,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).record_movement(plate, action)
    }
}

impl<T: CommandSink> CommandSink for Arc<T> {
    fn send_command(&self, event: GateEvent) -> impl Future<Output = Result<()>> + Send {
        (**self).send_command(event)
    }
}
