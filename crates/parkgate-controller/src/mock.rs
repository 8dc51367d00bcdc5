//! In-memory collaborators for tests and dry runs.
//!
//! Clones share state, so a test can keep one clone to inspect after
//! moving another into the controller.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parkgate_core::{Error, MovementAction, Result};
use parkgate_protocol::GateEvent;

use crate::collaborators::{CommandSink, MovementSink, PlateRegistry};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry backed by a set of plates.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    plates: Arc<Mutex<HashSet<String>>>,
    failing: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plates<I, S>(plates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        lock(&registry.plates).extend(plates.into_iter().map(Into::into));
        registry
    }

    pub fn register(&self, plate: impl Into<String>) {
        lock(&self.plates).insert(plate.into());
    }

    /// Make every lookup fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl PlateRegistry for MemoryRegistry {
    async fn is_registered(&self, plate: &str) -> Result<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Collaborator("registry offline".to_string()));
        }
        Ok(lock(&self.plates).contains(plate))
    }
}

/// Movement log kept in a vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryMovementLog {
    records: Arc<Mutex<Vec<(String, MovementAction)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryMovementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<(String, MovementAction)> {
        lock(&self.records).clone()
    }
}

impl MovementSink for MemoryMovementLog {
    async fn record_movement(&self, plate: &str, action: MovementAction) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Collaborator("log offline".to_string()));
        }
        lock(&self.records).push((plate.to_string(), action));
        Ok(())
    }
}

/// Command sink that records every command and confirms it.
#[derive(Debug, Clone, Default)]
pub struct RecordingCommands {
    sent: Arc<Mutex<Vec<GateEvent>>>,
    unconfirmed: Arc<AtomicBool>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every command with [`Error::AckTimeout`] (still recorded).
    pub fn set_unconfirmed(&self, unconfirmed: bool) {
        self.unconfirmed.store(unconfirmed, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<GateEvent> {
        lock(&self.sent).clone()
    }

    /// Return and forget the commands recorded so far.
    pub fn take(&self) -> Vec<GateEvent> {
        std::mem::take(&mut *lock(&self.sent))
    }
}

impl CommandSink for RecordingCommands {
    async fn send_command(&self, event: GateEvent) -> Result<()> {
        lock(&self.sent).push(event);
        if self.unconfirmed.load(Ordering::SeqCst) {
            return Err(Error::AckTimeout { duration_ms: 0 });
        }
        Ok(())
    }
}
