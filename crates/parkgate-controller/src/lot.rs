//! Occupancy accounting.
//!
//! [`LotState`] is the single source of truth for how many spaces are
//! taken. Every check-and-update happens under one short lock that is
//! never held across I/O, so concurrent admissions can never push
//! `occupied` past `capacity`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use parkgate_core::{Error, Result};

/// Point-in-time copy of the lot counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotSnapshot {
    pub occupied: u32,
    pub capacity: u32,
    pub vehicle_present: bool,
}

impl LotSnapshot {
    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity
    }

    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.occupied)
    }
}

/// Result of [`LotState::try_admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A space was taken; `now_full` is set when it was the last one.
    Admitted { occupied: u32, now_full: bool },
    /// No space left, nothing changed.
    Full,
}

/// Result of [`LotState::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub occupied: u32,
    /// The lot was full before this space was freed.
    pub was_full: bool,
}

#[derive(Debug)]
struct Counters {
    occupied: u32,
    capacity: u32,
    vehicle_present: bool,
}

/// Shared, lock-protected lot counters.
///
/// # Examples
///
/// ```
/// use parkgate_controller::lot::{Admission, LotState};
///
/// let lot = LotState::new(2);
/// assert_eq!(lot.try_admit(), Admission::Admitted { occupied: 1, now_full: false });
/// assert_eq!(lot.try_admit(), Admission::Admitted { occupied: 2, now_full: true });
/// assert_eq!(lot.try_admit(), Admission::Full);
/// assert_eq!(lot.snapshot().occupied, 2);
/// ```
#[derive(Debug)]
pub struct LotState {
    counters: Mutex<Counters>,
}

impl LotState {
    /// Empty lot with `capacity` spaces.
    pub fn new(capacity: u32) -> Self {
        Self {
            counters: Mutex::new(Counters {
                occupied: 0,
                capacity,
                vehicle_present: false,
            }),
        }
    }

    /// Lot that already holds `occupied` vehicles, e.g. after a restart.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOccupancy`] if `occupied > capacity`.
    pub fn with_occupied(capacity: u32, occupied: u32) -> Result<Self> {
        if occupied > capacity {
            return Err(Error::InvalidOccupancy { occupied, capacity });
        }

        let lot = Self::new(capacity);
        lot.lock().occupied = occupied;
        Ok(lot)
    }

    // Counters stay consistent even if a holder panicked: every update is
    // a single assignment.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> LotSnapshot {
        let counters = self.lock();
        LotSnapshot {
            occupied: counters.occupied,
            capacity: counters.capacity,
            vehicle_present: counters.vehicle_present,
        }
    }

    pub fn is_full(&self) -> bool {
        self.snapshot().is_full()
    }

    /// Take a space if one is free.
    pub fn try_admit(&self) -> Admission {
        let mut counters = self.lock();
        if counters.occupied >= counters.capacity {
            return Admission::Full;
        }

        counters.occupied += 1;
        Admission::Admitted {
            occupied: counters.occupied,
            now_full: counters.occupied == counters.capacity,
        }
    }

    /// Free a space after a logged exit.
    ///
    /// # Errors
    ///
    /// [`Error::LotEmpty`] if no space is taken.
    pub fn release(&self) -> Result<Release> {
        let mut counters = self.lock();
        if counters.occupied == 0 {
            return Err(Error::LotEmpty);
        }

        let was_full = counters.occupied >= counters.capacity;
        counters.occupied -= 1;
        Ok(Release {
            occupied: counters.occupied,
            was_full,
        })
    }

    /// Record the latest presence reading; returns `true` if it changed.
    pub fn update_presence(&self, present: bool) -> bool {
        let mut counters = self.lock();
        let changed = counters.vehicle_present != present;
        counters.vehicle_present = present;
        changed
    }
}
