//! Scripted plate capture for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{HardwareError, Result, traits::PlateCapture};

#[derive(Debug, Clone)]
enum Scripted {
    Plate(Option<String>),
    Failure(String),
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Scripted>,
    fallback: Option<String>,
    calls: usize,
    delay: Option<Duration>,
}

/// Plate capture whose answers are set by the test.
///
/// Queued answers are used first, in order; afterwards every call returns
/// the fallback plate (none by default). Clones share state, so a test can
/// keep one clone as a spy after moving another into the controller.
///
/// # Examples
///
/// ```
/// use parkgate_hardware::mock::MockCapture;
/// use parkgate_hardware::traits::PlateCapture;
///
/// #[tokio::main]
/// async fn main() -> parkgate_hardware::Result<()> {
///     let capture = MockCapture::returning("ABC123");
///     let spy = capture.clone();
///
///     assert_eq!(capture.capture_plate().await?.as_deref(), Some("ABC123"));
///     assert_eq!(spy.calls(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCapture {
    state: Arc<Mutex<State>>,
}

impl MockCapture {
    /// A capture that never finds a plate.
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture that always returns `plate`.
    pub fn returning(plate: impl Into<String>) -> Self {
        let capture = Self::new();
        capture.lock().fallback = Some(plate.into());
        capture
    }

    /// Queue a single answer.
    pub fn push_plate(&self, plate: Option<&str>) {
        self.lock()
            .script
            .push_back(Scripted::Plate(plate.map(str::to_string)));
    }

    /// Queue a single failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock()
            .script
            .push_back(Scripted::Failure(message.into()));
    }

    /// Delay every answer, to widen race windows in concurrency tests.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Number of times `capture_plate` was called.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlateCapture for MockCapture {
    async fn capture_plate(&self) -> Result<Option<String>> {
        let (answer, delay) = {
            let mut state = self.lock();
            state.calls += 1;
            let answer = state
                .script
                .pop_front()
                .unwrap_or_else(|| Scripted::Plate(state.fallback.clone()));
            (answer, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match answer {
            Scripted::Plate(plate) => Ok(plate),
            Scripted::Failure(message) => Err(HardwareError::capture(message)),
        }
    }
}
