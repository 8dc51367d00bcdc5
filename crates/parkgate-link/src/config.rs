use std::time::Duration;

use parkgate_core::constants::{DEFAULT_ACK_TIMEOUT_MS, DEFAULT_STALE_FRAME_MS};

use crate::backoff::ReconnectPolicy;

/// Link behaviour settings.
///
/// # Example
///
/// ```
/// use parkgate_link::LinkConfig;
/// use std::time::Duration;
///
/// let config = LinkConfig {
///     ack_timeout: Duration::from_millis(500),
///     ..LinkConfig::default()
/// };
/// assert_eq!(config.frame_buffer, 16);
/// ```
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bounded wait for `OK`/`ERR` after each outbound frame
    pub ack_timeout: Duration,

    /// Drop a partial inbound frame after this much silence
    pub stale_after: Option<Duration>,

    /// Verified frames queued for the dispatcher before new ones are dropped
    pub frame_buffer: usize,

    /// Delays between reconnection attempts
    pub reconnect: ReconnectPolicy,

    /// Give up if the channel never opened within this many attempts
    ///
    /// `None` retries forever. Once the channel has been open, losing it
    /// is always retried.
    pub max_startup_attempts: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
            stale_after: Some(Duration::from_millis(DEFAULT_STALE_FRAME_MS)),
            frame_buffer: 16,
            reconnect: ReconnectPolicy::default(),
            max_startup_attempts: Some(5),
        }
    }
}
