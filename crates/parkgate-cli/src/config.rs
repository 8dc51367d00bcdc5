//! `parkgate.toml` configuration.
//!
//! Every field has a default, so a missing file or a missing section runs
//! the controller with the defaults below:
//!
//! ```toml
//! [serial]
//! port = "/dev/serial0"
//! baud_rate = 115200
//! read_timeout_ms = 100
//!
//! [link]
//! ack_timeout_ms = 1000
//! stale_frame_ms = 500        # 0 keeps partial frames forever
//! reconnect_initial_ms = 500
//! reconnect_max_ms = 10000
//! startup_attempts = 5        # 0 retries forever
//!
//! [lot]
//! capacity = 100
//! initial_occupied = 0
//! status_interval_secs = 0    # 0 announces only on connect
//!
//! [gate]
//! open_angle = 90
//!
//! [database]
//! path = "car_park.db"
//!
//! [capture]
//! command = "lpr-capture"
//! args = []
//! timeout_ms = 10000
//!
//! [logging]
//! filter = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use parkgate_controller::ServiceConfig;
use parkgate_core::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_CAPACITY, DEFAULT_STALE_FRAME_MS, MAX_SERVO_ANGLE,
    SERVO_OPEN_ANGLE,
};
use parkgate_hardware::SerialConfig;
use parkgate_hardware::capture::CommandCapture;
use parkgate_link::{LinkConfig, ReconnectPolicy};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "parkgate.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub link: LinkSettings,
    pub lot: LotSettings,
    pub gate: GateSettings,
    pub database: DatabaseSettings,
    pub capture: CaptureSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub ack_timeout_ms: u64,
    pub stale_frame_ms: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub startup_attempts: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        let reconnect = ReconnectPolicy::default();
        Self {
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            stale_frame_ms: DEFAULT_STALE_FRAME_MS,
            reconnect_initial_ms: reconnect.initial.as_millis() as u64,
            reconnect_max_ms: reconnect.max.as_millis() as u64,
            startup_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotSettings {
    pub capacity: u32,
    /// Spaces already taken when the controller starts.
    pub initial_occupied: u32,
    pub status_interval_secs: u64,
}

impl Default for LotSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            initial_occupied: 0,
            status_interval_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub open_angle: u8,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            open_angle: SERVO_OPEN_ANGLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file shared with the registration admin app.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "car_park.db".to_string(),
        }
    }
}

/// External plate recogniser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            command: "lpr-capture".to_string(),
            args: Vec::new(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] if none is given.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serial
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.lot.initial_occupied > self.lot.capacity {
            return Err(ConfigError::Invalid(format!(
                "initial_occupied {} exceeds capacity {}",
                self.lot.initial_occupied, self.lot.capacity
            )));
        }
        if self.gate.open_angle > MAX_SERVO_ANGLE {
            return Err(ConfigError::Invalid(format!(
                "open_angle {} exceeds {MAX_SERVO_ANGLE}",
                self.gate.open_angle
            )));
        }
        if self.link.ack_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ack_timeout_ms must be non-zero".into()));
        }
        if self.link.reconnect_initial_ms > self.link.reconnect_max_ms {
            return Err(ConfigError::Invalid(
                "reconnect_initial_ms exceeds reconnect_max_ms".into(),
            ));
        }
        if self.capture.command.trim().is_empty() {
            return Err(ConfigError::Invalid("capture command is empty".into()));
        }
        Ok(())
    }

    pub fn service_config(&self) -> ServiceConfig {
        let link = &self.link;
        ServiceConfig {
            link: LinkConfig {
                ack_timeout: Duration::from_millis(link.ack_timeout_ms),
                stale_after: (link.stale_frame_ms > 0)
                    .then(|| Duration::from_millis(link.stale_frame_ms)),
                reconnect: ReconnectPolicy {
                    initial: Duration::from_millis(link.reconnect_initial_ms),
                    max: Duration::from_millis(link.reconnect_max_ms),
                    ..ReconnectPolicy::default()
                },
                max_startup_attempts: (link.startup_attempts > 0).then_some(link.startup_attempts),
                ..LinkConfig::default()
            },
            status_interval: (self.lot.status_interval_secs > 0)
                .then(|| Duration::from_secs(self.lot.status_interval_secs)),
            open_angle: self.gate.open_angle,
        }
    }

    pub fn capture(&self) -> CommandCapture {
        CommandCapture::new(&self.capture.command)
            .with_args(self.capture.args.iter().cloned())
            .with_timeout(Duration::from_millis(self.capture.timeout_ms))
    }
}
