//! Serial channel to the gate firmware.
//!
//! [`SerialConfig`] holds the line settings (8N1 at a configurable baud
//! rate). [`SerialConnector`] opens the port and bridges the blocking
//! `serialport` handle onto an in-memory Tokio duplex pipe, so the rest
//! of the stack only sees `AsyncRead + AsyncWrite`.
//!
//! # Bridge
//!
//! ```text
//!  serial-rx thread:  port.read()  ──> duplex ──> link reader task
//!  serial-tx thread:  port.write() <── duplex <── link writer
//! ```
//!
//! Both threads stop once either side goes away: the tx thread sees EOF
//! when the async end is dropped, the rx thread notices the shared
//! `closed` flag at its next read timeout. The port handle is released
//! when both threads have exited, so a reconnect can reopen it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use parkgate_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SERIAL_PORT};

/// Serial line settings.
///
/// The firmware always uses 8 data bits, no parity and 1 stop bit; only
/// the device path, baud rate and read timeout vary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/serial0` or `COM3`.
    pub port: String,

    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Read timeout in milliseconds.
    ///
    /// Bounds how long the reader thread blocks before it re-checks for
    /// shutdown.
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Check the settings before touching the device.
    pub fn validate(&self) -> crate::Result<()> {
        if self.port.trim().is_empty() {
            return Err(crate::HardwareError::configuration("serial port path is empty"));
        }
        if self.baud_rate == 0 {
            return Err(crate::HardwareError::configuration("baud rate must be non-zero"));
        }
        if self.read_timeout_ms == 0 {
            return Err(crate::HardwareError::configuration(
                "read timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

#[cfg(feature = "serial")]
pub use native::SerialConnector;

#[cfg(feature = "serial")]
mod native {
    use std::io::{self, Read, Write};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::runtime::Handle;
    use tracing::{debug, info, trace, warn};

    use super::SerialConfig;
    use crate::error::{HardwareError, Result};
    use crate::traits::Connector;

    /// Capacity of the in-memory pipe between the port and the link.
    const BRIDGE_BUFFER: usize = 1024;

    /// Chunk size for a single port read or write.
    const IO_CHUNK: usize = 256;

    /// Opens the configured serial port.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use parkgate_hardware::serial::{SerialConfig, SerialConnector};
    /// use parkgate_hardware::traits::Connector;
    ///
    /// # async fn example() -> parkgate_hardware::Result<()> {
    /// let connector = SerialConnector::new(SerialConfig::new("/dev/ttyUSB0"))?;
    /// let io = connector.connect().await?;
    /// # drop(io);
    /// # Ok(())
    /// # }
    /// ```
    #[derive(Debug, Clone)]
    pub struct SerialConnector {
        config: SerialConfig,
    }

    impl SerialConnector {
        /// Create a connector after validating `config`.
        pub fn new(config: SerialConfig) -> Result<Self> {
            config.validate()?;
            Ok(Self { config })
        }

        pub fn config(&self) -> &SerialConfig {
            &self.config
        }
    }

    impl Connector for SerialConnector {
        type Io = DuplexStream;

        fn describe(&self) -> String {
            format!("{}@{}", self.config.port, self.config.baud_rate)
        }

        async fn connect(&self) -> Result<DuplexStream> {
            let config = self.config.clone();
            let port = tokio::task::spawn_blocking(move || open_port(&config))
                .await
                .map_err(|e| HardwareError::Bridge(format!("serial open task failed: {e}")))??;

            info!(port = %self.config.port, baud = self.config.baud_rate, "Serial port opened");
            bridge(port, Handle::current(), self.config.port.clone())
        }
    }

    fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open()?;

        // Bytes queued while nobody was listening belong to a dead session
        if let Err(e) = port.clear(serialport::ClearBuffer::Input) {
            warn!(error = %e, "Failed to clear serial input buffer");
        }
        Ok(port)
    }

    /// Connect `port` to a fresh duplex pipe served by two blocking threads.
    fn bridge(port: Box<dyn SerialPort>, handle: Handle, name: String) -> Result<DuplexStream> {
        let reader = port.try_clone()?;
        let (ours, theirs) = tokio::io::duplex(BRIDGE_BUFFER);
        let (pipe_rx, pipe_tx) = tokio::io::split(theirs);
        let closed = Arc::new(AtomicBool::new(false));

        {
            let closed = Arc::clone(&closed);
            let handle = handle.clone();
            let name = name.clone();
            thread::Builder::new()
                .name("serial-rx".to_string())
                .spawn(move || rx_loop(reader, pipe_tx, handle, closed, name))?;
        }

        thread::Builder::new()
            .name("serial-tx".to_string())
            .spawn(move || tx_loop(port, pipe_rx, handle, closed, name))?;

        Ok(ours)
    }

    fn rx_loop(
        mut port: Box<dyn SerialPort>,
        mut pipe: WriteHalf<DuplexStream>,
        handle: Handle,
        closed: Arc<AtomicBool>,
        name: String,
    ) {
        let mut buf = [0u8; IO_CHUNK];

        while !closed.load(Ordering::Acquire) {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    trace!(bytes = ?&buf[..n], "serial rx");
                    if handle.block_on(pipe.write_all(&buf[..n])).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(port = %name, error = %e, "Serial read failed");
                    break;
                }
            }
        }

        closed.store(true, Ordering::Release);
        let _ = handle.block_on(pipe.shutdown());
        debug!(port = %name, "Serial reader stopped");
    }

    fn tx_loop(
        mut port: Box<dyn SerialPort>,
        mut pipe: ReadHalf<DuplexStream>,
        handle: Handle,
        closed: Arc<AtomicBool>,
        name: String,
    ) {
        let mut buf = [0u8; IO_CHUNK];

        loop {
            let n = match handle.block_on(pipe.read(&mut buf)) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if closed.load(Ordering::Acquire) {
                break;
            }

            trace!(bytes = ?&buf[..n], "serial tx");
            if let Err(e) = port.write_all(&buf[..n]).and_then(|()| port.flush()) {
                warn!(port = %name, error = %e, "Serial write failed");
                break;
            }
        }

        closed.store(true, Ordering::Release);
        debug!(port = %name, "Serial writer stopped");
    }
}
