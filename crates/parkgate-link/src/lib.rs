//! Serial link layer for the parking gate controller
//!
//! This crate turns the raw serial channel into a request/acknowledgement
//! link. It handles channel (re)opening, the receive loop that answers
//! and forwards inbound frames, and the bounded wait for `OK`/`ERR` after
//! each outbound frame.
//!
//! # Components
//!
//! - **LinkSession**: shared handle used to send commands and answer frames
//! - **Supervisor**: owns the connector, runs the receive loop, reconnects
//!   with exponential backoff
//!
//! # Example
//!
//! ```no_run
//! use parkgate_hardware::Connector;
//! use parkgate_link::{LinkConfig, LinkSession, Supervisor};
//! use parkgate_protocol::GateEvent;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(connector: impl Connector) -> Result<(), Box<dyn std::error::Error>> {
//! let config = LinkConfig::default();
//! let session = LinkSession::new(config.ack_timeout);
//! let (frames_tx, mut frames_rx) = mpsc::channel(config.frame_buffer);
//!
//! let supervisor = Supervisor::new(connector, session.clone(), frames_tx, config);
//! let cancel = CancellationToken::new();
//! tokio::spawn(supervisor.run(cancel.clone()));
//!
//! session.connected().await;
//! session.send(GateEvent::ParkFull(false)).await?;
//!
//! while let Some(frame) = frames_rx.recv().await {
//!     println!("firmware says {frame}");
//! }
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod session;
mod state;
mod supervisor;

pub use backoff::{Backoff, ReconnectPolicy};
pub use config::LinkConfig;
pub use session::{LinkSession, LinkWriter};
pub use state::LinkState;
pub use supervisor::Supervisor;
