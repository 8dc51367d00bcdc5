//! Common test utilities for controller integration tests.
//!
//! [`Firmware`] plays the barrier controller on the far end of a
//! `MockConnector` pipe: it sends sensor events and acknowledges every
//! command the gate service issues.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parkgate_controller::mock::{MemoryMovementLog, MemoryRegistry, RecordingCommands};
use parkgate_controller::{ArrivalController, LotState};
use parkgate_hardware::mock::{MockCapture, MockConnectorHandle};
use parkgate_link::{LinkConfig, ReconnectPolicy};
use parkgate_protocol::{GateCodec, GateEvent, Inbound, Reply};
use tokio::io::DuplexStream;
use tokio_util::codec::Framed;

pub const PLATE: &str = "30A12345";

pub type MockController =
    ArrivalController<MockCapture, MemoryRegistry, MemoryMovementLog, RecordingCommands>;

/// Controller with in-memory collaborators and spies on each of them.
pub struct Rig {
    pub controller: Arc<MockController>,
    pub capture: MockCapture,
    pub registry: MemoryRegistry,
    pub log: MemoryMovementLog,
    pub commands: RecordingCommands,
}

impl Rig {
    pub fn new(capacity: u32, occupied: u32) -> Self {
        let capture = MockCapture::returning(PLATE);
        let registry = MemoryRegistry::with_plates([PLATE]);
        let log = MemoryMovementLog::new();
        let commands = RecordingCommands::new();

        let controller = Arc::new(ArrivalController::new(
            Arc::new(LotState::with_occupied(capacity, occupied).unwrap()),
            capture.clone(),
            registry.clone(),
            log.clone(),
            commands.clone(),
        ));

        Self {
            controller,
            capture,
            registry,
            log,
            commands,
        }
    }

    pub fn occupied(&self) -> u32 {
        self.controller.lot().snapshot().occupied
    }
}

/// Link settings with short delays for tests.
pub fn link_config() -> LinkConfig {
    LinkConfig {
        ack_timeout: Duration::from_millis(500),
        frame_buffer: 4,
        reconnect: ReconnectPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(400),
            multiplier: 2,
        },
        max_startup_attempts: Some(3),
        ..LinkConfig::default()
    }
}

/// Scripted gate firmware.
pub struct Firmware {
    device: Framed<DuplexStream, GateCodec>,
}

impl Firmware {
    /// Wait for the service to open the channel.
    pub async fn attach(handle: &mut MockConnectorHandle) -> Self {
        let peer = handle.next_peer().await.expect("connector dropped");
        Self {
            device: Framed::new(peer, GateCodec::new()),
        }
    }

    /// Send a sensor event and return the controller's acknowledgement.
    pub async fn send(&mut self, event: GateEvent) -> Reply {
        self.device.send(&event.to_frame().unwrap()).await.unwrap();
        self.reply().await
    }

    /// Send raw bytes as if they came off the wire.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;
        self.device.get_mut().write_all(bytes).await.unwrap();
    }

    pub async fn reply(&mut self) -> Reply {
        match self.device.next().await {
            Some(Ok(Inbound::Reply(reply))) => reply,
            other => panic!("expected acknowledgement, got {other:?}"),
        }
    }

    /// Read the next command and acknowledge it.
    pub async fn expect_command(&mut self) -> GateEvent {
        let frame = match self.device.next().await {
            Some(Ok(Inbound::Frame(frame))) => frame,
            other => panic!("expected command frame, got {other:?}"),
        };
        self.device.send(Reply::Ack).await.unwrap();
        GateEvent::try_from(&frame).unwrap()
    }

    pub async fn expect_commands(&mut self, count: usize) -> Vec<GateEvent> {
        let mut commands = Vec::with_capacity(count);
        for _ in 0..count {
            commands.push(self.expect_command().await);
        }
        commands
    }

    /// Assert that nothing arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(item) = tokio::time::timeout(wait, self.device.next()).await {
            panic!("expected silence, got {item:?}");
        }
    }
}
