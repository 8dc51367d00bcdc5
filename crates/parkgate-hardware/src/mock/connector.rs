//! In-memory stand-in for the serial port.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::{HardwareError, Result, traits::Connector};

const PIPE_BUFFER: usize = 1024;

#[derive(Debug)]
struct Shared {
    peers: mpsc::UnboundedSender<DuplexStream>,
    pending_failures: AtomicUsize,
    attempts: AtomicUsize,
}

/// Connector handing out in-memory pipes.
///
/// Every successful `connect` creates a duplex pipe; one end goes to the
/// caller and the other is delivered to the [`MockConnectorHandle`], where
/// the test plays the gate firmware.
///
/// # Examples
///
/// ```
/// use parkgate_hardware::mock::MockConnector;
/// use parkgate_hardware::traits::Connector;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// #[tokio::main]
/// async fn main() -> parkgate_hardware::Result<()> {
///     let (connector, mut handle) = MockConnector::new();
///
///     handle.fail_next(1);
///     assert!(connector.connect().await.is_err());
///
///     let mut link = connector.connect().await?;
///     let mut firmware = handle.next_peer().await.unwrap();
///
///     firmware.write_all(b"OK\n").await?;
///     let mut buf = [0u8; 3];
///     link.read_exact(&mut buf).await?;
///     assert_eq!(&buf, b"OK\n");
///     assert_eq!(handle.attempts(), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    /// Create a connector and the handle that receives the far ends.
    pub fn new() -> (Self, MockConnectorHandle) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            peers,
            pending_failures: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        });

        let handle = MockConnectorHandle {
            peer_rx,
            shared: Arc::clone(&shared),
        };

        (Self { shared }, handle)
    }
}

impl Connector for MockConnector {
    type Io = DuplexStream;

    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn connect(&self) -> Result<DuplexStream> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .shared
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HardwareError::disconnected("mock"));
        }

        let (near, far) = tokio::io::duplex(PIPE_BUFFER);
        self.shared
            .peers
            .send(far)
            .map_err(|_| HardwareError::disconnected("mock handle dropped"))?;
        Ok(near)
    }
}

/// Test side of a [`MockConnector`].
#[derive(Debug)]
pub struct MockConnectorHandle {
    peer_rx: mpsc::UnboundedReceiver<DuplexStream>,
    shared: Arc<Shared>,
}

impl MockConnectorHandle {
    /// Make the next `count` connection attempts fail.
    pub fn fail_next(&self, count: usize) {
        self.shared.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Total connection attempts so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the far end of the next successful connection.
    pub async fn next_peer(&mut self) -> Option<DuplexStream> {
        self.peer_rx.recv().await
    }
}
