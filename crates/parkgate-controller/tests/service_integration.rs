//! End-to-end tests: gate service against a scripted firmware peer.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Firmware, PLATE, link_config};
use parkgate_controller::mock::{MemoryMovementLog, MemoryRegistry};
use parkgate_controller::{GateHandle, GateService, LotState, ServiceConfig};
use parkgate_core::{Error, MovementAction};
use parkgate_hardware::mock::{MockCapture, MockConnector, MockConnectorHandle};
use parkgate_protocol::{GateEvent, Reply};
use parkgate_storage::{
    Database, MovementLogRepository, PlateRepository, SqliteMovementLogRepository,
    SqlitePlateRepository,
};

const SILENCE: Duration = Duration::from_millis(200);

struct Running {
    handle: GateHandle<MockCapture, MemoryRegistry, MemoryMovementLog>,
    connector: MockConnectorHandle,
    capture: MockCapture,
    log: MemoryMovementLog,
}

fn config() -> ServiceConfig {
    ServiceConfig {
        link: link_config(),
        ..ServiceConfig::default()
    }
}

fn start(capacity: u32, occupied: u32, config: ServiceConfig) -> Running {
    let (connector, connector_handle) = MockConnector::new();
    let capture = MockCapture::returning(PLATE);
    let log = MemoryMovementLog::new();

    let handle = GateService::new(connector, config).start(
        Arc::new(LotState::with_occupied(capacity, occupied).unwrap()),
        capture.clone(),
        MemoryRegistry::with_plates([PLATE]),
        log.clone(),
    );

    Running {
        handle,
        connector: connector_handle,
        capture,
        log,
    }
}

#[tokio::test]
async fn test_registered_vehicle_end_to_end() {
    let mut running = start(10, 0, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(false));

    assert_eq!(firmware.send(GateEvent::CarDetect(true)).await, Reply::Ack);
    assert_eq!(
        firmware.expect_commands(3).await,
        vec![
            GateEvent::LpStatus(true),
            GateEvent::Servo(90),
            GateEvent::display("Welcome"),
        ]
    );

    let lot = Arc::clone(running.handle.lot());
    running.handle.shutdown().await.unwrap();

    assert_eq!(lot.snapshot().occupied, 1);
    assert_eq!(
        running.log.records(),
        vec![(PLATE.to_string(), MovementAction::Entry)]
    );
}

#[tokio::test]
async fn test_unregistered_vehicle_end_to_end() {
    let mut running = start(10, 0, config());
    running.capture.push_plate(Some("99Z99999"));
    let mut firmware = Firmware::attach(&mut running.connector).await;
    firmware.expect_command().await;

    firmware.send(GateEvent::CarDetect(true)).await;
    assert_eq!(
        firmware.expect_commands(2).await,
        vec![GateEvent::LpStatus(false), GateEvent::display("Invalid Plate")]
    );
    firmware.expect_silence(SILENCE).await;

    assert_eq!(running.handle.lot().snapshot().occupied, 0);
    running.handle.shutdown().await.unwrap();
    assert!(running.log.records().is_empty());
}

#[tokio::test]
async fn test_full_lot_end_to_end() {
    let mut running = start(3, 3, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(true));

    firmware.send(GateEvent::CarDetect(true)).await;
    assert_eq!(
        firmware.expect_commands(2).await,
        vec![GateEvent::ParkFull(true), GateEvent::display("Lot Full")]
    );

    assert_eq!(running.capture.calls(), 0);
    running.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_departure_from_full_lot_clears_indicator() {
    let mut running = start(1, 1, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(true));

    let (departed, command) = tokio::join!(
        running.handle.record_departure(PLATE),
        firmware.expect_command()
    );
    assert_eq!(departed.unwrap(), 0);
    assert_eq!(command, GateEvent::ParkFull(false));

    // The freed space goes to the next vehicle
    firmware.send(GateEvent::CarDetect(true)).await;
    assert_eq!(
        firmware.expect_commands(4).await,
        vec![
            GateEvent::ParkFull(true),
            GateEvent::LpStatus(true),
            GateEvent::Servo(90),
            GateEvent::display("Welcome"),
        ]
    );

    let (departed, command) = tokio::join!(
        running.handle.record_departure(PLATE),
        firmware.expect_command()
    );
    assert_eq!(departed.unwrap(), 0);
    assert_eq!(command, GateEvent::ParkFull(false));
    assert_eq!(running.handle.lot().snapshot().occupied, 0);

    running.handle.shutdown().await.unwrap();
    assert_eq!(
        running.log.records(),
        vec![
            (PLATE.to_string(), MovementAction::Exit),
            (PLATE.to_string(), MovementAction::Entry),
            (PLATE.to_string(), MovementAction::Exit),
        ]
    );
}

#[tokio::test]
async fn test_departure_from_empty_lot_is_rejected() {
    let mut running = start(4, 0, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    firmware.expect_command().await;

    assert!(matches!(
        running.handle.record_departure(PLATE).await,
        Err(Error::LotEmpty)
    ));
    firmware.expect_silence(SILENCE).await;

    running.handle.shutdown().await.unwrap();
    assert!(running.log.records().is_empty());
}

#[tokio::test]
async fn test_repeated_car_detect_is_acknowledged_only() {
    let mut running = start(10, 0, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    firmware.expect_command().await;

    firmware.send(GateEvent::CarDetect(true)).await;
    firmware.expect_commands(3).await;

    assert_eq!(firmware.send(GateEvent::CarDetect(true)).await, Reply::Ack);
    firmware.expect_silence(SILENCE).await;

    assert_eq!(running.capture.calls(), 1);
    assert_eq!(running.handle.lot().snapshot().occupied, 1);
    running.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_and_unhandled_frames() {
    let mut running = start(10, 0, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    firmware.expect_command().await;

    // CAR_DETECT(1) with a wrong checksum
    firmware.send_raw(&[0xAA, 0x02, 0x03, 0x01, 0x00]).await;
    assert_eq!(firmware.reply().await, Reply::Nack);

    assert_eq!(firmware.send(GateEvent::Servo(10)).await, Reply::Ack);
    firmware.expect_silence(SILENCE).await;
    assert_eq!(running.capture.calls(), 0);

    firmware.send(GateEvent::CarDetect(true)).await;
    assert_eq!(firmware.expect_commands(3).await.len(), 3);
    running.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_capacity_announced_after_reconnect() {
    let mut running = start(1, 1, config());

    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(true));
    drop(firmware);

    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(true));
    assert_eq!(running.connector.attempts(), 2);

    running.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_periodic_capacity_announcement() {
    let mut running = start(
        10,
        2,
        ServiceConfig {
            status_interval: Some(Duration::from_millis(150)),
            ..config()
        },
    );

    let mut firmware = Firmware::attach(&mut running.connector).await;
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(false));
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(false));
    assert_eq!(firmware.expect_command().await, GateEvent::ParkFull(false));

    running.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_service_ends_when_link_never_opens() {
    let (connector, connector_handle) = MockConnector::new();
    connector_handle.fail_next(10);

    let mut handle = GateService::new(connector, config()).start(
        Arc::new(LotState::new(10)),
        MockCapture::new(),
        MemoryRegistry::new(),
        MemoryMovementLog::new(),
    );

    let closed = tokio::time::timeout(Duration::from_secs(5), handle.closed())
        .await
        .expect("service did not give up");
    assert!(matches!(closed, Some(Err(Error::LinkUnavailable))));
    assert_eq!(connector_handle.attempts(), 3);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_link() {
    let mut running = start(10, 0, config());
    let mut firmware = Firmware::attach(&mut running.connector).await;
    firmware.expect_command().await;

    let session = running.handle.session().clone();
    assert!(session.is_connected());

    running.handle.shutdown().await.unwrap();
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_sqlite_collaborators_end_to_end() {
    let db = Database::in_memory().await.unwrap();
    let plates = SqlitePlateRepository::new(db.pool().clone());
    let movements = SqliteMovementLogRepository::new(db.pool().clone());
    plates.register(PLATE).await.unwrap();

    let (connector, mut connector_handle) = MockConnector::new();
    let handle = GateService::new(connector, config()).start(
        Arc::new(LotState::new(10)),
        MockCapture::returning(PLATE),
        plates,
        movements.clone(),
    );

    let mut firmware = Firmware::attach(&mut connector_handle).await;
    firmware.expect_command().await;
    firmware.send(GateEvent::CarDetect(true)).await;
    assert_eq!(
        firmware.expect_commands(3).await[0],
        GateEvent::LpStatus(true)
    );

    handle.shutdown().await.unwrap();

    let records = movements.find_by_plate(PLATE, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_entry());
}
