//! Arrival workflow scenarios against in-memory collaborators.

mod common;

use std::time::Duration;

use common::{PLATE, Rig};
use futures::future::join_all;
use parkgate_controller::{ArrivalOutcome, PresenceChange};
use parkgate_core::{Error, MovementAction};
use parkgate_protocol::GateEvent;
use rstest::rstest;

#[tokio::test]
async fn test_registered_vehicle_is_admitted() {
    let rig = Rig::new(10, 3);

    let outcome = rig.controller.on_presence(true).await;

    assert_eq!(
        outcome,
        PresenceChange::Arrived(ArrivalOutcome::Admitted {
            plate: PLATE.into(),
            occupied: 4
        })
    );
    assert_eq!(
        rig.commands.sent(),
        vec![
            GateEvent::LpStatus(true),
            GateEvent::Servo(90),
            GateEvent::display("Welcome"),
        ]
    );
    assert_eq!(rig.occupied(), 4);
    assert_eq!(
        rig.log.records(),
        vec![(PLATE.to_string(), MovementAction::Entry)]
    );
}

#[tokio::test]
async fn test_unregistered_vehicle_is_refused() {
    let rig = Rig::new(10, 3);
    rig.capture.push_plate(Some("99Z99999"));

    let outcome = rig.controller.on_presence(true).await;

    assert_eq!(
        outcome,
        PresenceChange::Arrived(ArrivalOutcome::Denied {
            plate: "99Z99999".into()
        })
    );
    assert_eq!(
        rig.commands.sent(),
        vec![GateEvent::LpStatus(false), GateEvent::display("Invalid Plate")]
    );
    assert_eq!(rig.occupied(), 3);
    assert!(rig.log.records().is_empty());
}

#[tokio::test]
async fn test_full_lot_turns_vehicle_away_without_capture() {
    let rig = Rig::new(5, 5);

    let outcome = rig.controller.on_presence(true).await;

    assert_eq!(outcome, PresenceChange::Arrived(ArrivalOutcome::LotFull));
    assert_eq!(
        rig.commands.sent(),
        vec![GateEvent::ParkFull(true), GateEvent::display("Lot Full")]
    );
    assert_eq!(rig.capture.calls(), 0);
    assert_eq!(rig.registry.lookups(), 0);
    assert_eq!(rig.occupied(), 5);
}

#[tokio::test]
async fn test_no_plate_found() {
    let rig = Rig::new(5, 0);
    rig.capture.push_plate(None);

    assert_eq!(
        rig.controller.on_presence(true).await,
        PresenceChange::Arrived(ArrivalOutcome::NoPlate)
    );
    assert_eq!(rig.commands.sent(), vec![GateEvent::display("No Plate Found")]);
    assert_eq!(rig.registry.lookups(), 0);
}

#[tokio::test]
async fn test_repeated_presence_runs_one_arrival() {
    let rig = Rig::new(10, 0);

    assert!(matches!(
        rig.controller.on_presence(true).await,
        PresenceChange::Arrived(_)
    ));
    let sent = rig.commands.take();
    assert_eq!(sent.len(), 3);

    assert_eq!(
        rig.controller.on_presence(true).await,
        PresenceChange::Unchanged
    );
    assert!(rig.commands.take().is_empty());
    assert_eq!(rig.capture.calls(), 1);
    assert_eq!(rig.occupied(), 1);
}

#[tokio::test]
async fn test_next_vehicle_after_sensor_clears() {
    let rig = Rig::new(10, 0);

    rig.controller.on_presence(true).await;
    rig.controller.on_presence(false).await;
    rig.controller.on_presence(true).await;

    assert_eq!(rig.capture.calls(), 2);
    assert_eq!(rig.occupied(), 2);
}

#[rstest]
#[case::one_space_left(3, 2, 1)]
#[case::several_spaces(10, 4, 6)]
#[case::empty_lot(4, 0, 4)]
#[tokio::test]
async fn test_concurrent_arrivals_never_overshoot(
    #[case] capacity: u32,
    #[case] occupied: u32,
    #[case] free: usize,
) {
    let rig = Rig::new(capacity, occupied);
    rig.capture.set_delay(Duration::from_millis(5));

    let arrivals = (0..capacity as usize + 4).map(|_| rig.controller.on_vehicle_detected());
    let outcomes = join_all(arrivals).await;

    let admitted = outcomes
        .iter()
        .filter(|o| matches!(o, ArrivalOutcome::Admitted { .. }))
        .count();
    let turned_away = outcomes
        .iter()
        .filter(|o| **o == ArrivalOutcome::LotFull)
        .count();

    assert_eq!(admitted, free);
    assert_eq!(admitted + turned_away, outcomes.len());
    assert_eq!(rig.occupied(), capacity);
    assert_eq!(rig.log.records().len(), free);
}

#[tokio::test]
async fn test_departure_frees_space_and_clears_full() {
    let rig = Rig::new(2, 1);

    rig.controller.on_vehicle_detected().await;
    assert!(rig.commands.take().contains(&GateEvent::ParkFull(true)));

    assert_eq!(rig.controller.on_vehicle_detected().await, ArrivalOutcome::LotFull);
    rig.commands.take();

    assert_eq!(rig.controller.record_departure(PLATE).await.unwrap(), 1);
    assert_eq!(rig.commands.take(), vec![GateEvent::ParkFull(false)]);

    assert!(matches!(
        rig.controller.on_vehicle_detected().await,
        ArrivalOutcome::Admitted { occupied: 2, .. }
    ));

    let actions: Vec<_> = rig.log.records().into_iter().map(|(_, a)| a).collect();
    assert_eq!(
        actions,
        vec![
            MovementAction::Entry,
            MovementAction::Exit,
            MovementAction::Entry
        ]
    );
}

#[tokio::test]
async fn test_departure_from_empty_lot() {
    let rig = Rig::new(2, 0);
    assert!(matches!(
        rig.controller.record_departure(PLATE).await,
        Err(Error::LotEmpty)
    ));
    assert!(rig.log.records().is_empty());
}

#[tokio::test]
async fn test_collaborator_failures_degrade() {
    let rig = Rig::new(10, 0);
    rig.registry.set_failing(true);
    rig.log.set_failing(true);
    rig.commands.set_unconfirmed(true);

    assert_eq!(
        rig.controller.on_vehicle_detected().await,
        ArrivalOutcome::Denied {
            plate: PLATE.into()
        }
    );

    rig.registry.set_failing(false);
    assert!(matches!(
        rig.controller.on_vehicle_detected().await,
        ArrivalOutcome::Admitted { occupied: 1, .. }
    ));
    assert!(rig.log.records().is_empty());
    assert_eq!(rig.commands.sent().len(), 5);
}
