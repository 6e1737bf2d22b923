//! Wiring tests: dispatcher → store → bus → projection roundtrips.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use fleetwise_auth::{ChangeRole, CreateUser, Role, User, UserCommand};
use fleetwise_core::{AggregateId, UserId};
use fleetwise_events::{EventBus, EventEnvelope, InMemoryEventBus};
use fleetwise_vehicles::{
    ChangeVehicleStatus, RegisterVehicle, Vehicle, VehicleCommand, VehicleId, VehicleStatus,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::InMemoryEventStore;
use crate::projections::{UserFilter, UsersProjection, VehicleFilter, VehiclesProjection};
use crate::read_model::InMemoryReadStore;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;

fn wiring() -> (Dispatcher, Bus) {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    (CommandDispatcher::new(store, bus.clone()), bus)
}

#[test]
fn user_lifecycle_flows_into_the_directory() {
    let (dispatcher, bus) = wiring();
    let subscription = bus.subscribe();

    let users = UsersProjection::new(Arc::new(InMemoryReadStore::new()));

    let user_id = UserId::new();
    let aggregate_id = AggregateId::from_uuid(*user_id.as_uuid());

    dispatcher
        .dispatch::<User>(
            aggregate_id,
            "auth.user",
            UserCommand::Create(CreateUser {
                user_id,
                email: "nadia@fleetwise.example".to_string(),
                display_name: "Nadia Benali".to_string(),
                role: Role::Driver,
                occurred_at: Utc::now(),
            }),
            |_| User::empty(user_id),
        )
        .unwrap();

    dispatcher
        .dispatch::<User>(
            aggregate_id,
            "auth.user",
            UserCommand::ChangeRole(ChangeRole {
                user_id,
                role: Role::Mechanic,
                actor_role: Role::Admin,
                occurred_at: Utc::now(),
            }),
            |_| User::empty(user_id),
        )
        .unwrap();

    while let Ok(envelope) = subscription.try_recv() {
        users.apply_envelope(&envelope).unwrap();
    }

    let model = users.get(&user_id).expect("user projected");
    assert_eq!(model.role, "mechanic");

    let mechanics = users.query(&UserFilter {
        role: Some(Role::Mechanic),
        ..Default::default()
    });
    assert_eq!(mechanics.len(), 1);
}

#[test]
fn stale_version_commands_are_rejected() {
    let (dispatcher, _bus) = wiring();

    let user_id = UserId::new();
    let aggregate_id = AggregateId::from_uuid(*user_id.as_uuid());

    // Creating twice replays the first Created event into the rehydrated
    // aggregate, so the second create is rejected by the aggregate itself.
    let create = |email: &str| {
        UserCommand::Create(CreateUser {
            user_id,
            email: email.to_string(),
            display_name: "Sam".to_string(),
            role: Role::Driver,
            occurred_at: Utc::now(),
        })
    };

    dispatcher
        .dispatch::<User>(aggregate_id, "auth.user", create("sam@fleetwise.example"), |_| {
            User::empty(user_id)
        })
        .unwrap();

    let err = dispatcher
        .dispatch::<User>(aggregate_id, "auth.user", create("sam2@fleetwise.example"), |_| {
            User::empty(user_id)
        })
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));
}

#[test]
fn vehicle_status_change_reaches_the_fleet_list() {
    let (dispatcher, bus) = wiring();
    let subscription = bus.subscribe();

    let vehicles = VehiclesProjection::new(Arc::new(InMemoryReadStore::new()));

    let aggregate_id = AggregateId::new();
    let vehicle_id = VehicleId::new(aggregate_id);

    dispatcher
        .dispatch::<Vehicle>(
            aggregate_id,
            "fleet.vehicle",
            VehicleCommand::Register(RegisterVehicle {
                vehicle_id,
                license_plate: "AA-123-BB".to_string(),
                model: "Renault Kangoo".to_string(),
                year: 2021,
                fuel_level: 75,
                occurred_at: Utc::now(),
            }),
            |_| Vehicle::empty(vehicle_id),
        )
        .unwrap();

    dispatcher
        .dispatch::<Vehicle>(
            aggregate_id,
            "fleet.vehicle",
            VehicleCommand::ChangeStatus(ChangeVehicleStatus {
                vehicle_id,
                status: VehicleStatus::Maintenance,
                occurred_at: Utc::now(),
            }),
            |_| Vehicle::empty(vehicle_id),
        )
        .unwrap();

    while let Ok(envelope) = subscription.try_recv() {
        vehicles.apply_envelope(&envelope).unwrap();
    }

    let in_maintenance = vehicles.query(&VehicleFilter {
        status: Some(VehicleStatus::Maintenance),
        ..Default::default()
    });
    assert_eq!(in_maintenance.len(), 1);
    assert_eq!(in_maintenance[0].license_plate, "AA-123-BB");
}
