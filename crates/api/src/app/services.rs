//! Infrastructure wiring for the HTTP API.
//!
//! Builds the in-memory store/bus/dispatcher stack, the projections behind
//! every list endpoint, the directory identity store, and the background
//! subscriber that pumps committed events into projections, reactions, and
//! the realtime channel.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use uuid::Uuid;

use fleetwise_auth::{CreateUser, Role, User, UserCommand};
use fleetwise_core::{Aggregate, AggregateId, DomainError, UserId};
use fleetwise_events::{EventBus, EventEnvelope, InMemoryEventBus};
use fleetwise_garages::{GarageCommand, GarageId, RegisterGarage};
use fleetwise_infra::{
    CommandDispatcher, DirectoryIdentityStore, DispatchError, InMemoryEventStore,
    InMemoryReadStore, StoredEvent,
    projections::{
        GarageReadModel, GaragesProjection, NotificationReadModel, NotificationsProjection,
        UserReadModel, UsersProjection, VehicleReadModel, VehiclesProjection, WorkOrderReadModel,
        WorkOrdersProjection,
    },
};
use fleetwise_maintenance::{WorkOrderEvent, WorkOrderId};
use fleetwise_notifications::{
    Notification, NotificationCommand, NotificationId, NotificationKind, NotificationPriority,
    PublishNotification,
};
use fleetwise_session::{Actor, Credential, IdentityStore, SignInError};
use fleetwise_vehicles::{
    AssignDriver, RecordMaintenance, RegisterVehicle, Vehicle, VehicleCommand, VehicleId,
};

use crate::tokens::SessionTokens;

/// Message broadcast to SSE subscribers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: JsonValue,
}

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;

type UserStore = Arc<InMemoryReadStore<UserId, UserReadModel>>;
type VehicleStore = Arc<InMemoryReadStore<VehicleId, VehicleReadModel>>;
type WorkOrderStore = Arc<InMemoryReadStore<WorkOrderId, WorkOrderReadModel>>;
type GarageStore = Arc<InMemoryReadStore<GarageId, GarageReadModel>>;
type NotificationStore = Arc<InMemoryReadStore<NotificationId, NotificationReadModel>>;

pub struct AppServices {
    dispatcher: Arc<Dispatcher>,
    pub users: Arc<UsersProjection<UserStore>>,
    pub vehicles: Arc<VehiclesProjection<VehicleStore>>,
    pub work_orders: Arc<WorkOrdersProjection<WorkOrderStore>>,
    pub garages: Arc<GaragesProjection<GarageStore>>,
    pub notifications: Arc<NotificationsProjection<NotificationStore>>,
    identity: Arc<DirectoryIdentityStore<UserStore>>,
    tokens: SessionTokens,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    /// Dispatch a command through the shared pipeline.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: fleetwise_events::Event + Serialize + DeserializeOwned,
    {
        self.dispatcher
            .dispatch(aggregate_id, aggregate_type, command, make_aggregate)
    }

    /// Authenticate and open a bearer session.
    ///
    /// Deactivated accounts are rejected: they resolve to an actor but are
    /// treated as unauthenticated.
    pub fn sign_in(&self, credential: &Credential) -> Result<(Uuid, Actor), SignInError> {
        let actor = self
            .identity
            .authenticate(credential)
            .map_err(|_| SignInError::InvalidCredential)?;

        if !actor.is_active() {
            return Err(SignInError::AccountInactive);
        }

        let token = self.tokens.issue(actor.id);
        tracing::info!(email = %actor.email, role = %actor.role, "signed in");
        Ok((token, actor))
    }

    /// Close a bearer session. Idempotent.
    pub fn sign_out(&self, token: &Uuid) {
        self.tokens.revoke(token);
    }

    /// Resolve a live session token to the directory's current actor.
    pub fn resolve_session(&self, token: &Uuid) -> Option<Actor> {
        let user_id = self.tokens.resolve(token)?;
        self.identity.actor_by_id(&user_id)
    }

    /// Set the password used by `sign_in` for an email.
    pub fn set_password(&self, email: &str, password: &str) {
        self.identity.set_password(email, password);
    }

    pub fn subscribe_realtime(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.realtime_tx.subscribe()
    }
}

/// Build the full in-memory service stack.
pub async fn build_services() -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(CommandDispatcher::new(store, bus.clone()));

    let user_store: UserStore = Arc::new(InMemoryReadStore::new());
    let users = Arc::new(UsersProjection::new(user_store.clone()));
    let vehicles = Arc::new(VehiclesProjection::new(Arc::new(InMemoryReadStore::new())));
    let work_orders = Arc::new(WorkOrdersProjection::new(Arc::new(InMemoryReadStore::new())));
    let garages = Arc::new(GaragesProjection::new(Arc::new(InMemoryReadStore::new())));
    let notifications = Arc::new(NotificationsProjection::new(Arc::new(InMemoryReadStore::new())));

    let identity = Arc::new(DirectoryIdentityStore::new(users.clone()));

    // Realtime channel (SSE): lossy broadcast, fan-out in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Background subscriber: bus -> projections -> reactions -> realtime.
    {
        let sub = bus.subscribe();
        let dispatcher = dispatcher.clone();
        let users = users.clone();
        let vehicles = vehicles.clone();
        let work_orders = work_orders.clone();
        let garages = garages.clone();
        let notifications = notifications.clone();
        let realtime_tx = realtime_tx.clone();
        std::thread::spawn(move || loop {
            match sub.recv() {
                Ok(env) => {
                    for result in [
                        users.apply_envelope(&env),
                        vehicles.apply_envelope(&env),
                        work_orders.apply_envelope(&env),
                        garages.apply_envelope(&env),
                        notifications.apply_envelope(&env),
                    ] {
                        if let Err(e) = result {
                            tracing::warn!("projection apply failed: {e}");
                        }
                    }

                    react_to_envelope(&dispatcher, &env);

                    // Broadcast the committed event (lossy; no backpressure
                    // on the pipeline).
                    let _ = realtime_tx.send(RealtimeMessage {
                        topic: format!("{}.updated", env.aggregate_type()),
                        payload: serde_json::json!({
                            "aggregate_type": env.aggregate_type(),
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });
                }
                Err(_) => break,
            }
        });
    }

    let services = AppServices {
        dispatcher,
        users,
        vehicles,
        work_orders,
        garages,
        notifications,
        identity,
        tokens: SessionTokens::new(),
        realtime_tx,
    };

    seed_demo_data(&services);

    services
}

/// Cross-aggregate reactions to committed events.
///
/// When a work order completes, the vehicle's last-maintenance timestamp is
/// stamped and an inbox notification is published. The bus is at-least-once;
/// the stamp is idempotent in effect, duplicate notifications are tolerated.
fn react_to_envelope(dispatcher: &Arc<Dispatcher>, env: &EventEnvelope<JsonValue>) {
    if !env.aggregate_type().starts_with("fleet.maintenance") {
        return;
    }

    let event: WorkOrderEvent = match serde_json::from_value(env.payload().clone()) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("unreadable maintenance event: {e}");
            return;
        }
    };

    match event {
        WorkOrderEvent::Scheduled(e) => {
            publish_notification(
                dispatcher,
                "Maintenance scheduled",
                format!("A {} intervention was scheduled: {}", kind_label(e.kind), e.description),
                NotificationPriority::Medium,
                Some(e.vehicle_id),
            );
        }
        WorkOrderEvent::Completed(e) => {
            let aggregate_id = e.vehicle_id.0;
            let result = dispatcher.dispatch::<Vehicle>(
                aggregate_id,
                "fleet.vehicle",
                VehicleCommand::RecordMaintenance(RecordMaintenance {
                    vehicle_id: e.vehicle_id,
                    completed_at: e.completed_date,
                    occurred_at: e.occurred_at,
                }),
                |_| Vehicle::empty(e.vehicle_id),
            );
            if let Err(err) = result {
                tracing::warn!("maintenance stamp failed: {err:?}");
            }

            publish_notification(
                dispatcher,
                "Maintenance completed",
                "A maintenance work order was completed.".to_string(),
                NotificationPriority::Low,
                Some(e.vehicle_id),
            );
        }
        WorkOrderEvent::Started(_) | WorkOrderEvent::Cancelled(_) => {}
    }
}

fn kind_label(kind: fleetwise_maintenance::MaintenanceKind) -> &'static str {
    match kind {
        fleetwise_maintenance::MaintenanceKind::Preventive => "preventive",
        fleetwise_maintenance::MaintenanceKind::Corrective => "corrective",
        fleetwise_maintenance::MaintenanceKind::Regular => "regular",
    }
}

fn publish_notification(
    dispatcher: &Arc<Dispatcher>,
    title: &str,
    message: String,
    priority: NotificationPriority,
    vehicle_id: Option<VehicleId>,
) {
    let aggregate_id = AggregateId::new();
    let notification_id = NotificationId::new(aggregate_id);
    let result = dispatcher.dispatch::<Notification>(
        aggregate_id,
        "fleet.notification",
        NotificationCommand::Publish(PublishNotification {
            notification_id,
            title: title.to_string(),
            message,
            kind: NotificationKind::Maintenance,
            priority,
            user_id: None,
            vehicle_id,
            occurred_at: Utc::now(),
        }),
        |_| Notification::empty(notification_id),
    );
    if let Err(err) = result {
        tracing::warn!("notification publish failed: {err:?}");
    }
}

/// Seed the demo directory and fleet (dev/test stack only).
fn seed_demo_data(services: &AppServices) {
    let seed_users = [
        ("admin@fleetwise.example", "Admin User", Role::Admin),
        ("manager@fleetwise.example", "Manager User", Role::Manager),
        ("driver@fleetwise.example", "Driver User", Role::Driver),
        ("mechanic@fleetwise.example", "Mechanic User", Role::Mechanic),
    ];

    let mut driver_id = None;
    for (email, display_name, role) in seed_users {
        let user_id = UserId::new();
        if role == Role::Driver {
            driver_id = Some(user_id);
        }
        let result = services.dispatch::<User>(
            AggregateId::from_uuid(*user_id.as_uuid()),
            "auth.user",
            UserCommand::Create(CreateUser {
                user_id,
                email: email.to_string(),
                display_name: display_name.to_string(),
                role,
                occurred_at: Utc::now(),
            }),
            |_| User::empty(user_id),
        );
        match result {
            Ok(_) => services.set_password(email, "password"),
            Err(e) => tracing::warn!("seed user {email} failed: {e:?}"),
        }
    }

    let seed_vehicles = [
        ("AA-123-BB", "Renault Kangoo", 2021u16, 75u8),
        ("BB-456-CC", "Peugeot Partner", 2020, 30),
        ("CC-789-DD", "Citroën Berlingo", 2022, 90),
    ];

    let mut first_vehicle = None;
    for (plate, model, year, fuel) in seed_vehicles {
        let aggregate_id = AggregateId::new();
        let vehicle_id = VehicleId::new(aggregate_id);
        if first_vehicle.is_none() {
            first_vehicle = Some(vehicle_id);
        }
        let result = services.dispatch::<Vehicle>(
            aggregate_id,
            "fleet.vehicle",
            VehicleCommand::Register(RegisterVehicle {
                vehicle_id,
                license_plate: plate.to_string(),
                model: model.to_string(),
                year,
                fuel_level: fuel,
                occurred_at: Utc::now(),
            }),
            |_| Vehicle::empty(vehicle_id),
        );
        if let Err(e) = result {
            tracing::warn!("seed vehicle {plate} failed: {e:?}");
        }
    }

    // The demo driver gets the first vehicle.
    if let (Some(driver_id), Some(vehicle_id)) = (driver_id, first_vehicle) {
        let result = services.dispatch::<Vehicle>(
            vehicle_id.0,
            "fleet.vehicle",
            VehicleCommand::AssignDriver(AssignDriver {
                vehicle_id,
                driver_id,
                occurred_at: Utc::now(),
            }),
            |_| Vehicle::empty(vehicle_id),
        );
        if let Err(e) = result {
            tracing::warn!("seed driver assignment failed: {e:?}");
        }
    }

    let aggregate_id = AggregateId::new();
    let garage_id = GarageId::new(aggregate_id);
    let result = services.dispatch::<fleetwise_garages::Garage>(
        aggregate_id,
        "fleet.garage",
        GarageCommand::Register(RegisterGarage {
            garage_id,
            name: "Garage Central".to_string(),
            address: "12 rue des Ateliers, Marseille".to_string(),
            phone: Some("+33 4 91 00 00 00".to_string()),
            specialties: vec!["engine".to_string(), "brakes".to_string()],
            occurred_at: Utc::now(),
        }),
        |_| fleetwise_garages::Garage::empty(garage_id),
    );
    if let Err(e) = result {
        tracing::warn!("seed garage failed: {e:?}");
    }

    tracing::info!("seeded demo directory and fleet");
}
