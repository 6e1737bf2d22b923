use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use fleetwise_events::Event;

/// Vehicle identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub AggregateId);

impl VehicleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Vehicle status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Inactive,
}

impl core::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            VehicleStatus::Active => write!(f, "active"),
            VehicleStatus::Maintenance => write!(f, "maintenance"),
            VehicleStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Aggregate root: Vehicle.
///
/// # Invariants
/// - Fuel level stays within 0..=100.
/// - At most one assigned driver at a time.
/// - Status transitions never repeat the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    id: VehicleId,
    license_plate: String,
    model: String,
    year: u16,
    status: VehicleStatus,
    driver_id: Option<UserId>,
    fuel_level: u8,
    last_maintenance: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Vehicle {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: VehicleId) -> Self {
        Self {
            id,
            license_plate: String::new(),
            model: String::new(),
            year: 0,
            status: VehicleStatus::Active,
            driver_id: None,
            fuel_level: 0,
            last_maintenance: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VehicleId {
        self.id
    }

    pub fn license_plate(&self) -> &str {
        &self.license_plate
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn driver_id(&self) -> Option<UserId> {
        self.driver_id
    }

    pub fn fuel_level(&self) -> u8 {
        self.fuel_level
    }

    pub fn last_maintenance(&self) -> Option<DateTime<Utc>> {
        self.last_maintenance
    }

    /// Whether the vehicle can be sent out (drivers assigned, trips started).
    pub fn is_operational(&self) -> bool {
        self.status == VehicleStatus::Active
    }
}

impl AggregateRoot for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterVehicle {
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub model: String,
    pub year: u16,
    pub fuel_level: u8,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeVehicleStatus {
    pub vehicle_id: VehicleId,
    pub status: VehicleStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDriver {
    pub vehicle_id: VehicleId,
    pub driver_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignDriver {
    pub vehicle_id: VehicleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFuelLevel {
    pub vehicle_id: VehicleId,
    pub fuel_level: u8,
    pub occurred_at: DateTime<Utc>,
}

/// Stamp the vehicle's last-maintenance timestamp (issued when a work order
/// completes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMaintenance {
    pub vehicle_id: VehicleId,
    pub completed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// All vehicle commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VehicleCommand {
    Register(RegisterVehicle),
    ChangeStatus(ChangeVehicleStatus),
    AssignDriver(AssignDriver),
    UnassignDriver(UnassignDriver),
    RecordFuelLevel(RecordFuelLevel),
    RecordMaintenance(RecordMaintenance),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistered {
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub model: String,
    pub year: u16,
    pub fuel_level: u8,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatusChanged {
    pub vehicle_id: VehicleId,
    pub previous_status: VehicleStatus,
    pub status: VehicleStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverAssigned {
    pub vehicle_id: VehicleId,
    pub driver_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverUnassigned {
    pub vehicle_id: VehicleId,
    pub driver_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelLevelRecorded {
    pub vehicle_id: VehicleId,
    pub fuel_level: u8,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecorded {
    pub vehicle_id: VehicleId,
    pub completed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// All vehicle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEvent {
    Registered(VehicleRegistered),
    StatusChanged(VehicleStatusChanged),
    DriverAssigned(DriverAssigned),
    DriverUnassigned(DriverUnassigned),
    FuelLevelRecorded(FuelLevelRecorded),
    MaintenanceRecorded(MaintenanceRecorded),
}

impl Event for VehicleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VehicleEvent::Registered(_) => "fleet.vehicle.registered",
            VehicleEvent::StatusChanged(_) => "fleet.vehicle.status_changed",
            VehicleEvent::DriverAssigned(_) => "fleet.vehicle.driver_assigned",
            VehicleEvent::DriverUnassigned(_) => "fleet.vehicle.driver_unassigned",
            VehicleEvent::FuelLevelRecorded(_) => "fleet.vehicle.fuel_level_recorded",
            VehicleEvent::MaintenanceRecorded(_) => "fleet.vehicle.maintenance_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VehicleEvent::Registered(e) => e.occurred_at,
            VehicleEvent::StatusChanged(e) => e.occurred_at,
            VehicleEvent::DriverAssigned(e) => e.occurred_at,
            VehicleEvent::DriverUnassigned(e) => e.occurred_at,
            VehicleEvent::FuelLevelRecorded(e) => e.occurred_at,
            VehicleEvent::MaintenanceRecorded(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Vehicle {
    type Command = VehicleCommand;
    type Event = VehicleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VehicleEvent::Registered(e) => {
                self.id = e.vehicle_id;
                self.license_plate = e.license_plate.clone();
                self.model = e.model.clone();
                self.year = e.year;
                self.status = VehicleStatus::Active;
                self.fuel_level = e.fuel_level;
                self.created = true;
            }
            VehicleEvent::StatusChanged(e) => {
                self.status = e.status;
            }
            VehicleEvent::DriverAssigned(e) => {
                self.driver_id = Some(e.driver_id);
            }
            VehicleEvent::DriverUnassigned(_) => {
                self.driver_id = None;
            }
            VehicleEvent::FuelLevelRecorded(e) => {
                self.fuel_level = e.fuel_level;
            }
            VehicleEvent::MaintenanceRecorded(e) => {
                self.last_maintenance = Some(e.completed_at);
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VehicleCommand::Register(cmd) => self.handle_register(cmd),
            VehicleCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            VehicleCommand::AssignDriver(cmd) => self.handle_assign_driver(cmd),
            VehicleCommand::UnassignDriver(cmd) => self.handle_unassign_driver(cmd),
            VehicleCommand::RecordFuelLevel(cmd) => self.handle_record_fuel(cmd),
            VehicleCommand::RecordMaintenance(cmd) => self.handle_record_maintenance(cmd),
        }
    }
}

impl Vehicle {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterVehicle) -> Result<Vec<VehicleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("vehicle already registered"));
        }

        if cmd.license_plate.trim().is_empty() {
            return Err(DomainError::validation("license plate cannot be empty"));
        }

        if cmd.model.trim().is_empty() {
            return Err(DomainError::validation("model cannot be empty"));
        }

        if !(1980..=2100).contains(&cmd.year) {
            return Err(DomainError::validation("year out of range"));
        }

        if cmd.fuel_level > 100 {
            return Err(DomainError::validation("fuel level must be 0..=100"));
        }

        Ok(vec![VehicleEvent::Registered(VehicleRegistered {
            vehicle_id: cmd.vehicle_id,
            license_plate: cmd.license_plate.trim().to_uppercase(),
            model: cmd.model.trim().to_string(),
            year: cmd.year,
            fuel_level: cmd.fuel_level,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeVehicleStatus,
    ) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_created()?;

        if self.status == cmd.status {
            return Err(DomainError::invariant("vehicle already in that status"));
        }

        Ok(vec![VehicleEvent::StatusChanged(VehicleStatusChanged {
            vehicle_id: cmd.vehicle_id,
            previous_status: self.status,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_driver(&self, cmd: &AssignDriver) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_created()?;

        if self.driver_id == Some(cmd.driver_id) {
            return Err(DomainError::invariant("driver already assigned"));
        }

        // Reassignment releases the previous driver in the same decision.
        let mut events = Vec::new();
        if let Some(previous) = self.driver_id {
            events.push(VehicleEvent::DriverUnassigned(DriverUnassigned {
                vehicle_id: cmd.vehicle_id,
                driver_id: previous,
                occurred_at: cmd.occurred_at,
            }));
        }
        events.push(VehicleEvent::DriverAssigned(DriverAssigned {
            vehicle_id: cmd.vehicle_id,
            driver_id: cmd.driver_id,
            occurred_at: cmd.occurred_at,
        }));

        Ok(events)
    }

    fn handle_unassign_driver(
        &self,
        cmd: &UnassignDriver,
    ) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_created()?;

        let Some(driver_id) = self.driver_id else {
            return Err(DomainError::invariant("no driver assigned"));
        };

        Ok(vec![VehicleEvent::DriverUnassigned(DriverUnassigned {
            vehicle_id: cmd.vehicle_id,
            driver_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_fuel(&self, cmd: &RecordFuelLevel) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_created()?;

        if cmd.fuel_level > 100 {
            return Err(DomainError::validation("fuel level must be 0..=100"));
        }

        Ok(vec![VehicleEvent::FuelLevelRecorded(FuelLevelRecorded {
            vehicle_id: cmd.vehicle_id,
            fuel_level: cmd.fuel_level,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_maintenance(
        &self,
        cmd: &RecordMaintenance,
    ) -> Result<Vec<VehicleEvent>, DomainError> {
        self.ensure_created()?;

        Ok(vec![VehicleEvent::MaintenanceRecorded(MaintenanceRecorded {
            vehicle_id: cmd.vehicle_id,
            completed_at: cmd.completed_at,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
