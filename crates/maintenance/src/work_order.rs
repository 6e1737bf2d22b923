use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use fleetwise_events::Event;
use fleetwise_garages::GarageId;
use fleetwise_vehicles::VehicleId;

/// Maintenance work-order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub AggregateId);

impl WorkOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of maintenance intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceKind {
    Preventive,
    Corrective,
    Regular,
}

/// Work-order status lifecycle.
///
/// `scheduled → in_progress → completed`; `cancelled` is reachable from
/// `scheduled` and `in_progress` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// Aggregate root: maintenance work order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrder {
    id: WorkOrderId,
    vehicle_id: Option<VehicleId>,
    garage_id: Option<GarageId>,
    kind: MaintenanceKind,
    description: String,
    status: MaintenanceStatus,
    scheduled_date: Option<DateTime<Utc>>,
    completed_date: Option<DateTime<Utc>>,
    /// Costs in smallest currency unit (e.g. cents).
    estimated_cost: Option<u64>,
    actual_cost: Option<u64>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl WorkOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WorkOrderId) -> Self {
        Self {
            id,
            vehicle_id: None,
            garage_id: None,
            kind: MaintenanceKind::Regular,
            description: String::new(),
            status: MaintenanceStatus::Scheduled,
            scheduled_date: None,
            completed_date: None,
            estimated_cost: None,
            actual_cost: None,
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WorkOrderId {
        self.id
    }

    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    pub fn garage_id(&self) -> Option<GarageId> {
        self.garage_id
    }

    pub fn kind(&self) -> MaintenanceKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> MaintenanceStatus {
        self.status
    }

    pub fn scheduled_date(&self) -> Option<DateTime<Utc>> {
        self.scheduled_date
    }

    pub fn completed_date(&self) -> Option<DateTime<Utc>> {
        self.completed_date
    }

    pub fn estimated_cost(&self) -> Option<u64> {
        self.estimated_cost
    }

    pub fn actual_cost(&self) -> Option<u64> {
        self.actual_cost
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Whether the order is still open (can be started, completed or
    /// cancelled).
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            MaintenanceStatus::Scheduled | MaintenanceStatus::InProgress
        )
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

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
pub struct ScheduleMaintenance {
    pub work_order_id: WorkOrderId,
    pub vehicle_id: VehicleId,
    pub garage_id: Option<GarageId>,
    pub kind: MaintenanceKind,
    pub description: String,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_cost: Option<u64>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkOrder {
    pub work_order_id: WorkOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteWorkOrder {
    pub work_order_id: WorkOrderId,
    pub actual_cost: Option<u64>,
    pub completed_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelWorkOrder {
    pub work_order_id: WorkOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// All work-order commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkOrderCommand {
    Schedule(ScheduleMaintenance),
    Start(StartWorkOrder),
    Complete(CompleteWorkOrder),
    Cancel(CancelWorkOrder),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderScheduled {
    pub work_order_id: WorkOrderId,
    pub vehicle_id: VehicleId,
    pub garage_id: Option<GarageId>,
    pub kind: MaintenanceKind,
    pub description: String,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_cost: Option<u64>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderStarted {
    pub work_order_id: WorkOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderCompleted {
    pub work_order_id: WorkOrderId,
    pub vehicle_id: VehicleId,
    pub actual_cost: Option<u64>,
    pub completed_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderCancelled {
    pub work_order_id: WorkOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// All work-order events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderEvent {
    Scheduled(WorkOrderScheduled),
    Started(WorkOrderStarted),
    Completed(WorkOrderCompleted),
    Cancelled(WorkOrderCancelled),
}

impl Event for WorkOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkOrderEvent::Scheduled(_) => "fleet.maintenance.scheduled",
            WorkOrderEvent::Started(_) => "fleet.maintenance.started",
            WorkOrderEvent::Completed(_) => "fleet.maintenance.completed",
            WorkOrderEvent::Cancelled(_) => "fleet.maintenance.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkOrderEvent::Scheduled(e) => e.occurred_at,
            WorkOrderEvent::Started(e) => e.occurred_at,
            WorkOrderEvent::Completed(e) => e.occurred_at,
            WorkOrderEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for WorkOrder {
    type Command = WorkOrderCommand;
    type Event = WorkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WorkOrderEvent::Scheduled(e) => {
                self.id = e.work_order_id;
                self.vehicle_id = Some(e.vehicle_id);
                self.garage_id = e.garage_id;
                self.kind = e.kind;
                self.description = e.description.clone();
                self.status = MaintenanceStatus::Scheduled;
                self.scheduled_date = Some(e.scheduled_date);
                self.estimated_cost = e.estimated_cost;
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            WorkOrderEvent::Started(_) => {
                self.status = MaintenanceStatus::InProgress;
            }
            WorkOrderEvent::Completed(e) => {
                self.status = MaintenanceStatus::Completed;
                self.actual_cost = e.actual_cost;
                self.completed_date = Some(e.completed_date);
            }
            WorkOrderEvent::Cancelled(_) => {
                self.status = MaintenanceStatus::Cancelled;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WorkOrderCommand::Schedule(cmd) => self.handle_schedule(cmd),
            WorkOrderCommand::Start(cmd) => self.handle_start(cmd),
            WorkOrderCommand::Complete(cmd) => self.handle_complete(cmd),
            WorkOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl WorkOrder {
    fn handle_schedule(&self, cmd: &ScheduleMaintenance) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("work order already scheduled"));
        }

        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }

        if cmd.estimated_cost == Some(0) {
            return Err(DomainError::validation("estimated cost must be positive"));
        }

        Ok(vec![WorkOrderEvent::Scheduled(WorkOrderScheduled {
            work_order_id: cmd.work_order_id,
            vehicle_id: cmd.vehicle_id,
            garage_id: cmd.garage_id,
            kind: cmd.kind,
            description: cmd.description.trim().to_string(),
            scheduled_date: cmd.scheduled_date,
            estimated_cost: cmd.estimated_cost,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        if self.status != MaintenanceStatus::Scheduled {
            return Err(DomainError::invariant(format!(
                "cannot start work order in status {:?}",
                self.status
            )));
        }

        Ok(vec![WorkOrderEvent::Started(WorkOrderStarted {
            work_order_id: cmd.work_order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        if self.status != MaintenanceStatus::InProgress {
            return Err(DomainError::invariant(format!(
                "cannot complete work order in status {:?}",
                self.status
            )));
        }

        let Some(vehicle_id) = self.vehicle_id else {
            return Err(DomainError::invariant("work order has no vehicle"));
        };

        Ok(vec![WorkOrderEvent::Completed(WorkOrderCompleted {
            work_order_id: cmd.work_order_id,
            vehicle_id,
            actual_cost: cmd.actual_cost,
            completed_date: cmd.completed_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelWorkOrder) -> Result<Vec<WorkOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        if !self.is_open() {
            return Err(DomainError::invariant(format!(
                "cannot cancel work order in status {:?}",
                self.status
            )));
        }

        Ok(vec![WorkOrderEvent::Cancelled(WorkOrderCancelled {
            work_order_id: cmd.work_order_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
