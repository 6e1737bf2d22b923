//! Work-orders projection: the maintenance schedule read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::UserId;
use fleetwise_events::EventEnvelope;
use fleetwise_garages::GarageId;
use fleetwise_maintenance::{MaintenanceKind, MaintenanceStatus, WorkOrderEvent, WorkOrderId};
use fleetwise_vehicles::VehicleId;

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderReadModel {
    pub work_order_id: WorkOrderId,
    pub vehicle_id: VehicleId,
    pub garage_id: Option<GarageId>,
    pub kind: MaintenanceKind,
    pub description: String,
    pub status: MaintenanceStatus,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub estimated_cost: Option<u64>,
    pub actual_cost: Option<u64>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter for the maintenance schedule.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    pub status: Option<MaintenanceStatus>,
    pub vehicle_id: Option<VehicleId>,
    pub search: Option<String>,
}

/// Projection maintaining the maintenance schedule.
pub struct WorkOrdersProjection<S> {
    store: S,
}

impl<S> WorkOrdersProjection<S>
where
    S: ReadStore<WorkOrderId, WorkOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if !envelope.aggregate_type().starts_with("fleet.maintenance") {
            return Ok(());
        }

        let event: WorkOrderEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            WorkOrderEvent::Scheduled(e) => {
                self.store.upsert(
                    e.work_order_id,
                    WorkOrderReadModel {
                        work_order_id: e.work_order_id,
                        vehicle_id: e.vehicle_id,
                        garage_id: e.garage_id,
                        kind: e.kind,
                        description: e.description,
                        status: MaintenanceStatus::Scheduled,
                        scheduled_date: e.scheduled_date,
                        completed_date: None,
                        estimated_cost: e.estimated_cost,
                        actual_cost: None,
                        created_by: e.created_by,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            WorkOrderEvent::Started(e) => {
                self.update(e.work_order_id, e.occurred_at, |m| {
                    m.status = MaintenanceStatus::InProgress
                });
            }
            WorkOrderEvent::Completed(e) => {
                self.update(e.work_order_id, e.occurred_at, |m| {
                    m.status = MaintenanceStatus::Completed;
                    m.actual_cost = e.actual_cost;
                    m.completed_date = Some(e.completed_date);
                });
            }
            WorkOrderEvent::Cancelled(e) => {
                self.update(e.work_order_id, e.occurred_at, |m| {
                    m.status = MaintenanceStatus::Cancelled
                });
            }
        }

        Ok(())
    }

    fn update(
        &self,
        work_order_id: WorkOrderId,
        occurred_at: DateTime<Utc>,
        mutate: impl FnOnce(&mut WorkOrderReadModel),
    ) {
        if let Some(mut model) = self.store.get(&work_order_id) {
            mutate(&mut model);
            model.updated_at = occurred_at;
            self.store.upsert(work_order_id, model);
        }
    }

    pub fn get(&self, work_order_id: &WorkOrderId) -> Option<WorkOrderReadModel> {
        self.store.get(work_order_id)
    }

    /// List the schedule, soonest scheduled date first, applying the filter.
    pub fn query(&self, filter: &WorkOrderFilter) -> Vec<WorkOrderReadModel> {
        let mut orders: Vec<WorkOrderReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|o| {
                if let Some(status) = filter.status {
                    if o.status != status {
                        return false;
                    }
                }
                if let Some(vehicle_id) = filter.vehicle_id {
                    if o.vehicle_id != vehicle_id {
                        return false;
                    }
                }
                if let Some(search) = &filter.search {
                    if !super::matches_search(&[&o.description], search) {
                        return false;
                    }
                }
                true
            })
            .collect();
        orders.sort_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date));
        orders
    }
}
