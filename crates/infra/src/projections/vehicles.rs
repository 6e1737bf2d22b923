//! Vehicles projection: the fleet list read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::UserId;
use fleetwise_events::EventEnvelope;
use fleetwise_vehicles::{VehicleEvent, VehicleId, VehicleStatus};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleReadModel {
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub model: String,
    pub year: u16,
    pub status: VehicleStatus,
    pub driver_id: Option<UserId>,
    pub fuel_level: u8,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter for the fleet list.
#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    pub status: Option<VehicleStatus>,
    pub driver_id: Option<UserId>,
    pub search: Option<String>,
}

/// Projection maintaining the fleet list.
pub struct VehiclesProjection<S> {
    store: S,
}

impl<S> VehiclesProjection<S>
where
    S: ReadStore<VehicleId, VehicleReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if !envelope.aggregate_type().starts_with("fleet.vehicle") {
            return Ok(());
        }

        let event: VehicleEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            VehicleEvent::Registered(e) => {
                self.store.upsert(
                    e.vehicle_id,
                    VehicleReadModel {
                        vehicle_id: e.vehicle_id,
                        license_plate: e.license_plate,
                        model: e.model,
                        year: e.year,
                        status: VehicleStatus::Active,
                        driver_id: None,
                        fuel_level: e.fuel_level,
                        last_maintenance: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            VehicleEvent::StatusChanged(e) => {
                self.update(e.vehicle_id, e.occurred_at, |m| m.status = e.status);
            }
            VehicleEvent::DriverAssigned(e) => {
                self.update(e.vehicle_id, e.occurred_at, |m| {
                    m.driver_id = Some(e.driver_id)
                });
            }
            VehicleEvent::DriverUnassigned(e) => {
                self.update(e.vehicle_id, e.occurred_at, |m| m.driver_id = None);
            }
            VehicleEvent::FuelLevelRecorded(e) => {
                self.update(e.vehicle_id, e.occurred_at, |m| m.fuel_level = e.fuel_level);
            }
            VehicleEvent::MaintenanceRecorded(e) => {
                self.update(e.vehicle_id, e.occurred_at, |m| {
                    m.last_maintenance = Some(e.completed_at)
                });
            }
        }

        Ok(())
    }

    fn update(
        &self,
        vehicle_id: VehicleId,
        occurred_at: DateTime<Utc>,
        mutate: impl FnOnce(&mut VehicleReadModel),
    ) {
        if let Some(mut model) = self.store.get(&vehicle_id) {
            mutate(&mut model);
            model.updated_at = occurred_at;
            self.store.upsert(vehicle_id, model);
        }
    }

    pub fn get(&self, vehicle_id: &VehicleId) -> Option<VehicleReadModel> {
        self.store.get(vehicle_id)
    }

    /// List the fleet, newest first, applying the filter.
    pub fn query(&self, filter: &VehicleFilter) -> Vec<VehicleReadModel> {
        let mut vehicles: Vec<VehicleReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|v| {
                if let Some(status) = filter.status {
                    if v.status != status {
                        return false;
                    }
                }
                if let Some(driver_id) = filter.driver_id {
                    if v.driver_id != Some(driver_id) {
                        return false;
                    }
                }
                if let Some(search) = &filter.search {
                    if !super::matches_search(&[&v.license_plate, &v.model], search) {
                        return false;
                    }
                }
                true
            })
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        vehicles
    }
}
