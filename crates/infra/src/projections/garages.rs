//! Garages projection: the partner-garage directory read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_events::EventEnvelope;
use fleetwise_garages::{GarageEvent, GarageId, GarageStatus};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageReadModel {
    pub garage_id: GarageId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub specialties: Vec<String>,
    pub status: GarageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter for the garage directory.
#[derive(Debug, Clone, Default)]
pub struct GarageFilter {
    pub status: Option<GarageStatus>,
    pub search: Option<String>,
}

/// Projection maintaining the garage directory.
pub struct GaragesProjection<S> {
    store: S,
}

impl<S> GaragesProjection<S>
where
    S: ReadStore<GarageId, GarageReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if !envelope.aggregate_type().starts_with("fleet.garage") {
            return Ok(());
        }

        let event: GarageEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            GarageEvent::Registered(e) => {
                self.store.upsert(
                    e.garage_id,
                    GarageReadModel {
                        garage_id: e.garage_id,
                        name: e.name,
                        address: e.address,
                        phone: e.phone,
                        specialties: e.specialties,
                        status: GarageStatus::Active,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            GarageEvent::DetailsUpdated(e) => {
                if let Some(mut model) = self.store.get(&e.garage_id) {
                    model.name = e.name;
                    model.address = e.address;
                    model.phone = e.phone;
                    model.specialties = e.specialties;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.garage_id, model);
                }
            }
            GarageEvent::StatusChanged(e) => {
                if let Some(mut model) = self.store.get(&e.garage_id) {
                    model.status = e.status;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.garage_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, garage_id: &GarageId) -> Option<GarageReadModel> {
        self.store.get(garage_id)
    }

    /// List the directory, alphabetically, applying the filter.
    pub fn query(&self, filter: &GarageFilter) -> Vec<GarageReadModel> {
        let mut garages: Vec<GarageReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|g| {
                if let Some(status) = filter.status {
                    if g.status != status {
                        return false;
                    }
                }
                if let Some(search) = &filter.search {
                    if !super::matches_search(&[&g.name, &g.address], search) {
                        return false;
                    }
                }
                true
            })
            .collect();
        garages.sort_by(|a, b| a.name.cmp(&b.name));
        garages
    }
}
