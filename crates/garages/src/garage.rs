use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use fleetwise_events::Event;

/// Garage identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GarageId(pub AggregateId);

impl GarageId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for GarageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Garage status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarageStatus {
    Active,
    Inactive,
}

/// Aggregate root: partner garage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Garage {
    id: GarageId,
    name: String,
    address: String,
    phone: Option<String>,
    specialties: Vec<String>,
    status: GarageStatus,
    version: u64,
    created: bool,
}

impl Garage {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: GarageId) -> Self {
        Self {
            id,
            name: String::new(),
            address: String::new(),
            phone: None,
            specialties: Vec::new(),
            status: GarageStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> GarageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn specialties(&self) -> &[String] {
        &self.specialties
    }

    pub fn status(&self) -> GarageStatus {
        self.status
    }

    /// Whether new work orders may be routed here.
    pub fn accepts_work(&self) -> bool {
        self.status == GarageStatus::Active
    }
}

impl AggregateRoot for Garage {
    type Id = GarageId;

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
pub struct RegisterGarage {
    pub garage_id: GarageId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub specialties: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGarageDetails {
    pub garage_id: GarageId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub specialties: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeGarageStatus {
    pub garage_id: GarageId,
    pub status: GarageStatus,
    pub occurred_at: DateTime<Utc>,
}

/// All garage commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GarageCommand {
    Register(RegisterGarage),
    UpdateDetails(UpdateGarageDetails),
    ChangeStatus(ChangeGarageStatus),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageRegistered {
    pub garage_id: GarageId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub specialties: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageDetailsUpdated {
    pub garage_id: GarageId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub specialties: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageStatusChanged {
    pub garage_id: GarageId,
    pub previous_status: GarageStatus,
    pub status: GarageStatus,
    pub occurred_at: DateTime<Utc>,
}

/// All garage events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GarageEvent {
    Registered(GarageRegistered),
    DetailsUpdated(GarageDetailsUpdated),
    StatusChanged(GarageStatusChanged),
}

impl Event for GarageEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GarageEvent::Registered(_) => "fleet.garage.registered",
            GarageEvent::DetailsUpdated(_) => "fleet.garage.details_updated",
            GarageEvent::StatusChanged(_) => "fleet.garage.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GarageEvent::Registered(e) => e.occurred_at,
            GarageEvent::DetailsUpdated(e) => e.occurred_at,
            GarageEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Garage {
    type Command = GarageCommand;
    type Event = GarageEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            GarageEvent::Registered(e) => {
                self.id = e.garage_id;
                self.name = e.name.clone();
                self.address = e.address.clone();
                self.phone = e.phone.clone();
                self.specialties = e.specialties.clone();
                self.status = GarageStatus::Active;
                self.created = true;
            }
            GarageEvent::DetailsUpdated(e) => {
                self.name = e.name.clone();
                self.address = e.address.clone();
                self.phone = e.phone.clone();
                self.specialties = e.specialties.clone();
            }
            GarageEvent::StatusChanged(e) => {
                self.status = e.status;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            GarageCommand::Register(cmd) => self.handle_register(cmd),
            GarageCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            GarageCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Garage {
    fn validate_details(name: &str, address: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if address.trim().is_empty() {
            return Err(DomainError::validation("address cannot be empty"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterGarage) -> Result<Vec<GarageEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("garage already registered"));
        }

        Self::validate_details(&cmd.name, &cmd.address)?;

        Ok(vec![GarageEvent::Registered(GarageRegistered {
            garage_id: cmd.garage_id,
            name: cmd.name.trim().to_string(),
            address: cmd.address.trim().to_string(),
            phone: cmd.phone.clone(),
            specialties: cmd.specialties.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateGarageDetails,
    ) -> Result<Vec<GarageEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        Self::validate_details(&cmd.name, &cmd.address)?;

        Ok(vec![GarageEvent::DetailsUpdated(GarageDetailsUpdated {
            garage_id: cmd.garage_id,
            name: cmd.name.trim().to_string(),
            address: cmd.address.trim().to_string(),
            phone: cmd.phone.clone(),
            specialties: cmd.specialties.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeGarageStatus,
    ) -> Result<Vec<GarageEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        if self.status == cmd.status {
            return Err(DomainError::invariant("garage already in that status"));
        }

        Ok(vec![GarageEvent::StatusChanged(GarageStatusChanged {
            garage_id: cmd.garage_id,
            previous_status: self.status,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn registered_garage() -> (GarageId, Garage) {
        let garage_id = GarageId::new(AggregateId::new());
        let mut garage = Garage::empty(garage_id);
        let cmd = GarageCommand::Register(RegisterGarage {
            garage_id,
            name: "Garage Central".to_string(),
            address: "12 rue des Ateliers, Marseille".to_string(),
            phone: Some("+33 4 91 00 00 00".to_string()),
            specialties: vec!["brakes".to_string(), "engine".to_string()],
            occurred_at: now(),
        });
        for event in garage.handle(&cmd).unwrap() {
            garage.apply(&event);
        }
        (garage_id, garage)
    }

    #[test]
    fn register_requires_name_and_address() {
        let garage_id = GarageId::new(AggregateId::new());
        let garage = Garage::empty(garage_id);

        let cmd = GarageCommand::Register(RegisterGarage {
            garage_id,
            name: "".to_string(),
            address: "somewhere".to_string(),
            phone: None,
            specialties: vec![],
            occurred_at: now(),
        });
        assert!(garage.handle(&cmd).is_err());
    }

    #[test]
    fn update_replaces_details() {
        let (garage_id, mut garage) = registered_garage();

        let cmd = GarageCommand::UpdateDetails(UpdateGarageDetails {
            garage_id,
            name: "Garage Central Sud".to_string(),
            address: "14 rue des Ateliers, Marseille".to_string(),
            phone: None,
            specialties: vec!["bodywork".to_string()],
            occurred_at: now(),
        });
        for event in garage.handle(&cmd).unwrap() {
            garage.apply(&event);
        }

        assert_eq!(garage.name(), "Garage Central Sud");
        assert_eq!(garage.phone(), None);
        assert_eq!(garage.specialties(), ["bodywork".to_string()]);
    }

    #[test]
    fn inactive_garage_stops_accepting_work() {
        let (garage_id, mut garage) = registered_garage();
        assert!(garage.accepts_work());

        let cmd = GarageCommand::ChangeStatus(ChangeGarageStatus {
            garage_id,
            status: GarageStatus::Inactive,
            occurred_at: now(),
        });
        for event in garage.handle(&cmd).unwrap() {
            garage.apply(&event);
        }
        assert!(!garage.accepts_work());

        // Same-status transition is rejected.
        assert!(garage.handle(&cmd).is_err());
    }
}
