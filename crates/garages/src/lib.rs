//! Garages domain module (partner workshops, event-sourced).

pub mod garage;

pub use garage::{
    ChangeGarageStatus, Garage, GarageCommand, GarageDetailsUpdated, GarageEvent, GarageId,
    GarageRegistered, GarageStatus, GarageStatusChanged, RegisterGarage, UpdateGarageDetails,
};
