//! Vehicles domain module (event-sourced).
//!
//! Business rules for the vehicle fleet, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod vehicle;

pub use vehicle::{
    AssignDriver, ChangeVehicleStatus, DriverAssigned, DriverUnassigned, FuelLevelRecorded,
    MaintenanceRecorded, RecordFuelLevel, RecordMaintenance, RegisterVehicle, UnassignDriver,
    Vehicle, VehicleCommand, VehicleEvent, VehicleId, VehicleRegistered, VehicleStatus,
    VehicleStatusChanged,
};
