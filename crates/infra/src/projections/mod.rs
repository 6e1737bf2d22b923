//! Read-model projections, one per domain area.
//!
//! Each projection consumes event envelopes from the bus and maintains a
//! queryable read model. Projections are idempotent: replaying an envelope
//! converges to the same state.

pub mod garages;
pub mod notifications;
pub mod users;
pub mod vehicles;
pub mod work_orders;

pub use garages::{GarageFilter, GarageReadModel, GaragesProjection};
pub use notifications::{NotificationFilter, NotificationReadModel, NotificationsProjection};
pub use users::{UserFilter, UserReadModel, UsersProjection};
pub use vehicles::{VehicleFilter, VehicleReadModel, VehiclesProjection};
pub use work_orders::{WorkOrderFilter, WorkOrderReadModel, WorkOrdersProjection};

fn matches_search(haystacks: &[&str], search: &str) -> bool {
    let needle = search.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}
