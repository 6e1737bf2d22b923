//! Maintenance domain module (event-sourced work orders).

pub mod work_order;

pub use work_order::{
    CancelWorkOrder, CompleteWorkOrder, MaintenanceKind, MaintenanceStatus, ScheduleMaintenance,
    StartWorkOrder, WorkOrder, WorkOrderCancelled, WorkOrderCommand, WorkOrderCompleted,
    WorkOrderEvent, WorkOrderId, WorkOrderScheduled, WorkOrderStarted,
};
