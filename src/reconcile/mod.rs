//! Reconciliation of backend address data into the parcel board.

pub mod board;
pub mod dashboard;
pub mod parcel;
pub mod verify;

pub use board::{ConfirmOutcome, ParcelBoard, PendingStatusUpdate, ReconcileError};
pub use dashboard::{fetch_and_reconcile, reconcile, DashboardSnapshot, DashboardStats};
pub use parcel::{
    estimated_delivery, order_number, route, DeliveryStatus, ParcelView, ParseStatusError,
};
pub use verify::{derive_verification, ReferenceSource};
