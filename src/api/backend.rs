//! Seams between the engine and its external collaborators.
//!
//! [`ApiClient`](super::ApiClient) implements all three over HTTP; tests
//! substitute scripted implementations.

use crate::address::AddressRecord;
use crate::camera::EncodedImage;
use crate::reconcile::DeliveryStatus;

use super::client::ApiError;
use super::types::DashboardData;

/// Turns a parcel photo into an address record.
#[allow(async_fn_in_trait)]
pub trait RecognitionBackend {
    async fn recognize(&self, image: &EncodedImage) -> Result<AddressRecord, ApiError>;
}

/// Provides dashboard snapshots.
#[allow(async_fn_in_trait)]
pub trait DashboardSource {
    async fn fetch_dashboard(&self) -> Result<DashboardData, ApiError>;
}

/// Confirms a delivery status change in the backing store.
#[allow(async_fn_in_trait)]
pub trait StatusConfirmer {
    async fn confirm_status(&self, parcel_id: u64, status: DeliveryStatus) -> Result<(), ApiError>;
}
