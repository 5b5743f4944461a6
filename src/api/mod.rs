//! HTTP access to the parcel backend.

pub mod backend;
pub mod client;
pub mod retry;
pub mod types;

pub use backend::{DashboardSource, RecognitionBackend, StatusConfirmer};
pub use client::{
    ApiClient, ApiError, ClientConfig, API_BASE_URL_ENV, DEFAULT_API_BASE_URL,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_PINCODES_PER_PAGE,
};
pub use retry::RetryPolicy;
pub use types::{
    CaptureResponse, DashboardData, ExtractedAddress, GeocodingResults, PincodePage,
    PincodeRecord, RecentAddress,
};
