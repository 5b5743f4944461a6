//! Wire formats of the parcel backend.

use serde::{Deserialize, Serialize};

use crate::address::AddressRecord;
use crate::reconcile::DeliveryStatus;

/// Body of `POST capture_and_process`.
#[derive(Debug, Serialize)]
pub(crate) struct CaptureRequest {
    /// Image as a `data:image/jpeg;base64,...` URI
    pub image: String,
}

/// Body of `PATCH parcels/{id}/status`.
#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateRequest {
    pub status: DeliveryStatus,
}

/// Error body the backend returns with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Address fields as read from the parcel image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtractedAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    /// Raw OCR text, when the backend includes it
    #[serde(default)]
    pub address_text: Option<String>,
}

/// Geocoder view of the same address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeocodingResults {
    #[serde(default)]
    pub google_maps_street: Option<String>,
    #[serde(default)]
    pub google_maps_city: Option<String>,
    #[serde(default)]
    pub google_maps_state: Option<String>,
    #[serde(default)]
    pub google_maps_pincode: Option<String>,
}

/// Successful response of `POST capture_and_process`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureResponse {
    pub extracted_address: ExtractedAddress,
    #[serde(default)]
    pub nodal_delivery_center: Option<String>,
    #[serde(default)]
    pub geocoding_results: Option<GeocodingResults>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CaptureResponse {
    pub fn into_record(self) -> AddressRecord {
        AddressRecord {
            street: self.extracted_address.street,
            city: self.extracted_address.city,
            state: self.extracted_address.state,
            pincode: self.extracted_address.pincode,
            nodal_delivery_center: self.nodal_delivery_center.unwrap_or_default(),
        }
    }
}

/// Response of `GET dashboard_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub total_addresses: u64,
    #[serde(default)]
    pub total_wrong_pincodes: u64,
    #[serde(default)]
    pub total_voice_addresses: u64,
    #[serde(default)]
    pub recent_addresses: Vec<RecentAddress>,
}

/// One stored address in the dashboard feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecentAddress {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub nodal_delivery_center: Option<String>,
    /// Creation timestamp as sent by the backend
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub google_maps_city: Option<String>,
    #[serde(default)]
    pub google_maps_pincode: Option<String>,
}

impl RecentAddress {
    pub fn to_record(&self) -> AddressRecord {
        AddressRecord {
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
            nodal_delivery_center: self.nodal_delivery_center.clone().unwrap_or_default(),
        }
    }
}

/// One post office in the pincode directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PincodeRecord {
    pub id: u64,
    pub pincode: String,
    #[serde(default)]
    pub office_name: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub office_type: Option<String>,
}

/// Response of `GET pincodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PincodePage {
    pub data: Vec<PincodeRecord>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}
