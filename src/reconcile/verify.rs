//! Pincode verification.

use serde::{Deserialize, Serialize};

use crate::address::AddressRecord;
use crate::api::RecentAddress;

/// Whether the record's pincode matches `reference`.
///
/// An absent or empty pincode on either side is never verified.
pub fn derive_verification(record: &AddressRecord, reference: Option<&str>) -> bool {
    match (record.pincode.as_deref(), reference) {
        (Some(pincode), Some(reference)) if !pincode.is_empty() && !reference.is_empty() => {
            pincode == reference
        }
        _ => false,
    }
}

/// Where the reference pincode for verification comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// The geocoder's pincode for the same address
    #[default]
    GoogleMaps,
    /// No reference; nothing is verified
    Disabled,
}

impl ReferenceSource {
    pub fn reference_for(self, address: &RecentAddress) -> Option<&str> {
        match self {
            ReferenceSource::GoogleMaps => address.google_maps_pincode.as_deref(),
            ReferenceSource::Disabled => None,
        }
    }
}
