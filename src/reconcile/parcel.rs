//! Parcels as shown on the board.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::address::{AddressRecord, NOT_AVAILABLE};
use crate::api::RecentAddress;

use super::verify::{derive_verification, ReferenceSource};

/// Days added to the creation time for the delivery estimate.
const DELIVERY_ESTIMATE_DAYS: u64 = 3;

/// Delivery progress of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::InTransit,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::InTransit => "In Transit",
            DeliveryStatus::OutForDelivery => "Out for Delivery",
            DeliveryStatus::Delivered => "Delivered",
        }
    }

    /// Status a freshly fetched parcel starts in, cycling by feed position.
    pub fn initial_for_position(position: usize) -> Self {
        Self::ALL[position % Self::ALL.len()]
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown delivery status '{0}'. Expected one of: in-transit, out-for-delivery, delivered")]
pub struct ParseStatusError(String);

impl FromStr for DeliveryStatus {
    type Err = ParseStatusError;

    /// Accepts `In Transit`, `in-transit`, `in_transit`, `intransit`, and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "intransit" => Ok(DeliveryStatus::InTransit),
            "outfordelivery" => Ok(DeliveryStatus::OutForDelivery),
            "delivered" => Ok(DeliveryStatus::Delivered),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A stored address projected for the board.
///
/// Everything but the delivery status is fixed at projection time; the
/// status changes only through [`ParcelBoard`](super::ParcelBoard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelView {
    pub id: u64,
    pub order_number: String,
    pub record: AddressRecord,
    pub route: String,
    pub estimated_delivery: String,
    pub created_at: Option<String>,
    pub reference_pincode: Option<String>,
    pub pincode_verified: bool,
    pub(super) delivery_status: DeliveryStatus,
}

impl ParcelView {
    /// Project the feed entry at `position`.
    pub fn project(position: usize, address: &RecentAddress, reference: ReferenceSource) -> Self {
        let id = match address.id {
            Some(id) if id != 0 => id,
            _ => position as u64 + 1,
        };
        let record = address.to_record();
        let reference_pincode = reference.reference_for(address).map(str::to_string);
        let pincode_verified = derive_verification(&record, reference_pincode.as_deref());

        Self {
            id,
            order_number: order_number(id),
            route: route(address),
            estimated_delivery: address
                .created_at
                .as_deref()
                .and_then(estimated_delivery)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            created_at: address.created_at.clone(),
            reference_pincode,
            pincode_verified,
            delivery_status: DeliveryStatus::initial_for_position(position),
            record,
        }
    }

    pub fn delivery_status(&self) -> DeliveryStatus {
        self.delivery_status
    }
}

/// `#` followed by the id zero-padded to six digits.
pub fn order_number(id: u64) -> String {
    format!("#{:06}", id)
}

/// `"{city} → {hub}"`, preferring the geocoded city and the first word of
/// the delivery center.
pub fn route(address: &RecentAddress) -> String {
    let city = [&address.google_maps_city, &address.city]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .find(|c| !c.is_empty())
        .unwrap_or("Unknown");
    let hub = address
        .nodal_delivery_center
        .as_deref()
        .and_then(|c| c.split(' ').next())
        .filter(|w| !w.is_empty())
        .unwrap_or("Center");
    format!("{} → {}", city, hub)
}

/// Creation date plus three days, formatted like `Oct 18, 2024`.
///
/// Returns `None` if `created_at` is not a recognised timestamp.
pub fn estimated_delivery(created_at: &str) -> Option<String> {
    let created = parse_timestamp(created_at)?;
    let due = created
        .date()
        .checked_add_days(Days::new(DELIVERY_ESTIMATE_DAYS))?;
    Some(due.format("%b %-d, %Y").to_string())
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> RecentAddress {
        RecentAddress {
            id: Some(42),
            street: Some("12 Elm St".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            pincode: Some("62701".to_string()),
            nodal_delivery_center: Some("North Hub".to_string()),
            created_at: Some("2024-10-15T10:00:00".to_string()),
            google_maps_city: None,
            google_maps_pincode: Some("62701".to_string()),
        }
    }

    #[test]
    fn test_status_serde_uses_display_names() {
        let json = serde_json::to_string(&DeliveryStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        let status: DeliveryStatus = serde_json::from_str("\"In Transit\"").unwrap();
        assert_eq!(status, DeliveryStatus::InTransit);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("in-transit".parse(), Ok(DeliveryStatus::InTransit));
        assert_eq!("Out for Delivery".parse(), Ok(DeliveryStatus::OutForDelivery));
        assert_eq!("DELIVERED".parse(), Ok(DeliveryStatus::Delivered));
        assert!("lost".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn test_initial_status_cycles() {
        assert_eq!(DeliveryStatus::initial_for_position(0), DeliveryStatus::InTransit);
        assert_eq!(DeliveryStatus::initial_for_position(1), DeliveryStatus::OutForDelivery);
        assert_eq!(DeliveryStatus::initial_for_position(2), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::initial_for_position(3), DeliveryStatus::InTransit);
    }

    #[test]
    fn test_project() {
        let view = ParcelView::project(1, &address(), ReferenceSource::GoogleMaps);
        assert_eq!(view.id, 42);
        assert_eq!(view.order_number, "#000042");
        assert_eq!(view.route, "Springfield → North");
        assert_eq!(view.estimated_delivery, "Oct 18, 2024");
        assert!(view.pincode_verified);
        assert_eq!(view.delivery_status(), DeliveryStatus::OutForDelivery);
    }

    #[test]
    fn test_project_fallbacks() {
        let address = RecentAddress::default();
        let view = ParcelView::project(4, &address, ReferenceSource::GoogleMaps);
        assert_eq!(view.id, 5);
        assert_eq!(view.route, "Unknown → Center");
        assert_eq!(view.estimated_delivery, NOT_AVAILABLE);
        assert!(!view.pincode_verified);
    }

    #[test]
    fn test_route_prefers_geocoded_city() {
        let mut a = address();
        a.google_maps_city = Some("Springfield City".to_string());
        assert_eq!(route(&a), "Springfield City → North");
        a.google_maps_city = Some(String::new());
        assert_eq!(route(&a), "Springfield → North");
    }

    #[test]
    fn test_estimated_delivery_formats() {
        assert_eq!(
            estimated_delivery("2024-12-30T08:15:00Z").as_deref(),
            Some("Jan 2, 2025")
        );
        assert_eq!(
            estimated_delivery("2024-03-01 09:30:00.123456").as_deref(),
            Some("Mar 4, 2024")
        );
        assert_eq!(
            estimated_delivery("Tue, 15 Oct 2024 10:00:00 +0000").as_deref(),
            Some("Oct 18, 2024")
        );
        assert_eq!(estimated_delivery("yesterday"), None);
    }
}
