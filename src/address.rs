//! Address records returned by the recognition backend.

use serde::{Deserialize, Serialize};

/// Placeholder rendered for any missing field.
pub const NOT_AVAILABLE: &str = "Not available";

/// A recognised address plus the delivery center assigned to it.
///
/// Records are immutable once created; a new capture produces a new record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressRecord {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub nodal_delivery_center: String,
}

impl AddressRecord {
    pub fn street_or_placeholder(&self) -> &str {
        or_placeholder(self.street.as_deref())
    }

    pub fn city_or_placeholder(&self) -> &str {
        or_placeholder(self.city.as_deref())
    }

    pub fn state_or_placeholder(&self) -> &str {
        or_placeholder(self.state.as_deref())
    }

    pub fn pincode_or_placeholder(&self) -> &str {
        or_placeholder(self.pincode.as_deref())
    }

    pub fn center_or_placeholder(&self) -> &str {
        or_placeholder(Some(self.nodal_delivery_center.as_str()))
    }

    /// One-line summary: `street, city, state pincode`.
    pub fn summary(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.street_or_placeholder(),
            self.city_or_placeholder(),
            self.state_or_placeholder(),
            self.pincode_or_placeholder()
        )
    }
}

/// Render an optional field, treating blank strings as missing.
pub fn or_placeholder(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}
