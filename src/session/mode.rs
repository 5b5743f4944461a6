use std::fmt;

use serde::{Deserialize, Serialize};

/// How many addresses a session collects before it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// One parcel per session
    #[default]
    Single,
    /// Three parcels per session
    Batch,
}

impl CaptureMode {
    pub fn quota(self) -> usize {
        match self {
            CaptureMode::Single => 1,
            CaptureMode::Batch => 3,
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Single => f.write_str("single"),
            CaptureMode::Batch => f.write_str("batch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota() {
        assert_eq!(CaptureMode::Single.quota(), 1);
        assert_eq!(CaptureMode::Batch.quota(), 3);
        assert_eq!(CaptureMode::default(), CaptureMode::Single);
    }

    #[test]
    fn test_serde_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: CaptureMode,
        }
        let w: Wrapper = toml::from_str("mode = \"batch\"").unwrap();
        assert_eq!(w.mode, CaptureMode::Batch);
    }
}
