//! Camera device enumeration.

use super::backend::CameraBackend;
use super::types::{CameraDevice, CameraError};

/// List all camera devices a backend exposes.
///
/// If no cameras are found, returns an empty vector (not an error).
pub fn list_devices<B: CameraBackend>(backend: &B) -> Result<Vec<CameraDevice>, CameraError> {
    let devices = backend.list_devices()?;
    log::debug!("Enumerated {} camera device(s)", devices.len());
    Ok(devices)
}

/// The selectable device set for one capture session.
///
/// Queried once; the set does not change afterwards.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<CameraDevice>,
}

impl DeviceRegistry {
    /// Query the backend once and freeze the result.
    pub fn query<B: CameraBackend>(backend: &B) -> Result<Self, CameraError> {
        Ok(Self {
            devices: list_devices(backend)?,
        })
    }

    /// Query the backend, falling back to an empty registry when the platform
    /// refuses enumeration. The error is returned alongside so callers can
    /// show a no-camera state.
    pub fn query_or_empty<B: CameraBackend>(backend: &B) -> (Self, Option<CameraError>) {
        match Self::query(backend) {
            Ok(registry) => (registry, None),
            Err(e) => {
                log::warn!("Camera enumeration failed: {}", e);
                (Self::default(), Some(e))
            }
        }
    }

    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device selected when the operator has not picked one.
    pub fn default_device(&self) -> Option<&CameraDevice> {
        self.devices.first()
    }

    /// Look a device up by id.
    pub fn find(&self, id: &str) -> Result<&CameraDevice, CameraError> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CameraError::DeviceNotFound(id.to_string()))
    }

    /// Whether a device picker is worth showing.
    pub fn has_choice(&self) -> bool {
        self.devices.len() > 1
    }
}
