//! Board of parcels with optimistic status updates.

use crate::api::{ApiError, StatusConfirmer};

use super::parcel::{DeliveryStatus, ParcelView};

/// Errors from board operations.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Parcel {0} is not on the board")]
    UnknownParcel(u64),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// An applied but unconfirmed status change.
///
/// Holds the value to restore if confirmation fails. Becomes stale once the
/// board is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pending update must be confirmed or it stays unconfirmed"]
pub struct PendingStatusUpdate {
    pub parcel_id: u64,
    pub previous: DeliveryStatus,
    pub applied: DeliveryStatus,
    generation: u64,
}

/// What `confirm` did with a pending update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Confirmation succeeded; the new status stays
    Kept,
    /// Confirmation failed; the previous status is back
    RolledBack,
    /// Confirmation failed, but a later update already replaced the status
    Superseded,
    /// The board was refreshed after the update was applied
    Stale,
}

/// The parcels currently shown, replaced wholesale on every refresh.
#[derive(Debug, Default)]
pub struct ParcelBoard {
    parcels: Vec<ParcelView>,
    generation: u64,
    last_error: Option<String>,
}

impl ParcelBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parcels(&self) -> &[ParcelView] {
        &self.parcels
    }

    pub fn get(&self, parcel_id: u64) -> Option<&ParcelView> {
        self.parcels.iter().find(|p| p.id == parcel_id)
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Incremented on every refresh.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Message of the most recent failed confirmation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace every parcel with a fresh projection. Outstanding pending
    /// updates become stale.
    pub fn replace(&mut self, parcels: Vec<ParcelView>) {
        self.parcels = parcels;
        self.generation += 1;
        self.last_error = None;
        log::debug!(
            "Board refreshed: {} parcels (generation {})",
            self.parcels.len(),
            self.generation
        );
    }

    /// Set a parcel's status immediately, before it is confirmed.
    ///
    /// Returns `Ok(None)` when the parcel already has `status`.
    pub fn apply_status_update(
        &mut self,
        parcel_id: u64,
        status: DeliveryStatus,
    ) -> Result<Option<PendingStatusUpdate>, ReconcileError> {
        let parcel = self
            .parcels
            .iter_mut()
            .find(|p| p.id == parcel_id)
            .ok_or(ReconcileError::UnknownParcel(parcel_id))?;

        if parcel.delivery_status == status {
            return Ok(None);
        }

        let previous = parcel.delivery_status;
        parcel.delivery_status = status;
        log::info!("Parcel {}: {} -> {} (unconfirmed)", parcel_id, previous, status);

        Ok(Some(PendingStatusUpdate {
            parcel_id,
            previous,
            applied: status,
            generation: self.generation,
        }))
    }

    /// Settle a pending update with the confirmation result.
    ///
    /// On failure the previous status is restored, unless a later update
    /// has already replaced the one being confirmed.
    pub fn confirm(
        &mut self,
        pending: PendingStatusUpdate,
        outcome: Result<(), ApiError>,
    ) -> ConfirmOutcome {
        if pending.generation != self.generation {
            log::debug!(
                "Ignoring confirmation for parcel {}: board was refreshed",
                pending.parcel_id
            );
            return ConfirmOutcome::Stale;
        }
        let Some(parcel) = self.parcels.iter_mut().find(|p| p.id == pending.parcel_id) else {
            return ConfirmOutcome::Stale;
        };

        match outcome {
            Ok(()) => ConfirmOutcome::Kept,
            Err(e) => {
                log::warn!("Status update for parcel {} failed: {}", pending.parcel_id, e);
                self.last_error = Some(e.to_string());
                if parcel.delivery_status == pending.applied {
                    parcel.delivery_status = pending.previous;
                    ConfirmOutcome::RolledBack
                } else {
                    ConfirmOutcome::Superseded
                }
            }
        }
    }

    /// Apply `status` and confirm it through `confirmer`.
    ///
    /// Returns `Ok(None)` when the parcel already had `status`.
    pub async fn update_status<C: StatusConfirmer>(
        &mut self,
        parcel_id: u64,
        status: DeliveryStatus,
        confirmer: &C,
    ) -> Result<Option<ConfirmOutcome>, ReconcileError> {
        let Some(pending) = self.apply_status_update(parcel_id, status)? else {
            return Ok(None);
        };
        let result = confirmer.confirm_status(parcel_id, status).await;
        Ok(Some(self.confirm(pending, result)))
    }
}
