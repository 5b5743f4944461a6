//! Per-capture bookkeeping.

use std::fmt;

use crate::camera::{EncodedImage, StreamToken};

/// Where a single capture attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Sent,
    Succeeded,
    Failed,
}

impl AttemptStatus {
    /// Whether the attempt has a final outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Succeeded | AttemptStatus::Failed)
    }

    fn can_move_to(self, next: AttemptStatus) -> bool {
        matches!(
            (self, next),
            (AttemptStatus::Pending, AttemptStatus::Sent)
                | (AttemptStatus::Sent, AttemptStatus::Succeeded)
                | (AttemptStatus::Sent, AttemptStatus::Failed)
        )
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Sent => "sent",
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An attempt was asked to move along an edge the lifecycle does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Capture attempt {index} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub index: usize,
    pub from: AttemptStatus,
    pub to: AttemptStatus,
}

/// One capture: frame taken, sent to the backend, resolved.
///
/// Moves `Pending -> Sent` once, then `Sent -> Succeeded | Failed` once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureAttempt {
    index: usize,
    status: AttemptStatus,
    token: StreamToken,
    image: Option<EncodedImage>,
    error: Option<String>,
}

impl CaptureAttempt {
    pub(crate) fn new(index: usize, token: StreamToken) -> Self {
        Self {
            index,
            status: AttemptStatus::Pending,
            token,
            image: None,
            error: None,
        }
    }

    /// Zero-based position in capture order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    /// Stream the frame was taken from.
    pub fn token(&self) -> StreamToken {
        self.token
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn advance(&mut self, to: AttemptStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_move_to(to) {
            return Err(InvalidTransition {
                index: self.index,
                from: self.status,
                to,
            });
        }
        log::debug!("Attempt {}: {} -> {}", self.index, self.status, to);
        self.status = to;
        Ok(())
    }

    pub(crate) fn mark_sent(&mut self, image: EncodedImage) -> Result<(), InvalidTransition> {
        self.advance(AttemptStatus::Sent)?;
        self.image = Some(image);
        Ok(())
    }

    pub(crate) fn mark_succeeded(&mut self) -> Result<(), InvalidTransition> {
        self.advance(AttemptStatus::Succeeded)
    }

    pub(crate) fn mark_failed(&mut self, message: String) -> Result<(), InvalidTransition> {
        self.advance(AttemptStatus::Failed)?;
        self.error = Some(message);
        Ok(())
    }
}
