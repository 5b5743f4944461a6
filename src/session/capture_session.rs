//! Capture session - drives N capture attempts against the recognition backend.

use crate::address::AddressRecord;
use crate::api::{ApiError, RecognitionBackend};
use crate::camera::{
    CameraBackend, CameraError, EncodedImage, FrameCapturer, StreamController, StreamToken,
};

use super::attempt::{CaptureAttempt, InvalidTransition};
use super::mode::CaptureMode;

/// Aggregate state of a session, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// An attempt is waiting on the backend
    Capturing,
    /// Carries the human-readable error message
    Error(String),
    Complete,
}

/// Which layer produced the visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Camera or stream failure; does not block new captures
    Device,
    /// Backend failure; blocks captures until `reset`
    Backend,
}

/// Why a capture request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("A capture is already waiting on the backend")]
    InFlight,

    #[error("All {0} addresses have been captured")]
    QuotaReached(usize),

    #[error("The session has an error; reset it to capture again")]
    Blocked,
}

/// Errors from the session's entry points.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Backend(#[from] ApiError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// What `resolve` did with a backend outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Succeeded,
    Failed,
    /// The ticket no longer matched the in-flight attempt or its stream
    Discarded,
}

/// Proof of admission for one in-flight attempt.
///
/// Returned by [`CaptureSession::begin_capture`] and handed back to
/// [`CaptureSession::resolve`] with the backend's answer.
#[derive(Debug, Clone)]
pub struct CaptureTicket {
    id: u64,
    attempt_index: usize,
    token: StreamToken,
    image: EncodedImage,
}

impl CaptureTicket {
    pub fn attempt_index(&self) -> usize {
        self.attempt_index
    }

    /// Stream the frame was captured from.
    pub fn token(&self) -> StreamToken {
        self.token
    }

    /// The encoded frame to send to the backend.
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket_id: u64,
    attempt_index: usize,
    token: StreamToken,
}

#[derive(Debug, Clone)]
struct VisibleError {
    kind: ErrorKind,
    message: String,
}

/// Orchestrates the capture attempts of one session.
///
/// At most one attempt is in flight. Results are kept in capture order and
/// survive a later failure; only `reset` clears them.
#[derive(Debug)]
pub struct CaptureSession {
    mode: CaptureMode,
    capturer: FrameCapturer,
    attempts: Vec<CaptureAttempt>,
    results: Vec<AddressRecord>,
    in_flight: Option<InFlight>,
    error: Option<VisibleError>,
    next_ticket: u64,
}

impl CaptureSession {
    pub fn new(mode: CaptureMode) -> Self {
        Self::with_capturer(mode, FrameCapturer::default())
    }

    pub fn with_capturer(mode: CaptureMode, capturer: FrameCapturer) -> Self {
        Self {
            mode,
            capturer,
            attempts: Vec::new(),
            results: Vec::new(),
            in_flight: None,
            error: None,
            next_ticket: 1,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Switch between single and batch mode. Starts a fresh session.
    pub fn set_mode(&mut self, mode: CaptureMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn quota(&self) -> usize {
        self.mode.quota()
    }

    pub fn attempts(&self) -> &[CaptureAttempt] {
        &self.attempts
    }

    /// Recognised addresses in capture order.
    pub fn results(&self) -> &[AddressRecord] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.is_some() {
            SessionState::Capturing
        } else if let Some(error) = &self.error {
            SessionState::Error(error.message.clone())
        } else if self.results.len() >= self.quota() {
            SessionState::Complete
        } else {
            SessionState::Idle
        }
    }

    /// Whether a capture request would be admitted right now.
    pub fn can_capture(&self) -> bool {
        self.admit().is_ok()
    }

    /// `"{n}/{N} addresses captured"`.
    pub fn progress_text(&self) -> String {
        format!("{}/{} addresses captured", self.results.len(), self.quota())
    }

    /// Delivery centers of all results, joined by `", "`.
    pub fn centers_summary(&self) -> String {
        self.results
            .iter()
            .map(|r| r.center_or_placeholder())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn admit(&self) -> Result<(), Rejection> {
        if self.in_flight.is_some() {
            return Err(Rejection::InFlight);
        }
        if self.error_kind() == Some(ErrorKind::Backend) {
            return Err(Rejection::Blocked);
        }
        if self.attempts.len() >= self.quota() {
            return Err(Rejection::QuotaReached(self.quota()));
        }
        Ok(())
    }

    /// Admit a capture, take one frame, and mark a new attempt Sent.
    ///
    /// # Errors
    /// * `SessionError::Rejected` - nothing changed; the session is busy,
    ///   complete, or blocked by a backend error
    /// * `SessionError::Camera` - no frame could be taken; the error becomes
    ///   visible but no attempt is recorded
    pub fn begin_capture<B: CameraBackend>(
        &mut self,
        stream: &StreamController<B>,
    ) -> Result<CaptureTicket, SessionError> {
        self.admit()?;

        let captured = self.capturer.capture(stream).and_then(|image| {
            let token = stream.token().ok_or(CameraError::NoActiveStream)?;
            Ok((image, token))
        });
        let (image, token) = match captured {
            Ok(captured) => captured,
            Err(e) => {
                log::warn!("Capture failed: {}", e);
                self.error = Some(VisibleError {
                    kind: ErrorKind::Device,
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let index = self.attempts.len();
        let mut attempt = CaptureAttempt::new(index, token);
        attempt.mark_sent(image.clone())?;
        self.attempts.push(attempt);
        self.error = None;

        let ticket_id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(InFlight {
            ticket_id,
            attempt_index: index,
            token,
        });
        log::info!(
            "Attempt {}/{} sent from {}",
            index + 1,
            self.quota(),
            token
        );

        Ok(CaptureTicket {
            id: ticket_id,
            attempt_index: index,
            token,
            image,
        })
    }

    /// Apply the backend's answer for `ticket`.
    ///
    /// The answer is discarded, and the attempt removed without a terminal
    /// transition, when the ticket is no longer the in-flight one or
    /// `current_token` differs from the stream the frame came from.
    pub fn resolve(
        &mut self,
        ticket: CaptureTicket,
        outcome: Result<AddressRecord, ApiError>,
        current_token: Option<StreamToken>,
    ) -> ResolveOutcome {
        let flight = match self.in_flight {
            Some(flight) if flight.ticket_id == ticket.id => flight,
            _ => {
                log::debug!(
                    "Discarding answer for attempt {}: no longer in flight",
                    ticket.attempt_index
                );
                return ResolveOutcome::Discarded;
            }
        };

        if current_token != Some(flight.token) {
            log::info!(
                "Discarding answer for attempt {}: stream changed since capture",
                flight.attempt_index
            );
            self.discard_in_flight();
            return ResolveOutcome::Discarded;
        }

        self.in_flight = None;
        let Some(attempt) = self.attempts.get_mut(flight.attempt_index) else {
            return ResolveOutcome::Discarded;
        };

        match outcome {
            Ok(record) => {
                if let Err(e) = attempt.mark_succeeded() {
                    log::warn!("{}", e);
                    return ResolveOutcome::Discarded;
                }
                log::info!(
                    "Attempt {} recognised: {}",
                    flight.attempt_index + 1,
                    record.summary()
                );
                self.results.push(record);
                ResolveOutcome::Succeeded
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("Attempt {} failed: {}", flight.attempt_index + 1, message);
                if let Err(e) = attempt.mark_failed(message.clone()) {
                    log::warn!("{}", e);
                    return ResolveOutcome::Discarded;
                }
                self.error = Some(VisibleError {
                    kind: ErrorKind::Backend,
                    message,
                });
                ResolveOutcome::Failed
            }
        }
    }

    /// Capture a frame, send it to `backend`, and apply the answer.
    ///
    /// A request that is not admitted is a no-op. Failures are reflected in
    /// the returned state rather than returned as errors.
    pub async fn request_capture<B, R>(
        &mut self,
        stream: &StreamController<B>,
        backend: &R,
    ) -> SessionState
    where
        B: CameraBackend,
        R: RecognitionBackend,
    {
        let ticket = match self.begin_capture(stream) {
            Ok(ticket) => ticket,
            Err(e) => {
                log::debug!("Capture request not admitted: {}", e);
                return self.state();
            }
        };

        let outcome = backend.recognize(ticket.image()).await;
        self.resolve(ticket, outcome, stream.token());
        self.state()
    }

    /// React to the stream being reopened, switched, or closed.
    ///
    /// An attempt captured from a different stream is discarded, and a
    /// device error is cleared once a stream is open again.
    pub fn sync_stream(&mut self, current_token: Option<StreamToken>) {
        if let Some(flight) = self.in_flight {
            if current_token != Some(flight.token) {
                log::info!(
                    "Stream changed while attempt {} was in flight; discarding it",
                    flight.attempt_index
                );
                self.discard_in_flight();
            }
        }
        if current_token.is_some() && self.error_kind() == Some(ErrorKind::Device) {
            self.error = None;
        }
    }

    /// Forget all attempts, results, and errors.
    pub fn reset(&mut self) {
        self.attempts.clear();
        self.results.clear();
        self.in_flight = None;
        self.error = None;
        log::debug!("Capture session reset ({} mode)", self.mode);
    }

    fn discard_in_flight(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            if flight.attempt_index < self.attempts.len() {
                self.attempts.remove(flight.attempt_index);
            }
        }
    }
}
