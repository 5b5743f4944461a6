//! Capture sessions: quotas, in-flight tracking, and result accumulation.

pub mod attempt;
pub mod capture_session;
pub mod mode;

pub use attempt::{AttemptStatus, CaptureAttempt, InvalidTransition};
pub use capture_session::{
    CaptureSession, CaptureTicket, ErrorKind, Rejection, ResolveOutcome, SessionError,
    SessionState,
};
pub use mode::CaptureMode;
