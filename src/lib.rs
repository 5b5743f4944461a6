//! parcel-scan library crate.
//!
//! Camera capture, backend recognition, and parcel reconciliation, exposed
//! for the binary and for integration testing.

pub mod address;
pub mod api;
pub mod camera;
pub mod cli;
pub mod config;
pub mod reconcile;
pub mod session;
