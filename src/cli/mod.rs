//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, rendering, and subcommand handlers.

mod args;
mod commands;
mod render;

pub use args::{Args, Command, ConfigAction, PincodeAction};
pub use commands::{
    capture, ctrlc_received, dashboard, handle_config_action, list_cameras, list_pincodes,
    load_config, search_pincodes, setup_ctrlc_handler, update_status, CaptureOptions,
    CommandError,
};
pub use render::{parse_capture_input, CaptureInput};
