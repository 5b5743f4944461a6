//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::DEFAULT_PINCODES_PER_PAGE;
use crate::reconcile::DeliveryStatus;

/// Capture parcel addresses with a camera and track their delivery
#[derive(Parser, Debug)]
#[command(name = "parcel-scan")]
#[command(version, about = "Capture parcel addresses with a camera and track deliveries", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Capture one parcel with the first camera
    parcel-scan capture

    # Capture three parcels in a row
    parcel-scan capture --batch --device /dev/video2

    # Watch the dashboard, refreshing every 5 minutes
    parcel-scan dashboard --watch

    # Mark parcel 42 as delivered
    parcel-scan status 42 delivered")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config and PARCEL_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras {
        /// List the simulated camera instead of system devices
        #[arg(long)]
        simulated: bool,
    },
    /// Photograph parcels and recognise their addresses
    Capture {
        /// Capture three parcels instead of one
        #[arg(long)]
        batch: bool,
        /// Camera device id (from list-cameras)
        #[arg(long)]
        device: Option<String>,
        /// Use a synthetic camera instead of a real device
        #[arg(long)]
        simulated: bool,
        /// JPEG quality (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Mirror frames horizontally
        #[arg(long)]
        mirror: bool,
    },
    /// Show parcel statistics and recent parcels
    Dashboard {
        /// Keep refreshing until Ctrl+C
        #[arg(long)]
        watch: bool,
        /// Refresh interval in seconds (with --watch)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Change a parcel's delivery status
    Status {
        /// Parcel id
        id: u64,
        /// in-transit, out-for-delivery, or delivered
        status: DeliveryStatus,
    },
    /// Browse the pincode directory
    Pincodes {
        #[command(subcommand)]
        action: Option<PincodeAction>,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Entries per page
        #[arg(long, default_value_t = DEFAULT_PINCODES_PER_PAGE)]
        per_page: u32,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PincodeAction {
    /// Search by pincode, office name, or district
    Search {
        query: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
