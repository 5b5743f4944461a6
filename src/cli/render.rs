//! Plain-text rendering of sessions, parcels, and pincodes.

use crate::address::AddressRecord;
use crate::api::PincodeRecord;
use crate::camera::CameraDevice;
use crate::reconcile::{DashboardStats, ParcelView};

/// One line typed at the capture prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureInput {
    Capture,
    Reset,
    Devices,
    Switch(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_capture_input(line: &str) -> CaptureInput {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "" | "c" | "capture" => CaptureInput::Capture,
        "r" | "reset" => CaptureInput::Reset,
        "d" | "device" | "devices" if rest.is_empty() => CaptureInput::Devices,
        "d" | "device" | "devices" => CaptureInput::Switch(rest.to_string()),
        "h" | "help" | "?" => CaptureInput::Help,
        "q" | "quit" | "exit" => CaptureInput::Quit,
        _ => CaptureInput::Unknown(line.to_string()),
    }
}

pub const CAPTURE_HELP: &str = "Commands:
  <Enter>      capture the current frame
  r            reset the session
  d            list cameras
  d <ID>       switch camera
  q            quit";

pub fn format_device(device: &CameraDevice, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    format!("{} [{}] {}", marker, device.id, device.display_label())
}

/// Address block for the `index`-th captured parcel (1-based).
pub fn format_record(index: usize, record: &AddressRecord) -> String {
    format!(
        "Address {}\n  Street:   {}\n  City:     {}\n  State:    {}\n  Pincode:  {}\n  Delivery center: {}",
        index,
        record.street_or_placeholder(),
        record.city_or_placeholder(),
        record.state_or_placeholder(),
        record.pincode_or_placeholder(),
        record.center_or_placeholder()
    )
}

pub fn format_stats(stats: &DashboardStats) -> String {
    format!(
        "Total parcels:   {} ({:+}% from last month)\nIn transit:      {}\nDelivered:       {}\nWrong pincodes:  {}\nVoice addresses: {}",
        stats.total_parcels,
        stats.monthly_change,
        stats.in_transit,
        stats.delivered,
        stats.wrong_pincodes,
        stats.voice_addresses
    )
}

pub fn format_parcel(parcel: &ParcelView) -> String {
    let verification = if parcel.pincode_verified {
        "✓ Verified"
    } else {
        "✗ Mismatch"
    };
    format!(
        "Order {}  {}  [{}]\n  {}\n  Center: {}  ETA: {}  Pincode match: {}",
        parcel.order_number,
        parcel.route,
        parcel.delivery_status(),
        parcel.record.summary(),
        parcel.record.center_or_placeholder(),
        parcel.estimated_delivery,
        verification
    )
}

pub fn format_pincode(record: &PincodeRecord) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    format!(
        "{:<8} {:<28} {:<20} {:<20} {}",
        record.pincode,
        field(&record.office_name),
        field(&record.district),
        field(&record.state_name),
        field(&record.office_type)
    )
}

pub const PINCODE_HEADER: &str = "Pincode  Office                       District             State                Type";
