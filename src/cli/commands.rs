//! Subcommand handlers.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use super::args::{Args, ConfigAction};
use super::render::{
    format_device, format_parcel, format_pincode, format_record, format_stats,
    parse_capture_input, CaptureInput, CAPTURE_HELP, PINCODE_HEADER,
};
use crate::api::{ApiClient, ApiError};
use crate::camera::{
    CameraBackend, CameraError, DeviceRegistry, FfmpegCamera, SimulatedCamera, StreamController,
};
use crate::config::{self, Config, ConfigError};
use crate::reconcile::{
    fetch_and_reconcile, ConfirmOutcome, DeliveryStatus, ParcelBoard, ReconcileError,
};
use crate::session::{CaptureMode, CaptureSession, SessionState};

/// Errors surfaced by subcommands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("No cameras found. Make sure a camera is connected and permissions are granted")]
    NoCamera,

    #[error("Status update failed: {0}")]
    StatusRejected(String),

    #[error("Failed to set up Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Check if Ctrl+C was received.
pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

async fn wait_for_ctrlc() {
    while !ctrlc_received() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Sleep for `duration`. Returns `true` if Ctrl+C arrived first.
async fn sleep_unless_stopped(duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = wait_for_ctrlc() => true,
    }
}

/// Drive `work` to completion unless `stop` resolves first.
async fn until_stopped<F, S>(work: F, stop: S) -> Option<F::Output>
where
    F: Future,
    S: Future<Output = ()>,
{
    tokio::select! {
        output = work => Some(output),
        _ = stop => None,
    }
}

/// Effective configuration: file, then environment, then CLI flags.
pub fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();
    if let Some(url) = &args.api_url {
        config.backend.base_url = url.clone();
    }
    Ok(config)
}

/// List available cameras and print them to stdout.
pub fn list_cameras(simulated: bool) -> Result<(), CommandError> {
    if simulated {
        print_devices(&SimulatedCamera::with_default_device())
    } else {
        print_devices(&FfmpegCamera::new())
    }
}

fn print_devices<B: CameraBackend>(backend: &B) -> Result<(), CommandError> {
    let registry = DeviceRegistry::query(backend)?;
    if registry.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
        return Ok(());
    }

    println!("Available cameras:");
    for (i, device) in registry.devices().iter().enumerate() {
        println!("{}", format_device(device, i == 0));
    }
    println!();
    println!("Use --device <ID> to select a camera.");
    Ok(())
}

/// Options of the `capture` subcommand.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub batch: bool,
    pub device: Option<String>,
    pub simulated: bool,
    pub quality: Option<u8>,
    pub mirror: bool,
}

/// Run an interactive capture session.
pub async fn capture(config: &Config, options: CaptureOptions) -> Result<(), CommandError> {
    let mut config = config.clone();
    if let Some(quality) = options.quality {
        config.capture.jpeg_quality = quality;
    }
    if options.mirror {
        config.camera.mirror = true;
    }
    let mode = if options.batch {
        CaptureMode::Batch
    } else {
        config.capture.mode
    };
    let device = options.device.or_else(|| config.camera.device.clone());
    let client = ApiClient::new(config.client_config())?;

    if options.simulated {
        run_capture(SimulatedCamera::with_default_device(), &config, &client, mode, device).await
    } else {
        run_capture(FfmpegCamera::new(), &config, &client, mode, device).await
    }
}

async fn run_capture<B: CameraBackend>(
    camera: B,
    config: &Config,
    client: &ApiClient,
    mode: CaptureMode,
    device: Option<String>,
) -> Result<(), CommandError> {
    let (registry, enumeration_error) = DeviceRegistry::query_or_empty(&camera);
    if let Some(e) = enumeration_error {
        eprintln!("Warning: {}", e);
    }
    let selected = match device {
        Some(id) => registry.find(&id)?.clone(),
        None => registry
            .default_device()
            .cloned()
            .ok_or(CommandError::NoCamera)?,
    };

    let mut stream = StreamController::new(camera, config.camera_settings());
    stream.open(&selected).await?;
    println!("Camera: {}", selected.display_label());

    let mut session = CaptureSession::with_capturer(mode, config.frame_capturer());
    println!(
        "{} mode: capture {} address(es). Backend: {}",
        mode,
        session.quota(),
        client.base_url()
    );
    println!("{}", CAPTURE_HELP);

    let mut lines = spawn_stdin_reader();
    loop {
        print!("[{}] > ", session.progress_text());
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = wait_for_ctrlc() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_capture_input(&line) {
            CaptureInput::Capture => {
                if !session.can_capture() {
                    explain_blocked(&session);
                    continue;
                }
                println!("Processing...");
                match until_stopped(session.request_capture(&stream, client), wait_for_ctrlc())
                    .await
                {
                    Some(state) => report_state(&session, &state),
                    None => break,
                }
            }
            CaptureInput::Reset => {
                session.reset();
                println!("Session reset.");
            }
            CaptureInput::Devices => {
                let current = stream.device().map(|d| d.id.clone());
                for device in registry.devices() {
                    let selected = current.as_deref() == Some(device.id.as_str());
                    println!("{}", format_device(device, selected));
                }
            }
            CaptureInput::Switch(id) => {
                let target = match registry.find(&id) {
                    Ok(device) => device.clone(),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        continue;
                    }
                };
                match stream.open(&target).await {
                    Ok(_) => println!("Switched to {}", target.display_label()),
                    Err(e) => eprintln!("Error: {}", e),
                }
                session.sync_stream(stream.token());
            }
            CaptureInput::Help => println!("{}", CAPTURE_HELP),
            CaptureInput::Quit => break,
            CaptureInput::Unknown(input) => {
                println!("Unknown command '{}'. Type 'h' for help.", input)
            }
        }
    }

    stream.close();
    Ok(())
}

/// Read stdin lines on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.clone()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn explain_blocked(session: &CaptureSession) {
    match session.state() {
        SessionState::Complete => {
            println!("All addresses captured. Type 'r' to start a new session.")
        }
        SessionState::Error(message) => {
            println!("Error: {}. Type 'r' to reset and try again.", message)
        }
        SessionState::Capturing => println!("Still processing the previous capture."),
        SessionState::Idle => {}
    }
}

fn report_state(session: &CaptureSession, state: &SessionState) {
    match state {
        SessionState::Error(message) => eprintln!("Error: {}", message),
        SessionState::Idle | SessionState::Complete => {
            if let Some(record) = session.results().last() {
                println!("{}", format_record(session.results().len(), record));
            }
            if *state == SessionState::Complete {
                println!();
                println!("All addresses captured successfully!");
                println!("Delivery centers: {}", session.centers_summary());
            }
        }
        SessionState::Capturing => {}
    }
}

/// Fetch and print the dashboard, optionally refreshing until Ctrl+C.
pub async fn dashboard(
    config: &Config,
    watch: bool,
    interval: Option<u64>,
) -> Result<(), CommandError> {
    let client = ApiClient::new(config.client_config())?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.refresh_interval());
    let mut board = ParcelBoard::new();

    loop {
        match fetch_and_reconcile(&client, config.dashboard.reference).await {
            Ok(snapshot) => {
                board.replace(snapshot.parcels);
                println!("{}", format_stats(&snapshot.stats));
                println!();
                if board.is_empty() {
                    println!("No recent parcels.");
                }
                for parcel in board.parcels() {
                    println!("{}", format_parcel(parcel));
                }
            }
            Err(e) if watch => eprintln!("Error: {}", e),
            Err(e) => return Err(e.into()),
        }

        if !watch {
            return Ok(());
        }
        println!(
            "\nRefreshing in {}s (Ctrl+C to stop)...\n",
            interval.as_secs()
        );
        if sleep_unless_stopped(interval).await {
            return Ok(());
        }
    }
}

/// Change a parcel's status and confirm it with the backend.
pub async fn update_status(
    config: &Config,
    parcel_id: u64,
    status: DeliveryStatus,
) -> Result<(), CommandError> {
    let client = ApiClient::new(config.client_config())?;
    let snapshot = fetch_and_reconcile(&client, config.dashboard.reference).await?;
    let mut board = ParcelBoard::new();
    board.replace(snapshot.parcels);

    let previous = board
        .get(parcel_id)
        .map(|p| p.delivery_status())
        .ok_or(ReconcileError::UnknownParcel(parcel_id))?;

    match board.update_status(parcel_id, status, &client).await? {
        None => println!("Parcel {} is already {}.", parcel_id, status),
        Some(ConfirmOutcome::Kept) => {
            println!("Parcel {}: {} → {}", parcel_id, previous, status)
        }
        Some(outcome) => {
            let reason = board
                .last_error()
                .unwrap_or("status update was not confirmed")
                .to_string();
            log::debug!("Status update outcome: {:?}", outcome);
            return Err(CommandError::StatusRejected(reason));
        }
    }
    Ok(())
}

/// Print one page of the pincode directory.
pub async fn list_pincodes(config: &Config, page: u32, per_page: u32) -> Result<(), CommandError> {
    let client = ApiClient::new(config.client_config())?;
    let result = client.pincodes(page, per_page).await?;

    println!("{}", PINCODE_HEADER);
    for record in &result.data {
        println!("{}", format_pincode(record));
    }
    match (result.total, result.total_pages) {
        (Some(total), Some(pages)) => {
            println!("\nPage {} of {} ({} entries)", page, pages, total)
        }
        (Some(total), None) => println!("\nPage {} ({} entries)", page, total),
        _ => println!("\nPage {}", page),
    }
    Ok(())
}

/// Search the pincode directory.
pub async fn search_pincodes(config: &Config, query: &str) -> Result<(), CommandError> {
    let client = ApiClient::new(config.client_config())?;
    let results = client.search_pincodes(query).await?;

    if results.is_empty() {
        println!("No pincodes match '{}'.", query);
        return Ok(());
    }
    println!("{}", PINCODE_HEADER);
    for record in &results {
        println!("{}", format_pincode(record));
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    path: Option<&Path>,
) -> Result<(), CommandError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            println!("Current configuration:\n");
            println!("{}", config.to_toml()?);
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            config::write_default(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressRecord;
    use crate::api::RecognitionBackend;
    use crate::camera::{CameraDevice, CameraSettings, EncodedImage, Resolution};

    /// Backend that never answers.
    struct SilentBackend;

    impl RecognitionBackend for SilentBackend {
        async fn recognize(&self, _image: &EncodedImage) -> Result<AddressRecord, ApiError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_until_stopped_returns_output_when_work_finishes() {
        let output = until_stopped(async { 7 }, std::future::pending()).await;
        assert_eq!(output, Some(7));
    }

    #[tokio::test]
    async fn test_until_stopped_abandons_pending_work() {
        let output = until_stopped(std::future::pending::<u8>(), async {}).await;
        assert_eq!(output, None);
    }

    #[tokio::test]
    async fn test_stop_during_unanswered_capture_releases_stream() {
        let camera = SimulatedCamera::with_default_device();
        let settings = CameraSettings {
            resolution: Resolution { width: 16, height: 16 },
            fps: 30,
        };
        let mut stream = StreamController::new(camera.clone(), settings);
        stream
            .open(&CameraDevice::new("sim0", "Simulated Camera"))
            .await
            .unwrap();
        let mut session = CaptureSession::new(CaptureMode::Single);

        let stop = tokio::time::sleep(Duration::from_millis(20));
        let state = until_stopped(session.request_capture(&stream, &SilentBackend), stop).await;
        assert!(state.is_none());
        assert_eq!(camera.live_streams(), 1);

        stream.close();
        assert_eq!(camera.live_streams(), 0);
    }
}
