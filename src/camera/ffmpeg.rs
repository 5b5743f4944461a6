//! System camera backend driven by FFmpeg.
//!
//! Devices are discovered through AVFoundation (macOS) or video4linux
//! (Linux). An open stream is an FFmpeg child process writing raw RGB frames
//! to stdout; a reader thread keeps the latest one in a shared buffer.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use super::backend::{CameraBackend, StreamHandle};
use super::types::{CameraDevice, CameraError, CameraSettings, Frame, FrameFormat, Resolution};

/// How long an opening stream may take to deliver its first frame.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Keywords in FFmpeg output that indicate the OS refused camera access.
const PERMISSION_KEYWORDS: &[&str] = &["permission", "denied", "not authorized", "authorization"];

/// Camera backend that shells out to FFmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    program: String,
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific FFmpeg binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[cfg(target_os = "macos")]
    fn enumerate(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let output = Command::new(&self.program)
            .args(["-f", "avfoundation", "-list_devices", "true", "-i", ""])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| spawn_error(&e))?;

        // FFmpeg writes the device list to stderr
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(parse_avfoundation_devices(&stderr))
    }

    #[cfg(target_os = "linux")]
    fn enumerate(&self) -> Result<Vec<CameraDevice>, CameraError> {
        list_v4l2_devices(Path::new("/sys/class/video4linux"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn enumerate(&self) -> Result<Vec<CameraDevice>, CameraError> {
        Err(CameraError::DeviceEnumeration(
            "the FFmpeg camera backend supports macOS and Linux only".to_string(),
        ))
    }
}

impl CameraBackend for FfmpegCamera {
    type Stream = FfmpegStream;

    fn list_devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        self.enumerate()
    }

    async fn open(
        &self,
        device: &CameraDevice,
        settings: &CameraSettings,
    ) -> Result<FfmpegStream, CameraError> {
        let args = stream_args(device, settings);
        log::debug!("Spawning {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| open_error(device, &self.program, &e))?;

        let stderr_lines = Arc::new(Mutex::new(Vec::new()));
        let stderr_thread = child.stderr.take().map(|stderr| {
            let lines = Arc::clone(&stderr_lines);
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines() {
                    match line {
                        Ok(l) => {
                            log::debug!("[ffmpeg] {}", l);
                            if let Ok(mut buf) = lines.lock() {
                                buf.push(l);
                            }
                        }
                        Err(_) => break,
                    }
                }
            })
        });

        let stdout = child.stdout.take().ok_or_else(|| CameraError::DeviceAccess {
            device: device.id.clone(),
            reason: "FFmpeg stdout unavailable".to_string(),
        })?;

        let buffer = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();
        let reader = spawn_reader(
            stdout,
            settings.resolution,
            Arc::clone(&buffer),
            Arc::clone(&stop),
            ready_tx,
        );

        let mut stream = FfmpegStream {
            child,
            buffer,
            stop,
            reader: Some(reader),
            stderr_thread,
            released: false,
        };

        let failure = match tokio::time::timeout(OPEN_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => return Ok(stream),
            Ok(Ok(Err(reason))) => reason,
            Ok(Err(_)) => "capture thread terminated unexpectedly".to_string(),
            Err(_) => format!("no frame received within {}s", OPEN_TIMEOUT.as_secs()),
        };

        stream.release();
        let stderr = stderr_lines
            .lock()
            .map(|lines| lines.join("\n"))
            .unwrap_or_default();
        Err(classify_open_failure(&device.id, &failure, &stderr))
    }
}

/// A running FFmpeg capture process.
pub struct FfmpegStream {
    child: Child,
    buffer: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
    released: bool,
}

impl std::fmt::Debug for FfmpegStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegStream")
            .field("pid", &self.child.id())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl StreamHandle for FfmpegStream {
    fn latest_frame(&self) -> Option<Frame> {
        let buffer = self.buffer.lock().ok()?;
        buffer.clone()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stop.store(true, Ordering::SeqCst);

        // Killing the process closes stdout, which unblocks the reader
        let _ = self.child.kill();
        let _ = self.child.wait();

        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
        if let Ok(mut buf) = self.buffer.lock() {
            *buf = None;
        }
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn spawn_reader(
    mut stdout: ChildStdout,
    size: Resolution,
    buffer: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<(), String>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let frame_len = size.width as usize * size.height as usize * 3;
        let mut ready = Some(ready);
        let mut chunk = vec![0u8; frame_len];

        while !stop.load(Ordering::Relaxed) {
            match stdout.read_exact(&mut chunk) {
                Ok(()) => {
                    if let Ok(mut buf) = buffer.lock() {
                        *buf = Some(Frame {
                            data: chunk.clone(),
                            width: size.width,
                            height: size.height,
                            format: FrameFormat::Rgb,
                            timestamp: Instant::now(),
                        });
                    }
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }
                }
                Err(e) => {
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(format!("stream ended before first frame: {}", e)));
                    }
                    break;
                }
            }
        }
    })
}

fn spawn_error(e: &std::io::Error) -> CameraError {
    if e.kind() == std::io::ErrorKind::NotFound {
        CameraError::FfmpegNotFound
    } else {
        CameraError::DeviceEnumeration(format!("Failed to run ffmpeg: {}", e))
    }
}

fn open_error(device: &CameraDevice, program: &str, e: &std::io::Error) -> CameraError {
    let reason = match e.kind() {
        std::io::ErrorKind::NotFound => return CameraError::FfmpegNotFound,
        std::io::ErrorKind::PermissionDenied => format!("permission denied running {}", program),
        _ => format!("failed to run {}: {}", program, e),
    };
    CameraError::DeviceAccess {
        device: device.id.clone(),
        reason,
    }
}

/// Build the FFmpeg arguments that stream raw RGB frames from `device`.
pub fn stream_args(device: &CameraDevice, settings: &CameraSettings) -> Vec<String> {
    let size = format!(
        "{}x{}",
        settings.resolution.width, settings.resolution.height
    );
    let scale = format!(
        "scale={}:{}",
        settings.resolution.width, settings.resolution.height
    );

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

    if cfg!(target_os = "macos") {
        args.extend([
            "-f".to_string(),
            "avfoundation".to_string(),
            "-framerate".to_string(),
            settings.fps.to_string(),
            "-video_size".to_string(),
            size,
            "-i".to_string(),
            format!("{}:none", device.id),
        ]);
    } else {
        args.extend([
            "-f".to_string(),
            "v4l2".to_string(),
            "-framerate".to_string(),
            settings.fps.to_string(),
            "-video_size".to_string(),
            size,
            "-i".to_string(),
            device.id.clone(),
        ]);
    }

    args.extend([
        "-vf".to_string(),
        scale,
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-".to_string(),
    ]);
    args
}

fn classify_open_failure(device: &str, failure: &str, stderr: &str) -> CameraError {
    let combined = format!("{}\n{}", failure, stderr).to_lowercase();
    let reason = if PERMISSION_KEYWORDS.iter().any(|k| combined.contains(k)) {
        "permission denied".to_string()
    } else {
        match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(last) => format!("{} ({})", failure, last.trim()),
            None => failure.to_string(),
        }
    };
    CameraError::DeviceAccess {
        device: device.to_string(),
        reason,
    }
}

/// Parse video devices out of FFmpeg's AVFoundation listing.
///
/// Screen-capture pseudo devices are skipped.
pub fn parse_avfoundation_devices(stderr: &str) -> Vec<CameraDevice> {
    let mut devices = Vec::new();
    let mut in_video_section = false;

    for line in stderr.lines() {
        if line.contains("AVFoundation video devices:") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices:") {
            in_video_section = false;
            continue;
        }
        if !in_video_section {
            continue;
        }
        if let Some((index, name)) = parse_device_line(line) {
            if !name.starts_with("Capture screen") {
                devices.push(CameraDevice::new(index.to_string(), name));
            }
        }
    }

    devices
}

/// Parse `[AVFoundation indev @ 0x...] [index] device name`.
fn parse_device_line(line: &str) -> Option<(usize, String)> {
    let bracket_idx = line.find("] [")?;
    let after_bracket = &line[bracket_idx + 3..];

    let close_bracket = after_bracket.find(']')?;
    let index: usize = after_bracket[..close_bracket].parse().ok()?;

    let name = after_bracket.get(close_bracket + 1..)?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some((index, name))
}

/// Enumerate `/dev/videoN` devices from sysfs.
pub fn list_v4l2_devices(sysfs: &Path) -> Result<Vec<CameraDevice>, CameraError> {
    let entries = match std::fs::read_dir(sysfs) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CameraError::DeviceEnumeration(e.to_string())),
    };

    let mut devices: Vec<CameraDevice> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().into_owned();
            if !node.starts_with("video") {
                return None;
            }
            let label = std::fs::read_to_string(entry.path().join("name"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            Some(CameraDevice::new(format!("/dev/{}", node), label))
        })
        .collect();

    devices.sort_by_key(|d| video_index(&d.id));
    Ok(devices)
}

fn video_index(id: &str) -> u32 {
    id.trim_start_matches("/dev/video").parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_avfoundation_devices_skips_audio_and_screens() {
        let stderr = r#"
[AVFoundation indev @ 0x123] AVFoundation video devices:
[AVFoundation indev @ 0x123] [0] FaceTime HD Camera
[AVFoundation indev @ 0x123] [1] Capture screen 0
[AVFoundation indev @ 0x123] [2] USB Document Camera
[AVFoundation indev @ 0x123] AVFoundation audio devices:
[AVFoundation indev @ 0x123] [0] MacBook Pro Microphone
"#;
        let devices = parse_avfoundation_devices(stderr);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0], CameraDevice::new("0", "FaceTime HD Camera"));
        assert_eq!(devices[1], CameraDevice::new("2", "USB Document Camera"));
    }

    #[test]
    fn test_parse_device_line_invalid() {
        assert!(parse_device_line("Some random line without device info").is_none());
        assert!(parse_device_line("[AVFoundation indev @ 0x1] [x] Bad index").is_none());
    }

    #[test]
    fn test_list_v4l2_devices_reads_sysfs_names() {
        let dir = tempfile::tempdir().unwrap();
        for (node, name) in [("video2", "USB Camera"), ("video0", "Integrated Webcam")] {
            let path = dir.path().join(node);
            std::fs::create_dir(&path).unwrap();
            std::fs::write(path.join("name"), format!("{}\n", name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("v4l-subdev0")).unwrap();

        let devices = list_v4l2_devices(dir.path()).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0], CameraDevice::new("/dev/video0", "Integrated Webcam"));
        assert_eq!(devices[1], CameraDevice::new("/dev/video2", "USB Camera"));
    }

    #[test]
    fn test_list_v4l2_missing_sysfs_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let devices = list_v4l2_devices(&dir.path().join("missing")).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_stream_args_emit_raw_rgb() {
        let device = CameraDevice::new("/dev/video0", "Cam");
        let args = stream_args(&device, &CameraSettings::default());
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-video_size", "1280x720"]));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_classify_permission_failure() {
        let err = classify_open_failure(
            "0",
            "stream ended before first frame",
            "Failed to create AV capture input device: Permission denied",
        );
        assert_eq!(
            err,
            CameraError::DeviceAccess {
                device: "0".to_string(),
                reason: "permission denied".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_binary_is_ffmpeg_not_found() {
        let camera = FfmpegCamera::with_program("definitely-not-ffmpeg-xyz");
        let device = CameraDevice::new("/dev/video0", "Cam");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(camera.open(&device, &CameraSettings::default()))
            .unwrap_err();
        assert_eq!(err, CameraError::FfmpegNotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_unrunnable_binary_is_device_access() {
        let not_executable = tempfile::NamedTempFile::new().unwrap();
        let camera = FfmpegCamera::with_program(not_executable.path().display().to_string());
        let device = CameraDevice::new("/dev/video0", "Cam");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(camera.open(&device, &CameraSettings::default()))
            .unwrap_err();
        match err {
            CameraError::DeviceAccess { device, .. } => assert_eq!(device, "/dev/video0"),
            other => panic!("expected DeviceAccess, got {:?}", other),
        }
    }
}
