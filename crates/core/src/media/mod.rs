pub mod extract;
pub mod probe;

use std::path::Path;
use std::process::Command;
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::shared::constants::{
    AUDIO_EXTENSIONS, TEMP_DIR_PREFIX, VIDEO_EXTENSIONS, WHISPER_SAMPLE_RATE,
};

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("ffmpeg is not installed or not on PATH")]
    FfmpegMissing,
    #[error("audio extraction failed for {path}: {detail}")]
    Extract { path: String, detail: String },
    #[error("failed to create temp directory: {0}")]
    TempDir(#[source] std::io::Error),
}

/// Coarse classification of an input by its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Classify a path by extension, case-insensitively. `None` means the file
/// is not a supported media type and should be skipped with a warning.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// True when `path` is a WAV file already in the engine's native format
/// (mono, 16 kHz), so it can be decoded directly without an ffmpeg
/// normalization step.
pub fn is_ready_wav(path: &Path) -> bool {
    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            spec.channels == 1 && spec.sample_rate == WHISPER_SAMPLE_RATE
        }
        Err(_) => false,
    }
}

/// Verify the ffmpeg executable is reachable.
pub fn ensure_ffmpeg() -> Result<(), MediaError> {
    let available = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if available {
        Ok(())
    } else {
        Err(MediaError::FfmpegMissing)
    }
}

/// Extracted-audio dirs older than this are assumed to belong to a worker
/// that was force-killed mid-file.
const STALE_TEMP_AGE: Duration = Duration::from_secs(3600);

/// Remove leftover extraction directories from previous runs.
///
/// Forced cancellation kills the worker process outright, so the in-flight
/// file's temp directory never runs its own cleanup. Sweeping the temp root
/// on the next start makes that cleanup independently recoverable. Only
/// directories carrying our prefix and older than [`STALE_TEMP_AGE`] are
/// touched; a concurrently running job keeps its fresh directories.
pub fn sweep_stale_temp() {
    sweep_stale_temp_in(&std::env::temp_dir());
}

fn sweep_stale_temp_in(root: &Path) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    let now = SystemTime::now();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(TEMP_DIR_PREFIX))
            .unwrap_or(false);
        if !is_ours || !path.is_dir() {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .map(|age| age > STALE_TEMP_AGE)
            .unwrap_or(false);
        if stale {
            log::debug!("Sweeping stale temp dir: {}", path.display());
            let _ = std::fs::remove_dir_all(&path);
        }
    }
}
