use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::media::MediaError;
use crate::shared::constants::{TEMP_DIR_PREFIX, WHISPER_SAMPLE_RATE};

/// A mono 16 kHz PCM WAV extracted into a temp directory.
///
/// The directory (and the WAV inside it) is removed when this value is
/// dropped, which covers the normal per-file path. A force-killed worker
/// skips the drop; those leftovers are reclaimed by
/// [`sweep_stale_temp`](crate::media::sweep_stale_temp) on the next start.
pub struct ExtractedAudio {
    wav_path: PathBuf,
    _dir: TempDir,
}

impl ExtractedAudio {
    pub fn path(&self) -> &Path {
        &self.wav_path
    }
}

/// Extract (or transcode) the audio track of `input` to mono 16 kHz PCM WAV.
pub fn extract_audio(input: &Path) -> Result<ExtractedAudio, MediaError> {
    let dir = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir()
        .map_err(MediaError::TempDir)?;
    let wav_path = dir.path().join("extracted_audio.wav");

    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le"])
        .args(["-ar", &WHISPER_SAMPLE_RATE.to_string()])
        .args(["-ac", "1", "-y"])
        .arg(&wav_path)
        .output()
        .map_err(|_| MediaError::FfmpegMissing)?;

    if !output.status.success() {
        return Err(MediaError::Extract {
            path: input.display().to_string(),
            detail: String::from_utf8_lossy(&output.stderr)
                .lines()
                .last()
                .unwrap_or("unknown ffmpeg error")
                .to_string(),
        });
    }

    Ok(ExtractedAudio {
        wav_path,
        _dir: dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ensure_ffmpeg;

    #[test]
    fn test_extract_unreadable_input_is_per_file_error() {
        if ensure_ffmpeg().is_err() {
            return; // ffmpeg not installed in this environment
        }
        let result = extract_audio(Path::new("/nonexistent/movie.mp4"));
        assert!(matches!(result, Err(MediaError::Extract { .. })));
    }

    #[test]
    fn test_temp_dir_carries_sweep_prefix() {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .unwrap();
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_DIR_PREFIX));
    }

    #[test]
    fn test_extracted_audio_cleans_up_on_drop() {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .unwrap();
        let wav_path = dir.path().join("extracted_audio.wav");
        std::fs::write(&wav_path, b"fake wav").unwrap();
        let root = dir.path().to_path_buf();
        let extracted = ExtractedAudio {
            wav_path,
            _dir: dir,
        };
        assert!(extracted.path().exists());
        drop(extracted);
        assert!(!root.exists());
    }
}
