use std::path::Path;
use std::process::Command;

/// Query the media duration in seconds via ffprobe.
///
/// Best-effort: any failure (missing tool, unreadable file, unparsable
/// output) yields `None` and the caller degrades to placeholder progress
/// rather than failing the job.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output();

    let output = match output {
        Ok(out) if out.status.success() => out,
        Ok(out) => {
            log::warn!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            );
            return None;
        }
        Err(e) => {
            log::warn!("could not run ffprobe: {e}");
            return None;
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    match text.trim().parse::<f64>() {
        Ok(duration) if duration > 0.0 => Some(duration),
        _ => {
            log::warn!(
                "could not parse duration for {}: {:?}",
                path.display(),
                text.trim()
            );
            None
        }
    }
}
