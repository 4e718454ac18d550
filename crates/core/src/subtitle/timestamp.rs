use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TimestampError {
    #[error("timestamp must be non-negative, got {0}")]
    Negative(f64),
}

/// Slack added before truncating to whole milliseconds. Decimal fractions
/// like 3725.123 are not exactly representable in binary, so the product
/// `seconds * 1000.0` can land a hair below the intended millisecond.
const MS_SLACK: f64 = 1e-4;

/// Format a second offset as an SRT time code: `HH:MM:SS,mmm`.
///
/// Hours are unbounded (no wrap at 24); minutes, seconds, and milliseconds
/// are zero-padded. Sub-millisecond digits are truncated, not rounded.
pub fn format_timestamp(seconds: f64) -> Result<String, TimestampError> {
    if seconds < 0.0 {
        return Err(TimestampError::Negative(seconds));
    }

    let total_ms = (seconds * 1000.0 + MS_SLACK) as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    Ok(format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}"))
}
