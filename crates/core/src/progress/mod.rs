pub mod acquisition;
pub mod duration_tracker;

use serde::{Deserialize, Serialize};

/// A `(current, total)` pair in a consistent unit: seconds of media for
/// transcription progress, estimated megabytes for model acquisition.
///
/// `total == 0` means the total is unknown and `current` is the only
/// meaningful signal. Consumers cannot (and should not) distinguish exact
/// from estimated samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSample {
    pub current: u64,
    pub total: u64,
}

impl ProgressSample {
    pub fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }

    /// Percentage in 0..=100, or `None` when the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        Some((self.current * 100 / self.total).min(100) as u8)
    }
}
