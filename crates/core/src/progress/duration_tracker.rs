use crate::progress::ProgressSample;

/// Maps transcription advancement onto a bounded progress scale whose
/// ceiling is the known total media duration.
///
/// Progress moves in whole seconds: a sample is emitted only when the
/// floored segment end passes the floored last-reported position, and
/// [`finish`](DurationTracker::finish) closes any remaining gap so the
/// reported value always reaches the total exactly once per file.
pub struct DurationTracker {
    total_duration: f64,
    last_position: f64,
}

impl DurationTracker {
    /// `total_duration` comes from the external media probe. When the probe
    /// failed (`None`), the total degrades to a 1-second placeholder so the
    /// job still runs with coarse progress instead of failing.
    pub fn new(total_duration: Option<f64>) -> Self {
        Self {
            total_duration: total_duration.unwrap_or(1.0),
            last_position: 0.0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total_duration as u64
    }

    /// Record that transcription has reached `position` seconds.
    pub fn advance(&mut self, position: f64) -> Option<ProgressSample> {
        let delta = position.floor() - self.last_position.floor();
        if delta <= 0.0 {
            return None;
        }
        let sample = ProgressSample::new(
            (self.last_position.floor() + delta) as u64,
            self.total(),
        );
        self.last_position = position;
        Some(sample)
    }

    /// Emit the gap-closing sample at stream end, if any progress remains.
    pub fn finish(&mut self) -> Option<ProgressSample> {
        let remaining = self.total_duration.floor() - self.last_position.floor();
        if remaining <= 0.0 {
            return None;
        }
        self.last_position = self.total_duration;
        Some(ProgressSample::new(self.total(), self.total()))
    }
}
