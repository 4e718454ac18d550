use crate::subtitle::timestamp::{format_timestamp, TimestampError};

/// One numbered, timed subtitle line in the output document.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleEntry {
    /// 1-based, strictly increasing across the whole document, no gaps.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleEntry {
    /// Render the entry as its SRT block: index line, time-range line,
    /// text line. The inter-entry blank line is added by the builder.
    pub fn render(&self) -> Result<String, TimestampError> {
        Ok(format!(
            "{}\n{} --> {}\n{}",
            self.index,
            format_timestamp(self.start)?,
            format_timestamp(self.end)?,
            self.text
        ))
    }
}
