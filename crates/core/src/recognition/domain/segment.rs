/// A time-bounded span of recognized speech, as produced by the engine.
///
/// Consumed exactly once per transcription run and never persisted. The
/// text may be empty or whitespace-only; such segments are discarded by the
/// subtitle builder.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RecognizedSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
