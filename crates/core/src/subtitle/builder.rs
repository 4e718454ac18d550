use crate::progress::duration_tracker::DurationTracker;
use crate::progress::ProgressSample;
use crate::recognition::domain::segment::RecognizedSegment;
use crate::subtitle::chunker::{split_text, DEFAULT_MIN_CHARS};
use crate::subtitle::entry::SubtitleEntry;
use crate::subtitle::timestamp::TimestampError;

/// The finished subtitle document for one input file.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleDocument {
    pub content: String,
    pub entry_count: usize,
}

impl SubtitleDocument {
    /// A fully silent input yields zero entries. That is success, not an error.
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Turns a stream of recognized segments into a rendered SRT document.
///
/// Each segment's text is trimmed, chunked to `max_chars`, and its time span
/// distributed evenly across the chunks, so the sub-entries partition the
/// segment exactly. Indices run 1..N across the whole document.
pub struct SubtitleBuilder {
    max_chars: usize,
}

impl SubtitleBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Consume `segments` once, advancing `tracker` per segment and emitting
    /// every produced [`ProgressSample`] through `on_progress`.
    pub fn build<I>(
        &self,
        segments: I,
        tracker: &mut DurationTracker,
        on_progress: &mut dyn FnMut(ProgressSample),
    ) -> Result<SubtitleDocument, TimestampError>
    where
        I: IntoIterator<Item = RecognizedSegment>,
    {
        let mut blocks = Vec::new();
        let mut next_index = 1usize;

        for segment in segments {
            if let Some(sample) = tracker.advance(segment.end) {
                on_progress(sample);
            }

            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }

            let chunks = split_text(text, self.max_chars, DEFAULT_MIN_CHARS);
            let per_chunk = segment.duration() / chunks.len() as f64;

            for (i, chunk) in chunks.into_iter().enumerate() {
                let entry = SubtitleEntry {
                    index: next_index,
                    start: segment.start + i as f64 * per_chunk,
                    end: segment.start + (i + 1) as f64 * per_chunk,
                    text: chunk,
                };
                blocks.push(entry.render()?);
                next_index += 1;
            }
        }

        if let Some(sample) = tracker.finish() {
            on_progress(sample);
        }

        let mut content = blocks.join("\n\n");
        if !content.is_empty() {
            content.push('\n');
        }

        Ok(SubtitleDocument {
            content,
            entry_count: next_index - 1,
        })
    }
}
