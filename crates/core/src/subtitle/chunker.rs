/// Shortest chunk worth displaying on its own subtitle line.
pub const DEFAULT_MIN_CHARS: usize = 4;

/// Split `text` into display-sized chunks of at most `max_chars` characters.
///
/// Lengths are counted in Unicode scalar values, not bytes. A trailing
/// remainder shorter than `min_chars` is merged onto the previous chunk
/// (which may then exceed `max_chars`) rather than flashing a tiny line on
/// screen. The concatenation of the returned chunks always equals `text`.
pub fn split_text(text: &str, max_chars: usize, min_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for ch in text.chars() {
        current.push(ch);
        current_len += 1;
        if current_len >= max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        if current_len < min_chars && !chunks.is_empty() {
            // Too short to stand alone: fold into the previous chunk.
            let last = chunks.last_mut().unwrap();
            last.push_str(&current);
        } else {
            chunks.push(current);
        }
    }

    chunks
}
