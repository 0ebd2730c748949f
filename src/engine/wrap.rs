//! Greedy word wrapping over a measurement oracle

use super::metrics::TextMeasurer;

/// Wrap `text` into lines no wider than `max_width` at `size` points.
///
/// Explicit newlines split paragraphs; each paragraph has its whitespace
/// collapsed and is wrapped on its own. Empty paragraphs keep a blank line.
/// A word wider than `max_width` is placed alone on its own line.
pub fn wrap<M>(text: &str, max_width: f32, size: f32, measurer: &M) -> Vec<String>
where
    M: TextMeasurer + ?Sized,
{
    if text.trim().is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate = format!("{} {}", current, word);
            if measurer.width(&candidate, size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}
