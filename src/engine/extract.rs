//! Text-map extraction and word association

use std::cmp::Ordering;

use tracing::warn;

use super::geometry::BoundingBox;
use super::page_text::{PageText, RawWord};
use super::types::{TextBlock, Word, WordExtraction};

/// Outward margin applied to a block box when collecting its words
pub const WORD_MARGIN: f32 = 2.0;

/// Turn a page snapshot into text blocks.
///
/// Blocks whose stripped text is empty or whose box is degenerate are
/// skipped without consuming an id. Emitted blocks keep library order.
pub fn extract_blocks(page: &PageText, page_number: usize) -> Vec<TextBlock> {
    let mut blocks = Vec::new();

    for raw in &page.blocks {
        let text = raw.text.trim_end();
        if text.is_empty() || !raw.bbox.is_valid() {
            continue;
        }

        let id = format!("page-{}-block-{}", page_number, blocks.len() + 1);
        let words = match &page.words {
            Ok(all) => {
                WordExtraction::from_words(words_for_block(all, &raw.bbox, &id, WORD_MARGIN))
            }
            Err(reason) => {
                warn!(
                    "Word extraction failed for {} on page {}: {}",
                    id, page_number, reason
                );
                WordExtraction::Failed(reason.clone())
            }
        };

        blocks.push(TextBlock {
            id,
            page_number,
            bbox: raw.bbox,
            text: text.to_string(),
            words,
        });
    }

    blocks
}

/// Collect the page words whose centres fall inside `block_box` grown by `margin`.
///
/// Words are ordered by ascending raw `(y0, x0)` and numbered from 1.
pub fn words_for_block(
    all_words: &[RawWord],
    block_box: &BoundingBox,
    block_id: &str,
    margin: f32,
) -> Vec<Word> {
    let area = block_box.expand(margin);

    let mut included: Vec<&RawWord> = all_words
        .iter()
        .filter(|w| !w.text.is_empty() && w.bbox.is_valid())
        .filter(|w| {
            let (cx, cy) = w.bbox.center();
            area.contains_point(cx, cy)
        })
        .collect();

    included.sort_by(|a, b| {
        a.bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    included
        .into_iter()
        .enumerate()
        .map(|(i, w)| Word {
            id: format!("{}-word-{}", block_id, i + 1),
            text: w.text.clone(),
            bbox: w.bbox,
            block_id: block_id.to_string(),
        })
        .collect()
}
