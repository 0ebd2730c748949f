//! Visible text composition
//!
//! Library glyphs stay in the content stream after an overlay edit. To report
//! what a reader actually sees, glyphs painted over by any overlay entry are
//! dropped, and the text each entry drew is appended as its own block unless
//! a later entry whited it out.

use super::geometry::{BoundingBox, PageSpace};
use super::metrics::TextMeasurer;
use super::overlay::{DrawnLine, OverlayEntry};
use super::page_text::{raw_blocks, raw_words, PageText, RawBlock, RawWord, StextPage};

/// A drawn line in the page's current displayed space
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub bbox: BoundingBox,
    pub text: String,
    pub words: Vec<RawWord>,
}

/// An overlay entry moved into the page's current displayed space
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOverlay {
    pub whiteout: BoundingBox,
    pub area: BoundingBox,
    pub lines: Vec<PlacedLine>,
}

impl PlacedOverlay {
    /// Place `entry` on a page currently shown as `page`.
    ///
    /// Entries drawn before a later rotation keep covering the same part of
    /// the page; only their coordinates move.
    pub fn new(entry: &OverlayEntry, page: &PageSpace) -> Self {
        let frame = page.rotated(entry.rotation);
        let place = |b: &BoundingBox| frame.reframe(b, page);

        let lines = entry
            .lines
            .iter()
            .map(|line| PlacedLine {
                bbox: place(&entry.line_box(line)),
                text: line.text.clone(),
                words: line_words(entry, line)
                    .into_iter()
                    .map(|word| RawWord {
                        bbox: place(&word.bbox),
                        text: word.text,
                    })
                    .collect(),
            })
            .collect();

        Self {
            whiteout: place(&entry.whiteout),
            area: place(&entry.area),
            lines,
        }
    }

    /// Whether this entry paints over the point, either with white or with text
    pub fn covers(&self, x: f32, y: f32) -> bool {
        self.whiteout.contains_point(x, y)
            || self.lines.iter().any(|line| line.bbox.contains_point(x, y))
    }
}

/// Compose the page text snapshot the extractor works on.
pub fn visible_text(page: &StextPage, overlays: &[PlacedOverlay]) -> PageText {
    let covered = |x: f32, y: f32| overlays.iter().any(|overlay| overlay.covers(x, y));

    let mut blocks = raw_blocks(page, covered);
    let mut words = raw_words(page, covered);

    for (index, overlay) in overlays.iter().enumerate() {
        let later = &overlays[index + 1..];
        let lines: Vec<&PlacedLine> = overlay
            .lines
            .iter()
            .filter(|line| {
                let (cx, cy) = line.bbox.center();
                !later.iter().any(|e| e.whiteout.contains_point(cx, cy))
            })
            .collect();

        let boxes: Vec<BoundingBox> = lines.iter().map(|line| line.bbox).collect();
        let Some(drawn) = BoundingBox::union_all(boxes.iter()) else {
            continue;
        };
        // Intact entries keep the extent they replaced so they can be edited again
        let bbox = if lines.len() == overlay.lines.len() {
            drawn.union(&overlay.area)
        } else {
            drawn
        };

        let mut text = String::new();
        for line in &lines {
            text.push_str(&line.text);
            text.push('\n');
        }
        blocks.push(RawBlock { bbox, text });

        if let Ok(words) = words.as_mut() {
            for line in &lines {
                words.extend(line.words.iter().cloned());
            }
        }
    }

    PageText {
        width: page.width,
        height: page.height,
        blocks,
        words,
    }
}

/// Measure the words of a drawn line. Spaces are single since lines come from the wrapper.
fn line_words(entry: &OverlayEntry, line: &DrawnLine) -> Vec<RawWord> {
    let line_box = entry.line_box(line);
    let space = entry.font.width(" ", entry.size);
    let mut x = line.x;
    let mut words = Vec::new();

    for word in line.text.split(' ') {
        if !word.is_empty() {
            let width = entry.font.width(word, entry.size);
            words.push(RawWord {
                bbox: BoundingBox::new(x, line_box.y0, x + width, line_box.y1),
                text: word.to_string(),
            });
            x += width;
        }
        x += space;
    }

    words
}
