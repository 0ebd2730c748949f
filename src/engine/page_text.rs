//! Page text snapshots
//!
//! The PDF library hands us characters grouped into blocks and lines. This
//! module turns that snapshot into the raw `(bbox, text)` blocks and words the
//! extractor consumes, dropping characters that are visually covered.

use super::geometry::BoundingBox;

/// One glyph with its box in page space
#[derive(Debug, Clone, PartialEq)]
pub struct StextChar {
    pub c: char,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StextLine {
    pub chars: Vec<StextChar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StextBlock {
    /// Block bounds as reported by the library
    pub bbox: BoundingBox,
    pub lines: Vec<StextLine>,
}

/// Library segmentation of a single page
#[derive(Debug, Clone, PartialEq)]
pub struct StextPage {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<StextBlock>,
}

/// Block-level text tuple, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub bbox: BoundingBox,
    /// Unstripped text, one `\n` after every line
    pub text: String,
}

/// Page-level word tuple
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub bbox: BoundingBox,
    pub text: String,
}

/// Everything the extractor needs from one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<RawBlock>,
    /// Page words, or the reason word extraction failed
    pub words: Result<Vec<RawWord>, String>,
}

fn is_hidden<F>(ch: &StextChar, hidden: &F) -> bool
where
    F: Fn(f32, f32) -> bool,
{
    let (cx, cy) = ch.bbox.center();
    hidden(cx, cy)
}

/// Build raw blocks from a snapshot, skipping characters `hidden` reports as covered.
///
/// A block that lost characters gets its box recomputed from what remains.
pub fn raw_blocks<F>(page: &StextPage, hidden: F) -> Vec<RawBlock>
where
    F: Fn(f32, f32) -> bool,
{
    page.blocks
        .iter()
        .map(|block| {
            let mut text = String::new();
            let mut visible_boxes = Vec::new();
            let mut dropped = false;

            for line in &block.lines {
                let mut shown = false;
                for ch in &line.chars {
                    if is_hidden(ch, &hidden) {
                        dropped = true;
                        continue;
                    }
                    text.push(ch.c);
                    visible_boxes.push(ch.bbox);
                    shown = true;
                }
                // A line hidden entirely leaves no trace in the text
                if shown || line.chars.is_empty() {
                    text.push('\n');
                }
            }

            let bbox = if dropped {
                // Empty remainder collapses to a degenerate box and is skipped later
                BoundingBox::union_all(visible_boxes.iter())
                    .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
            } else {
                block.bbox
            };

            RawBlock { bbox, text }
        })
        .collect()
}

fn is_finite(b: &BoundingBox) -> bool {
    [b.x0, b.y0, b.x1, b.y1].iter().all(|v| v.is_finite())
}

/// Split every line into whitespace-separated words.
///
/// Fails when a visible glyph has no usable geometry, since words could not
/// be ordered or matched to blocks.
pub fn raw_words<F>(page: &StextPage, hidden: F) -> Result<Vec<RawWord>, String>
where
    F: Fn(f32, f32) -> bool,
{
    let mut words = Vec::new();

    for line in page.blocks.iter().flat_map(|b| b.lines.iter()) {
        let mut text = String::new();
        let mut bbox: Option<BoundingBox> = None;

        for ch in &line.chars {
            if !ch.c.is_whitespace() && !is_finite(&ch.bbox) {
                return Err(format!("glyph {:?} has non-finite bounds {}", ch.c, ch.bbox));
            }
            if ch.c.is_whitespace() || is_hidden(ch, &hidden) {
                if let Some(b) = bbox.take() {
                    words.push(RawWord {
                        bbox: b,
                        text: std::mem::take(&mut text),
                    });
                }
                continue;
            }
            text.push(ch.c);
            bbox = Some(bbox.map_or(ch.bbox, |b| b.union(&ch.bbox)));
        }

        if let Some(b) = bbox {
            words.push(RawWord { bbox: b, text });
        }
    }

    Ok(words)
}
