//! Overlay edit planning
//!
//! An overlay edit never removes glyphs. It covers a region with an opaque
//! white rectangle and draws replacement lines on top. Planning is pure:
//! the result is an [`OverlayEntry`] that the writer turns into content
//! operators and records in the page ledger.

use super::error::{EngineError, Result};
use super::geometry::BoundingBox;
use super::metrics::{StandardFont, TextMeasurer, LINE_ASCENT, LINE_DESCENT};
use super::wrap::wrap;

/// Explicit edit parameters passed into every overlay edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditConfig {
    pub font: StandardFont,
    /// Default size for block edits, in points
    pub font_size: f32,
    pub block_padding: f32,
    pub word_padding: f32,
    pub line_spacing: f32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            font: StandardFont::Helvetica,
            font_size: 11.0,
            block_padding: 1.0,
            word_padding: 2.0,
            line_spacing: 1.2,
        }
    }
}

/// One line of replacement text, left edge and baseline in page space
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnLine {
    pub x: f32,
    pub baseline: f32,
    pub text: String,
}

/// A single white-out and redraw
///
/// Coordinates are in the displayed space of the page at edit time, which
/// `rotation` records.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayEntry {
    pub whiteout: BoundingBox,
    /// Box the edit targeted; the drawn text is reported with this extent
    pub area: BoundingBox,
    pub font: StandardFont,
    pub size: f32,
    pub lines: Vec<DrawnLine>,
    pub rotation: u16,
}

impl OverlayEntry {
    /// Box covered by a drawn line, from descent to ascent
    pub fn line_box(&self, line: &DrawnLine) -> BoundingBox {
        BoundingBox::new(
            line.x,
            line.baseline - LINE_DESCENT * self.size,
            line.x + self.font.width(&line.text, self.size),
            line.baseline + LINE_ASCENT * self.size,
        )
    }
}

/// Plan a block edit: white-out the padded box, then wrap and draw top-down.
///
/// Lines whose baseline would fall below the inner box are dropped.
pub fn plan_block_edit(
    block_box: &BoundingBox,
    new_text: &str,
    config: &EditConfig,
) -> Result<OverlayEntry> {
    if !block_box.is_valid() {
        return Err(EngineError::InvalidGeometry(*block_box));
    }

    let size = config.font_size;
    let mut entry = OverlayEntry {
        whiteout: block_box.expand(config.block_padding),
        area: *block_box,
        font: config.font,
        size,
        lines: Vec::new(),
        rotation: 0,
    };

    if new_text.trim().is_empty() {
        return Ok(entry);
    }

    let shrunk = block_box.shrink(config.block_padding);
    let inner = if shrunk.is_valid() { shrunk } else { *block_box };

    let step = size * config.line_spacing;
    let mut baseline = inner.y1 - size;

    for text in wrap(new_text, inner.width(), size, &config.font) {
        if baseline < inner.y0 {
            break;
        }
        entry.lines.push(DrawnLine {
            x: inner.x0,
            baseline,
            text,
        });
        baseline -= step;
    }

    Ok(entry)
}

/// Plan a word edit: white-out and a single unwrapped line on the box bottom.
///
/// Without an explicit `size`, 80% of the box height is used, never below 8pt.
pub fn plan_word_edit(
    word_box: &BoundingBox,
    new_text: &str,
    size: Option<f32>,
    config: &EditConfig,
) -> Result<OverlayEntry> {
    if !word_box.is_valid() {
        return Err(EngineError::InvalidGeometry(*word_box));
    }

    let size = size.unwrap_or_else(|| (word_box.height() * 0.8).max(8.0));
    let mut entry = OverlayEntry {
        whiteout: word_box.expand(config.word_padding),
        area: *word_box,
        font: config.font,
        size,
        lines: Vec::new(),
        rotation: 0,
    };

    let text = new_text.trim();
    if !text.is_empty() {
        entry.lines.push(DrawnLine {
            x: word_box.x0,
            baseline: word_box.y0,
            text: text.to_string(),
        });
    }

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_box_is_rejected() {
        let flat = BoundingBox::new(10.0, 10.0, 10.0, 20.0);
        let config = EditConfig::default();
        assert!(matches!(
            plan_block_edit(&flat, "x", &config),
            Err(EngineError::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan_word_edit(&flat, "x", None, &config),
            Err(EngineError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_blank_text_only_whites_out() {
        let b = BoundingBox::new(100.0, 700.0, 200.0, 720.0);
        let entry = plan_block_edit(&b, "  \n ", &EditConfig::default()).unwrap();
        assert!(entry.lines.is_empty());
        assert_eq!(entry.whiteout, BoundingBox::new(99.0, 699.0, 201.0, 721.0));
    }

    #[test]
    fn test_block_lines_step_down_from_top() {
        let b = BoundingBox::new(100.0, 600.0, 400.0, 720.0);
        let config = EditConfig::default();
        let entry = plan_block_edit(&b, "one\ntwo\nthree", &config).unwrap();
        assert_eq!(entry.lines.len(), 3);
        assert_eq!(entry.lines[0].x, 101.0);
        assert!((entry.lines[0].baseline - (719.0 - 11.0)).abs() < 1e-4);
        assert!((entry.lines[0].baseline - entry.lines[1].baseline - 13.2).abs() < 1e-4);
        assert_eq!(entry.lines[2].text, "three");
    }

    #[test]
    fn test_overflowing_lines_are_truncated() {
        // Room for exactly two baselines: 730-1-11 = 718 and 704.8, next 691.6 < 700
        let b = BoundingBox::new(100.0, 699.0, 400.0, 730.0);
        let entry = plan_block_edit(&b, "a\nb\nc\nd", &EditConfig::default()).unwrap();
        let texts: Vec<&str> = entry.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_tiny_box_falls_back_to_unshrunk() {
        let b = BoundingBox::new(100.0, 700.0, 101.5, 720.0);
        let entry = plan_block_edit(&b, "x", &EditConfig::default()).unwrap();
        assert_eq!(entry.lines[0].x, 100.0);
    }

    #[test]
    fn test_word_size_inference() {
        let config = EditConfig::default();
        let tall = BoundingBox::new(10.0, 10.0, 40.0, 30.0);
        let inferred = plan_word_edit(&tall, "w", None, &config).unwrap().size;
        assert!((inferred - 16.0).abs() < 1e-4);
        let short = BoundingBox::new(10.0, 10.0, 40.0, 15.0);
        assert_eq!(plan_word_edit(&short, "w", None, &config).unwrap().size, 8.0);
        assert_eq!(plan_word_edit(&short, "w", Some(20.0), &config).unwrap().size, 20.0);
    }

    #[test]
    fn test_word_draws_trimmed_text_on_bottom() {
        let b = BoundingBox::new(10.0, 10.0, 40.0, 22.0);
        let entry = plan_word_edit(&b, "  new  ", None, &EditConfig::default()).unwrap();
        assert_eq!(entry.whiteout, BoundingBox::new(8.0, 8.0, 42.0, 24.0));
        assert_eq!(
            entry.lines,
            vec![DrawnLine {
                x: 10.0,
                baseline: 10.0,
                text: "new".to_string()
            }]
        );
    }

    #[test]
    fn test_entries_keep_the_targeted_area() {
        let config = EditConfig::default();
        let block = BoundingBox::new(100.0, 700.0, 155.0, 714.0);
        let entry = plan_block_edit(&block, "Edited", &config).unwrap();
        assert_eq!(entry.area, block);
        // The drawn line is shorter than the block it replaces
        assert!(entry.line_box(&entry.lines[0]).height() < block.height());

        let word = BoundingBox::new(10.0, 10.0, 40.0, 22.0);
        assert_eq!(plan_word_edit(&word, "w", None, &config).unwrap().area, word);
    }
}
