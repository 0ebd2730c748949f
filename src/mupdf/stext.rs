//! Structured text collection

use mupdf::{Page, Quad, Rect, TextPageOptions};

use crate::engine::error::Result;
use crate::engine::geometry::BoundingBox;
use crate::engine::page_text::{StextBlock, StextChar, StextLine, StextPage};

/// Maps MuPDF's top-left coordinates into bottom-left page space
#[derive(Debug, Clone, Copy)]
struct Flip {
    left: f32,
    bottom: f32,
}

impl Flip {
    fn new(bounds: &Rect) -> Self {
        Self {
            left: bounds.x0,
            bottom: bounds.y1,
        }
    }

    fn rect(&self, r: &Rect) -> BoundingBox {
        BoundingBox::new(
            r.x0 - self.left,
            self.bottom - r.y1,
            r.x1 - self.left,
            self.bottom - r.y0,
        )
    }

    /// Bounds of all four corners, so glyphs on rotated pages keep their extent
    fn quad(&self, q: &Quad) -> BoundingBox {
        let xs = [q.ul.x, q.ur.x, q.ll.x, q.lr.x];
        let ys = [q.ul.y, q.ur.y, q.ll.y, q.lr.y];
        let min = |v: [f32; 4]| v.into_iter().fold(f32::INFINITY, f32::min);
        let max = |v: [f32; 4]| v.into_iter().fold(f32::NEG_INFINITY, f32::max);
        BoundingBox::new(
            min(xs) - self.left,
            self.bottom - max(ys),
            max(xs) - self.left,
            self.bottom - min(ys),
        )
    }
}

/// Snapshot the block, line and character segmentation of a page.
pub fn collect_page(page: &Page) -> Result<StextPage> {
    let bounds = page.bounds()?;
    let flip = Flip::new(&bounds);
    let text_page = page.to_text_page(TextPageOptions::empty())?;

    let mut blocks = Vec::new();
    for block in text_page.blocks() {
        let mut lines = Vec::new();
        for line in block.lines() {
            let chars = line
                .chars()
                .filter_map(|ch| {
                    Some(StextChar {
                        c: ch.char()?,
                        bbox: flip.quad(&ch.quad()),
                    })
                })
                .collect();
            lines.push(StextLine { chars });
        }
        blocks.push(StextBlock {
            bbox: flip.rect(&block.bounds()),
            lines,
        });
    }

    Ok(StextPage {
        width: bounds.x1 - bounds.x0,
        height: bounds.y1 - bounds.y0,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mupdf::Point;

    #[test]
    fn test_flip_rect_and_quad() {
        let flip = Flip::new(&Rect {
            x0: 0.0,
            y0: 0.0,
            x1: 612.0,
            y1: 792.0,
        });
        let r = flip.rect(&Rect {
            x0: 100.0,
            y0: 80.0,
            x1: 200.0,
            y1: 100.0,
        });
        assert_eq!(r, BoundingBox::new(100.0, 692.0, 200.0, 712.0));

        let q = Quad {
            ul: Point { x: 10.0, y: 50.0 },
            ur: Point { x: 15.0, y: 50.0 },
            ll: Point { x: 10.0, y: 62.0 },
            lr: Point { x: 15.0, y: 62.0 },
        };
        assert_eq!(flip.quad(&q), BoundingBox::new(10.0, 730.0, 15.0, 742.0));

        // Glyph running down the page, as on a quarter-turned page
        let turned = Quad {
            ul: Point { x: 22.0, y: 50.0 },
            ur: Point { x: 22.0, y: 55.0 },
            ll: Point { x: 10.0, y: 50.0 },
            lr: Point { x: 10.0, y: 55.0 },
        };
        assert_eq!(flip.quad(&turned), BoundingBox::new(10.0, 737.0, 22.0, 742.0));
    }
}
