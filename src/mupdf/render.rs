//! Page rasterization

use std::io::Cursor;

use image::DynamicImage;
use mupdf::{Colorspace, Matrix, Page, Pixmap};

use crate::engine::error::{EngineError, Result};

/// Rasterize a page at a uniform `zoom` and encode it as PNG.
pub fn render_page(page: &Page, zoom: f32) -> Result<Vec<u8>> {
    let matrix = Matrix::new_scale(zoom, zoom);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&matrix, &colorspace, true, true)?;
    encode_png(&pixmap)
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| EngineError::Render("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| EngineError::Render(e.to_string()))?;

    Ok(output)
}
