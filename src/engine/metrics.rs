//! Standard font metrics
//!
//! Advance widths for the base-14 fonts the overlay engine draws with. The
//! wrap engine only ever sees these through [`TextMeasurer`].

use std::str::FromStr;

use super::error::EngineError;

/// Measurement oracle used by the wrap engine
pub trait TextMeasurer: Send + Sync {
    /// Width of `text` in points when set at `size` points.
    fn width(&self, text: &str, size: f32) -> f32;
}

/// Helvetica advance widths (1/1000 em) for WinAnsi 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

/// Width used for anything outside the table
const HELVETICA_FALLBACK: u16 = 556;

const COURIER_WIDTH: u16 = 600;

/// Base-14 fonts the overlay writer can reference without embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    Courier,
}

impl StandardFont {
    /// PostScript name written into the font resource
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    /// Resource name used inside overlay content streams
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "AeroHelv",
            StandardFont::Courier => "AeroCour",
        }
    }

    fn advance(&self, c: char) -> u16 {
        match self {
            StandardFont::Courier => COURIER_WIDTH,
            StandardFont::Helvetica => {
                let code = c as u32;
                if (32..=126).contains(&code) {
                    HELVETICA_WIDTHS[(code - 32) as usize]
                } else {
                    HELVETICA_FALLBACK
                }
            }
        }
    }
}

impl FromStr for StandardFont {
    type Err = EngineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helv" | "helvetica" => Ok(StandardFont::Helvetica),
            "cour" | "courier" => Ok(StandardFont::Courier),
            other => Err(EngineError::UnsupportedInput(format!(
                "Unknown font '{}'",
                other
            ))),
        }
    }
}

impl TextMeasurer for StandardFont {
    fn width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.advance(c) as u32).sum();
        units as f32 * size / 1000.0
    }
}

/// Ascent and descent as fractions of the font size, used to box drawn lines
pub const LINE_ASCENT: f32 = 0.9;
pub const LINE_DESCENT: f32 = 0.25;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_widths() {
        let helv = StandardFont::Helvetica;
        // "Hello" = 722 + 556 + 222 + 222 + 556
        assert!((helv.width("Hello", 10.0) - 22.78).abs() < 1e-3);
        assert_eq!(helv.width("", 12.0), 0.0);
        assert!((helv.width(" ", 1000.0) - 278.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_ascii_uses_fallback() {
        let helv = StandardFont::Helvetica;
        assert!((helv.width("é", 1000.0) - 556.0).abs() < 1e-3);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let cour = StandardFont::Courier;
        assert!((cour.width("iiii", 10.0) - cour.width("WWWW", 10.0)).abs() < 1e-6);
        assert!((cour.width("ab", 10.0) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_font_names() {
        assert_eq!("helv".parse::<StandardFont>().unwrap(), StandardFont::Helvetica);
        assert_eq!("Courier".parse::<StandardFont>().unwrap(), StandardFont::Courier);
        assert!("tiro".parse::<StandardFont>().is_err());
    }
}
