//! Per-page overlay ledger
//!
//! Every overlay edit is recorded in the page dictionary under
//! `/AeroOverlays` so later extractions know which regions are painted over
//! and what text was drawn. The ledger travels with the page through
//! merge and split.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::warn;

use super::error::{EngineError, Result};
use super::geometry::{normalize_rotation, BoundingBox};
use super::metrics::StandardFont;
use super::overlay::{DrawnLine, OverlayEntry};

pub const LEDGER_KEY: &[u8] = b"AeroOverlays";

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn font_from_name(name: &[u8]) -> StandardFont {
    match name {
        b"Courier" => StandardFont::Courier,
        _ => StandardFont::Helvetica,
    }
}

fn encode_rect(r: &BoundingBox) -> Object {
    Object::Array(vec![
        Object::Real(r.x0),
        Object::Real(r.y0),
        Object::Real(r.x1),
        Object::Real(r.y1),
    ])
}

fn decode_rect(obj: &Object) -> Option<BoundingBox> {
    let values: Vec<f32> = obj.as_array().ok()?.iter().filter_map(number).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(BoundingBox::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

fn encode_entry(entry: &OverlayEntry) -> Object {
    let lines: Vec<Object> = entry
        .lines
        .iter()
        .map(|line| {
            Object::Array(vec![
                Object::Real(line.x),
                Object::Real(line.baseline),
                Object::String(line.text.as_bytes().to_vec(), StringFormat::Hexadecimal),
            ])
        })
        .collect();

    let mut dict = Dictionary::new();
    dict.set("Rect", encode_rect(&entry.whiteout));
    dict.set("Area", encode_rect(&entry.area));
    dict.set("Rotate", Object::Integer(entry.rotation as i64));
    dict.set("Font", Object::Name(entry.font.base_font().as_bytes().to_vec()));
    dict.set("Size", Object::Real(entry.size));
    dict.set("Lines", Object::Array(lines));
    Object::Dictionary(dict)
}

fn decode_line(obj: &Object) -> Option<DrawnLine> {
    match obj.as_array().ok()?.as_slice() {
        [x, baseline, Object::String(bytes, _)] => Some(DrawnLine {
            x: number(x)?,
            baseline: number(baseline)?,
            text: String::from_utf8_lossy(bytes).into_owned(),
        }),
        _ => None,
    }
}

fn decode_entry(obj: &Object) -> Option<OverlayEntry> {
    let dict = obj.as_dict().ok()?;

    let whiteout = decode_rect(dict.get(b"Rect").ok()?)?;

    let font = match dict.get(b"Font") {
        Ok(Object::Name(name)) => font_from_name(name),
        _ => StandardFont::Helvetica,
    };
    let size = number(dict.get(b"Size").ok()?)?;
    let lines = dict
        .get(b"Lines")
        .ok()?
        .as_array()
        .ok()?
        .iter()
        .map(decode_line)
        .collect::<Option<Vec<_>>>()?;
    let rotation = dict
        .get(b"Rotate")
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0);

    let mut entry = OverlayEntry {
        whiteout,
        area: whiteout,
        font,
        size,
        lines,
        rotation,
    };
    // Entries without an area report the extent of what they drew
    entry.area = match dict.get(b"Area").ok().and_then(decode_rect) {
        Some(area) => area,
        None => {
            let boxes: Vec<BoundingBox> = entry.lines.iter().map(|l| entry.line_box(l)).collect();
            BoundingBox::union_all(boxes.iter()).unwrap_or(whiteout)
        }
    };
    Some(entry)
}

/// Read the ledger of a page, oldest entry first. Malformed entries are skipped.
pub fn read(doc: &Document, page_id: ObjectId) -> Vec<OverlayEntry> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Ok(Object::Array(items)) = page.get(LEDGER_KEY) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let entry = decode_entry(item);
            if entry.is_none() {
                warn!("Skipping malformed overlay ledger entry on {:?}", page_id);
            }
            entry
        })
        .collect()
}

/// Append an entry to the page ledger.
pub fn append(doc: &mut Document, page_id: ObjectId, entry: &OverlayEntry) -> Result<()> {
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| EngineError::DocumentWrite(format!("Page object unavailable: {}", e)))?;

    let mut items = match page.get(LEDGER_KEY) {
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    items.push(encode_entry(entry));
    page.set(LEDGER_KEY, Object::Array(items));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with_page() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        (doc, page_id)
    }

    fn entry(text: &str) -> OverlayEntry {
        OverlayEntry {
            whiteout: BoundingBox::new(10.0, 20.0, 110.0, 40.0),
            area: BoundingBox::new(11.0, 21.0, 109.0, 39.0),
            font: StandardFont::Courier,
            size: 11.0,
            lines: vec![DrawnLine {
                x: 11.0,
                baseline: 28.0,
                text: text.to_string(),
            }],
            rotation: 90,
        }
    }

    #[test]
    fn test_empty_page_has_no_entries() {
        let (doc, page_id) = doc_with_page();
        assert!(read(&doc, page_id).is_empty());
    }

    #[test]
    fn test_entries_keep_order_and_unicode() {
        let (mut doc, page_id) = doc_with_page();
        append(&mut doc, page_id, &entry("first")).unwrap();
        append(&mut doc, page_id, &entry("Ünïcode (paren)")).unwrap();

        let entries = read(&doc, page_id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry("first"));
        assert_eq!(entries[1].lines[0].text, "Ünïcode (paren)");
        assert_eq!(entries[1].font, StandardFont::Courier);
    }

    #[test]
    fn test_ledger_survives_save_and_load() {
        let (mut doc, page_id) = doc_with_page();
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        });
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Parent", Object::Reference(pages_id));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        append(&mut doc, page_id, &entry("saved")).unwrap();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        let page_id = *loaded.get_pages().get(&1).unwrap();
        let entries = read(&loaded, page_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lines[0].text, "saved");
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let (mut doc, page_id) = doc_with_page();
        append(&mut doc, page_id, &entry("good")).unwrap();
        let page = doc.get_dictionary_mut(page_id).unwrap();
        let mut items = page.get(LEDGER_KEY).unwrap().as_array().unwrap().clone();
        items.push(Object::Integer(7));
        page.set(LEDGER_KEY, Object::Array(items));

        let entries = read(&doc, page_id);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_entry_without_area_reports_drawn_extent() {
        let (mut doc, page_id) = doc_with_page();
        let mut dict = match encode_entry(&entry("old")) {
            Object::Dictionary(dict) => dict,
            other => panic!("unexpected ledger object: {:?}", other),
        };
        dict.remove(b"Area");
        dict.remove(b"Rotate");
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set(LEDGER_KEY, Object::Array(vec![Object::Dictionary(dict)]));

        let entries = read(&doc, page_id);
        assert_eq!(entries[0].rotation, 0);
        assert_eq!(entries[0].area, entries[0].line_box(&entries[0].lines[0]));
    }
}
