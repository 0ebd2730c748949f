//! Document rewriting with lopdf
//!
//! Overlay content streams, page rotation, page removal, merge and split.
//! Every function works on an in-memory [`Document`]; [`save`] persists it
//! with a full rewrite through a temporary file.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::error::{check_page, EngineError, Result};
use super::geometry::{BoundingBox, PageSpace};
use super::ledger;
use super::metrics::StandardFont;
use super::overlay::OverlayEntry;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Rotations accepted by [`rotate_pages`]
pub const VALID_ANGLES: [i64; 3] = [90, 180, 270];

pub fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| EngineError::DocumentRead(e.to_string()))
}

pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| EngineError::DocumentWrite(e.to_string()))?;
    Ok(output)
}

/// Write the document to `path` via a sibling temp file and a rename.
pub fn save(doc: &mut Document, path: &Path) -> Result<()> {
    let bytes = to_bytes(doc)?;
    let tmp = path.with_extension("pdf.tmp");
    std::fs::write(&tmp, &bytes).map_err(|e| EngineError::DocumentWrite(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        EngineError::DocumentWrite(e.to_string())
    })
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Object id of a 1-based page number.
pub fn page_id(doc: &Document, page_number: usize) -> Result<ObjectId> {
    let pages = doc.get_pages();
    check_page(page_number, pages.len())?;
    pages
        .get(&(page_number as u32))
        .copied()
        .ok_or(EngineError::OutOfRange {
            requested: page_number,
            max: pages.len(),
        })
}

/// Look up a page attribute, walking up the page tree when it is inherited.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    // Depth limit guards against cyclic Parent links
    for _ in 0..32 {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Visible page box (CropBox, else MediaBox) in user space.
pub fn page_box(doc: &Document, page_id: ObjectId) -> BoundingBox {
    for key in [b"CropBox".as_slice(), b"MediaBox".as_slice()] {
        let rect = inherited(doc, page_id, key)
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| match arr.as_slice() {
                [x0, y0, x1, y1] => {
                    let (x0, y0) = (ledger::number(x0)?, ledger::number(y0)?);
                    let (x1, y1) = (ledger::number(x1)?, ledger::number(y1)?);
                    Some(BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
                }
                _ => None,
            });
        if let Some(rect) = rect {
            return rect;
        }
    }
    // US Letter
    BoundingBox::new(0.0, 0.0, 612.0, 792.0)
}

/// Orientation and unrotated size of a page, honoring an inherited `/Rotate`.
pub fn page_space(doc: &Document, page_id: ObjectId) -> PageSpace {
    let bbox = page_box(doc, page_id);
    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(ledger::number)
        .map(|angle| angle as i64)
        .unwrap_or(0);
    PageSpace::new(rotation, bbox.width(), bbox.height())
}

/// Copy inherited attributes onto every page so pages can leave their tree.
pub fn flatten_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let resolved: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| Some((*key, inherited(doc, page_id, key)?.clone())))
            .collect();
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in resolved {
                if !page.has(key) {
                    page.set(key, value);
                }
            }
        }
    }
}

/// Make sure the page can reference `font` by its resource name.
///
/// Inherited or shared resources are copied onto the page before editing.
fn ensure_font(doc: &mut Document, page_id: ObjectId, font: StandardFont) -> Result<()> {
    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    };

    if fonts.has(font.resource_name().as_bytes()) {
        return Ok(());
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(font.resource_name(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| EngineError::DocumentWrite(format!("Page object unavailable: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn contents_of(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}

fn add_stream(doc: &mut Document, operations: Vec<Operation>) -> Result<ObjectId> {
    let bytes = Content { operations }
        .encode()
        .map_err(|e| EngineError::DocumentWrite(e.to_string()))?;
    Ok(doc.add_object(Stream::new(Dictionary::new(), bytes)))
}

/// Encode text for a WinAnsi simple font; anything outside Latin-1 becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Content operators for one entry. Everything is drawn in displayed page
/// space under a `cm` that maps it onto the unrotated page box.
fn overlay_operations(
    entry: &OverlayEntry,
    page_box: &BoundingBox,
    space: &PageSpace,
) -> Vec<Operation> {
    let [a, b, c, d, e, f] = space.rotated(entry.rotation).display_to_user();
    let w = &entry.whiteout;

    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(a),
                Object::Real(b),
                Object::Real(c),
                Object::Real(d),
                Object::Real(e + page_box.x0),
                Object::Real(f + page_box.y0),
            ],
        ),
        Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
        Operation::new(
            "re",
            vec![
                Object::Real(w.x0),
                Object::Real(w.y0),
                Object::Real(w.width()),
                Object::Real(w.height()),
            ],
        ),
        Operation::new("f", vec![]),
    ];

    if !entry.lines.is_empty() {
        ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
        for line in &entry.lines {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(entry.font.resource_name().as_bytes().to_vec()),
                    Object::Real(entry.size),
                ],
            ));
            ops.push(Operation::new(
                "Td",
                vec![Object::Real(line.x), Object::Real(line.baseline)],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi(&line.text), StringFormat::Hexadecimal)],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Paint an overlay entry on top of a page and record it in the ledger.
///
/// `entry` is in the page's current displayed space; the recorded copy,
/// stamped with that rotation, is returned. The first edit on a page
/// isolates the existing content in `q`/`Q` so its graphics state cannot
/// leak into the overlay.
pub fn apply_overlay(
    doc: &mut Document,
    page_number: usize,
    entry: &OverlayEntry,
) -> Result<OverlayEntry> {
    let page_id = page_id(doc, page_number)?;
    let page_box = page_box(doc, page_id);
    let space = page_space(doc, page_id);
    let entry = OverlayEntry {
        rotation: space.rotation,
        ..entry.clone()
    };
    ensure_font(doc, page_id, entry.font)?;

    let mut contents = contents_of(doc, page_id);
    if ledger::read(doc, page_id).is_empty() {
        let open = add_stream(doc, vec![Operation::new("q", vec![])])?;
        let close = add_stream(doc, vec![Operation::new("Q", vec![])])?;
        contents.insert(0, Object::Reference(open));
        contents.push(Object::Reference(close));
    }

    let overlay = add_stream(doc, overlay_operations(&entry, &page_box, &space))?;
    contents.push(Object::Reference(overlay));

    doc.get_dictionary_mut(page_id)
        .map_err(|e| EngineError::DocumentWrite(format!("Page object unavailable: {}", e)))?
        .set("Contents", Object::Array(contents));

    ledger::append(doc, page_id, &entry)?;
    Ok(entry)
}

/// Set an absolute rotation on each listed page.
pub fn rotate_pages(doc: &mut Document, page_numbers: &[usize], angle: i64) -> Result<()> {
    if !VALID_ANGLES.contains(&angle) {
        return Err(EngineError::UnsupportedInput(format!(
            "Rotation angle must be 90, 180 or 270, got {}",
            angle
        )));
    }

    let ids = page_numbers
        .iter()
        .map(|n| page_id(doc, *n))
        .collect::<Result<Vec<_>>>()?;

    for id in ids {
        doc.get_dictionary_mut(id)
            .map_err(|e| EngineError::DocumentWrite(e.to_string()))?
            .set("Rotate", Object::Integer(angle));
    }
    Ok(())
}

/// Remove the listed pages. At least one page must remain.
pub fn delete_pages(doc: &mut Document, page_numbers: &[usize]) -> Result<()> {
    let total = page_count(doc);
    let mut unique: Vec<usize> = page_numbers.to_vec();
    unique.sort_unstable();
    unique.dedup();

    if unique.is_empty() {
        return Err(EngineError::UnsupportedInput("No pages selected".to_string()));
    }
    for n in &unique {
        check_page(*n, total)?;
    }
    if unique.len() >= total {
        return Err(EngineError::UnsupportedInput(
            "Cannot delete every page of a document".to_string(),
        ));
    }

    flatten_inherited(doc);
    let numbers: Vec<u32> = unique.iter().map(|n| *n as u32).collect();
    doc.delete_pages(&numbers);
    Ok(())
}

/// Build a new document holding the inclusive 1-based page range `[start, end]`.
pub fn extract_range(source: &[u8], start: usize, end: usize) -> Result<Document> {
    let mut doc = load(source)?;
    let total = page_count(&doc);
    check_page(start, total)?;
    check_page(end, total)?;
    if start > end {
        return Err(EngineError::UnsupportedInput(format!(
            "Range start {} is after end {}",
            start, end
        )));
    }

    flatten_inherited(&mut doc);
    let drop: Vec<u32> = (1..=total)
        .filter(|n| *n < start || *n > end)
        .map(|n| n as u32)
        .collect();
    doc.delete_pages(&drop);
    doc.prune_objects();
    Ok(doc)
}

/// Concatenate documents in order into a fresh document.
pub fn merge(sources: &[Vec<u8>]) -> Result<Document> {
    if sources.len() < 2 {
        return Err(EngineError::UnsupportedInput(
            "At least two documents are required to merge".to_string(),
        ));
    }

    let mut max_id: u32 = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for bytes in sources {
        let mut doc = load(bytes)?;
        flatten_inherited(&mut doc);
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Outlines" | "Outline" => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    for id in &page_ids {
        if let Ok(page) = merged.get_dictionary_mut(*id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    merged.trailer.set("Root", Object::Reference(catalog_id));

    Ok(merged)
}

/// Parse a 1-based page range such as `"3"`, `"1-5"` or `"6-"` against `total` pages.
pub fn parse_page_range(range: &str, total: usize) -> Result<(usize, usize)> {
    let invalid = || EngineError::UnsupportedInput(format!("Invalid page range '{}'", range));
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|_| invalid());

    let (start, end) = match range.trim().split_once('-') {
        Some((start, end)) if end.trim().is_empty() => (parse(start)?, total),
        Some((start, end)) => (parse(start)?, parse(end)?),
        None => {
            let page = parse(range)?;
            (page, page)
        }
    };

    check_page(start, total)?;
    check_page(end, total)?;
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a PDF with one page per entry, each showing its text at (100, 700) in 24pt Helvetica.
    pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
