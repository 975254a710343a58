//! PDF outline (bookmark) parsing
//!
//! Walks the /Outlines tree of the catalog and resolves every item's target to
//! a zero-based page index. Targets may be explicit destination arrays, named
//! destinations (looked up in the catalog's /Dests dictionary or the /Names
//! /Dests name tree), or GoTo actions wrapping either of those.

use super::document::PdfDocument;
use super::error::{DocumentError, DocumentResult};
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

/// Outline nesting deeper than this is treated as corrupt.
const MAX_OUTLINE_DEPTH: usize = 64;

/// Name trees deeper than this are not searched further.
const MAX_NAME_TREE_DEPTH: usize = 32;

/// A single bookmark and its nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Text shown for the bookmark
    pub title: String,

    /// Zero-based page the bookmark points to, when it could be resolved
    pub page_idx: Option<usize>,

    pub children: Vec<Bookmark>,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, page_idx: Option<usize>) -> Self {
        Bookmark {
            title: title.into(),
            page_idx,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Renders a bookmark tree one line per item, prefixing each level with
    /// one more `sep`:
    ///
    /// ```text
    /// - Chapter 1, p 0
    /// -- Section 1.1, p 1
    /// - Chapter 2, p 3
    /// ```
    pub fn tree_lines(tree: &[Bookmark], sep: &str) -> Vec<String> {
        let mut lines = Vec::new();
        push_tree_lines(tree, sep, sep, &mut lines);
        lines
    }
}

fn push_tree_lines(tree: &[Bookmark], unit: &str, prefix: &str, lines: &mut Vec<String>) {
    for bookmark in tree {
        let page = match bookmark.page_idx {
            Some(idx) => idx.to_string(),
            None => "?".to_string(),
        };
        lines.push(format!("{} {}, p {}", prefix, bookmark.title, page));
        if bookmark.has_children() {
            let deeper = format!("{}{}", prefix, unit);
            push_tree_lines(&bookmark.children, unit, &deeper, lines);
        }
    }
}

/// Reads the document outline.
///
/// Returns an empty list when the document has no /Outlines entry. Items
/// without a /Title are skipped, along with their children. Cycles in the
/// /First and /Next links are broken by remembering every visited item.
pub fn read_outline(doc: &PdfDocument) -> DocumentResult<Vec<Bookmark>> {
    let catalog = doc.catalog()?;
    let lopdf = doc.inner();

    let outlines = match catalog.get(b"Outlines") {
        Ok(obj) => match lopdf.dereference(obj) {
            Ok((_, Object::Dictionary(dict))) => dict,
            Ok(_) => {
                return Err(DocumentError::InvalidOutline(
                    "/Outlines is not a dictionary".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        },
        Err(_) => return Ok(Vec::new()),
    };

    let mut visited = HashSet::new();
    read_siblings(doc, outlines, &mut visited, 0)
}

/// Reads the chain of items starting at `parent`'s /First.
fn read_siblings(
    doc: &PdfDocument,
    parent: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    depth: usize,
) -> DocumentResult<Vec<Bookmark>> {
    if depth > MAX_OUTLINE_DEPTH {
        return Err(DocumentError::InvalidOutline(format!(
            "outline nested deeper than {} levels",
            MAX_OUTLINE_DEPTH
        )));
    }

    let lopdf = doc.inner();
    let mut items = Vec::new();
    let mut next = parent.get(b"First").and_then(Object::as_reference).ok();

    while let Some(id) = next {
        if !visited.insert(id) {
            debug!(?id, "Outline cycle detected, stopping");
            break;
        }

        let item = match lopdf.get_dictionary(id) {
            Ok(item) => item,
            Err(e) => {
                debug!(?id, error = %e, "Broken outline link, stopping");
                break;
            }
        };
        next = item.get(b"Next").and_then(Object::as_reference).ok();

        let title = match item.get(b"Title").map(|t| lopdf.dereference(t)) {
            Ok(Ok((_, Object::String(bytes, _)))) => decode_text_string(bytes),
            _ => {
                debug!(?id, "Outline item without a title, skipping");
                continue;
            }
        };

        let mut bookmark = Bookmark::new(title, resolve_item_page(doc, item));
        bookmark.children = read_siblings(doc, item, visited, depth + 1)?;
        items.push(bookmark);
    }

    Ok(items)
}

/// Resolves an outline item's /Dest or /A GoTo action to a page index.
fn resolve_item_page(doc: &PdfDocument, item: &Dictionary) -> Option<usize> {
    let lopdf = doc.inner();

    if let Ok(dest) = item.get(b"Dest") {
        return resolve_destination(doc, dest, 0);
    }

    let (_, action) = lopdf.dereference(item.get(b"A").ok()?).ok()?;
    let action = action.as_dict().ok()?;
    match action.get(b"S").and_then(Object::as_name) {
        Ok(b"GoTo") => resolve_destination(doc, action.get(b"D").ok()?, 0),
        _ => None,
    }
}

/// Resolves an explicit or named destination to a page index.
///
/// `hops` bounds indirection through named destinations that point at other
/// names.
fn resolve_destination(doc: &PdfDocument, dest: &Object, hops: usize) -> Option<usize> {
    if hops > 4 {
        return None;
    }

    let (_, dest) = doc.inner().dereference(dest).ok()?;
    match dest {
        Object::Array(parts) => {
            let target = parts.first()?;
            match target {
                Object::Reference(page_id) => doc.page_index(*page_id),
                // Remote-style destinations store the page number directly
                Object::Integer(n) => usize::try_from(*n).ok(),
                _ => None,
            }
        }
        // Named destination objects may wrap the array as { /D [...] }
        Object::Dictionary(dict) => resolve_destination(doc, dict.get(b"D").ok()?, hops + 1),
        Object::Name(name) => {
            let target = lookup_named_destination(doc, name)?;
            resolve_destination(doc, target, hops + 1)
        }
        Object::String(name, _) => {
            let target = lookup_named_destination(doc, name)?;
            resolve_destination(doc, target, hops + 1)
        }
        _ => None,
    }
}

/// Finds a named destination in the catalog's /Dests dictionary (PDF 1.1
/// style) or in the /Names /Dests name tree.
fn lookup_named_destination<'a>(doc: &'a PdfDocument, name: &[u8]) -> Option<&'a Object> {
    let lopdf = doc.inner();
    let catalog = doc.catalog().ok()?;

    if let Ok(dests) = catalog.get(b"Dests") {
        if let Ok((_, Object::Dictionary(dests))) = lopdf.dereference(dests) {
            if let Ok(target) = dests.get(name) {
                return Some(target);
            }
        }
    }

    let (_, names) = lopdf.dereference(catalog.get(b"Names").ok()?).ok()?;
    let (_, tree) = lopdf.dereference(names.as_dict().ok()?.get(b"Dests").ok()?).ok()?;
    search_name_tree(doc, tree.as_dict().ok()?, name, 0)
}

fn search_name_tree<'a>(
    doc: &'a PdfDocument,
    node: &'a Dictionary,
    name: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_NAME_TREE_DEPTH {
        return None;
    }
    let lopdf = doc.inner();

    if let Ok(names) = node.get(b"Names").and_then(Object::as_array) {
        for pair in names.chunks_exact(2) {
            if let Object::String(key, _) = &pair[0] {
                if key.as_slice() == name {
                    return Some(&pair[1]);
                }
            }
        }
    }

    let kids = node.get(b"Kids").and_then(Object::as_array).ok()?;
    kids.iter().find_map(|kid| {
        let (_, kid) = lopdf.dereference(kid).ok()?;
        let kid = kid.as_dict().ok()?;
        if !name_in_limits(kid, name) {
            return None;
        }
        search_name_tree(doc, kid, name, depth + 1)
    })
}

/// Checks a name tree node's /Limits; nodes without limits may hold anything.
fn name_in_limits(node: &Dictionary, name: &[u8]) -> bool {
    let Ok(limits) = node.get(b"Limits").and_then(Object::as_array) else {
        return true;
    };
    match (limits.first(), limits.get(1)) {
        (Some(Object::String(low, _)), Some(Object::String(high, _))) => {
            low.as_slice() <= name && name <= high.as_slice()
        }
        _ => true,
    }
}

/// Decodes a PDF text string to a Rust String.
///
/// PDF text strings come in a few encodings:
/// - UTF-16BE with BOM (0xFE 0xFF)
/// - UTF-16LE with BOM (0xFF 0xFE), seen in the wild though not allowed
/// - UTF-8 with BOM (0xEF 0xBB 0xBF)
/// - PDFDocEncoding otherwise, read here as UTF-8 when valid and Latin-1
///   when not
///
/// Escape sequences (0x1b ... 0x1b) carrying language codes are removed.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    let decoded = match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        },
    };

    remove_escape_sequences(&decoded)
}

/// Decodes UTF-16 code units; a trailing odd byte is dropped.
fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn remove_escape_sequences(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;

    for c in s.chars() {
        if c == '\x1b' {
            in_escape = !in_escape;
            continue;
        }
        if !in_escape {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf16be_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let bytes = [0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00];
        assert_eq!(decode_text_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_utf16_odd_length() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_string(&bytes), "A");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'o', b'k'];
        assert_eq!(decode_text_string(&bytes), "ok");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "café" in PDFDocEncoding / Latin-1
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text_string(&bytes), "café");
    }

    #[test]
    fn test_escape_sequences_removed() {
        let bytes = [0xFE, 0xFF, 0x00, 0x1b, 0x00, b'e', 0x00, b'n', 0x00, 0x1b, 0x00, b'X'];
        assert_eq!(decode_text_string(&bytes), "X");
    }

    #[test]
    fn test_tree_lines() {
        let mut chapter = Bookmark::new("Chapter 1", Some(0));
        chapter.children.push(Bookmark::new("Section 1.1", Some(1)));
        let tree = vec![chapter, Bookmark::new("Appendix", None)];

        assert_eq!(
            Bookmark::tree_lines(&tree, "-"),
            vec![
                "- Chapter 1, p 0".to_string(),
                "-- Section 1.1, p 1".to_string(),
                "- Appendix, p ?".to_string(),
            ]
        );
    }

    #[test]
    fn test_name_limits() {
        let mut node = Dictionary::new();
        assert!(name_in_limits(&node, b"anything"));

        node.set(
            "Limits",
            vec![Object::string_literal("b"), Object::string_literal("d")],
        );
        assert!(name_in_limits(&node, b"c"));
        assert!(!name_in_limits(&node, b"a"));
        assert!(!name_in_limits(&node, b"e"));
    }
}
