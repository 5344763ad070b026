// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDF documents and rotate every page using the
// `lopdf` crate.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use spoolgate_core::error::DispatchError;
use tracing::{debug, info, instrument};

/// Guard against malformed page trees whose /Parent links form a cycle.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Reads and rotates existing PDF files.
///
/// Wraps `lopdf::Document`. Pages are always visited in page-tree order, so
/// rewritten documents keep their original page sequence.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            DispatchError::Transform(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DispatchError> {
        let document = Document::load_mem(data).map_err(|err| {
            DispatchError::Transform(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Effective /Rotate of every page, in page order.
    pub fn page_rotations(&self) -> Vec<i32> {
        self.document
            .get_pages()
            .values()
            .map(|page_id| effective_rotation(&self.document, *page_id))
            .collect()
    }

    // -- Rotation -------------------------------------------------------------

    /// Rotate every page by `degrees` (must be a multiple of 90), clockwise.
    ///
    /// Returns the full document as bytes with the rotation applied. A
    /// document without pages is rejected.
    #[instrument(skip(self), fields(degrees, source = ?self.source_path))]
    pub fn rotate_all(&self, degrees: i32) -> Result<Vec<u8>, DispatchError> {
        if degrees % 90 != 0 {
            return Err(DispatchError::Transform(format!(
                "rotation must be a multiple of 90, got {}",
                degrees
            )));
        }

        let pages = self.document.get_pages();
        if pages.is_empty() {
            return Err(DispatchError::Transform("document has no pages".into()));
        }

        let mut doc = self.document.clone();

        // BTreeMap keyed by 1-indexed page number: iteration is page order.
        for (page_number, page_id) in &pages {
            let existing_rotation = effective_rotation(&doc, *page_id);
            let new_rotation = (existing_rotation + degrees).rem_euclid(360);

            // Setting /Rotate on the leaf overrides anything inherited.
            match doc.get_object_mut(*page_id) {
                Ok(Object::Dictionary(dict)) => {
                    dict.set("Rotate", Object::Integer(new_rotation as i64));
                }
                _ => {
                    return Err(DispatchError::Transform(format!(
                        "page {} is not a dictionary",
                        page_number
                    )));
                }
            }

            debug!(page_number, existing_rotation, new_rotation, "Page rotated");
        }

        let mut output = Vec::new();
        doc.save_to(&mut output).map_err(|err| {
            DispatchError::Transform(format!("failed to serialise rotated PDF: {}", err))
        })?;

        info!(pages = pages.len(), degrees, output_bytes = output.len(), "Document rotated");
        Ok(output)
    }
}

/// Read a page's /Rotate, following /Parent links for the inherited value.
/// Defaults to 0.
fn effective_rotation(doc: &Document, page_id: ObjectId) -> i32 {
    let mut current = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let dict = match doc.get_object(current) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return 0,
        };
        if let Ok(rotate) = dict.get(b"Rotate").and_then(|r| r.as_i64()) {
            return rotate as i32;
        }
        match dict.get(b"Parent").and_then(|p| p.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => return 0,
        }
    }
    0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    /// Build a minimal PDF with `pages` blank A4 pages. Each page's content
    /// stream carries its page number so order can be checked.
    pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::with_capacity(pages);
        for index in 0..pages {
            let content = format!("% page {}\n", index + 1).into_bytes();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialise fixture");
        bytes
    }

    /// Page content markers in page order.
    pub(crate) fn page_markers(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).expect("load");
        doc.get_pages()
            .values()
            .map(|page_id| {
                let content = doc.get_page_content(*page_id).expect("content");
                String::from_utf8_lossy(&content).trim().to_string()
            })
            .collect()
    }

    #[test]
    fn rotates_every_page_and_keeps_order() {
        let reader = PdfReader::from_bytes(&blank_pdf(3)).unwrap();
        assert_eq!(reader.page_rotations(), vec![0, 0, 0]);

        let rotated = reader.rotate_all(90).unwrap();
        let rotated_reader = PdfReader::from_bytes(&rotated).unwrap();

        assert_eq!(rotated_reader.page_count(), 3);
        assert_eq!(rotated_reader.page_rotations(), vec![90, 90, 90]);
        assert_eq!(
            page_markers(&rotated),
            vec!["% page 1", "% page 2", "% page 3"]
        );
    }

    #[test]
    fn rotation_adds_to_existing_rotation() {
        let reader = PdfReader::from_bytes(&blank_pdf(1)).unwrap();
        let once = reader.rotate_all(90).unwrap();
        let twice = PdfReader::from_bytes(&once).unwrap().rotate_all(90).unwrap();
        let wrapped = PdfReader::from_bytes(&twice)
            .unwrap()
            .rotate_all(180)
            .unwrap();

        assert_eq!(PdfReader::from_bytes(&twice).unwrap().page_rotations(), vec![180]);
        assert_eq!(PdfReader::from_bytes(&wrapped).unwrap().page_rotations(), vec![0]);
    }

    #[test]
    fn inherited_rotation_is_respected() {
        let mut doc = Document::load_mem(&blank_pdf(2)).unwrap();
        let pages_id = doc
            .catalog()
            .unwrap()
            .get(b"Pages")
            .unwrap()
            .as_reference()
            .unwrap();
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(pages_id) {
            dict.set("Rotate", Object::Integer(270));
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_rotations(), vec![270, 270]);

        let rotated = reader.rotate_all(90).unwrap();
        assert_eq!(PdfReader::from_bytes(&rotated).unwrap().page_rotations(), vec![0, 0]);
    }

    #[test]
    fn rejects_non_right_angle() {
        let reader = PdfReader::from_bytes(&blank_pdf(1)).unwrap();
        assert!(matches!(reader.rotate_all(45), Err(DispatchError::Transform(_))));
    }

    #[test]
    fn rejects_document_without_pages() {
        let reader = PdfReader::from_bytes(&blank_pdf(0)).unwrap();
        assert_eq!(reader.page_count(), 0);
        assert!(matches!(reader.rotate_all(90), Err(DispatchError::Transform(_))));
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        let result = PdfReader::from_bytes(b"<html>not found</html>");
        assert!(matches!(result, Err(DispatchError::Transform(_))));
    }
}
