// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF text layer: page geometry and native text extraction using the
// `lopdf` crate.

use std::path::Path;

use blattwerk_bridge::{NativeText, NativeTextSource};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::geometry::PageSize;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use crate::page::PageInput;

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Parent hops followed when resolving inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// Native text layer of a PDF document.
///
/// Implements [`NativeTextSource`] so a run can read text straight from the
/// file instead of receiving it from the caller.
pub struct PdfTextSource {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfTextSource {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            BlattwerkError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        info!(pages = document.get_pages().len(), "PDF opened");
        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Load a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| BlattwerkError::Pdf(format!("failed to load PDF from memory: {}", err)))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Size in points of every page, keyed by 1-based page number.
    pub fn page_sizes(&self) -> Vec<(u32, PageSize)> {
        self.document
            .get_pages()
            .into_iter()
            .map(|(number, id)| (number, self.page_size(id)))
            .collect()
    }

    /// Clockwise `/Rotate` of a page, 0 when absent.
    pub fn page_rotation(&self, page: u32) -> i64 {
        self.document
            .get_pages()
            .get(&page)
            .and_then(|id| self.inherited(*id, b"Rotate"))
            .and_then(|obj| obj.as_i64().ok())
            .map_or(0, |r| r.rem_euclid(360))
    }

    /// One analyzer input per page, sized from the MediaBox.
    ///
    /// Text is left out: the analyzer pulls it through [`NativeTextSource`].
    pub fn page_inputs(&self) -> Vec<PageInput> {
        self.page_sizes()
            .into_iter()
            .map(|(page, size)| {
                let mut input = PageInput::new(page, size.width, size.height);
                input.rotation = self.page_rotation(page) as f64;
                input
            })
            .collect()
    }

    // -- Helpers --------------------------------------------------------------

    fn page_size(&self, page_id: ObjectId) -> PageSize {
        let [x0, y0, x1, y1] = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| self.media_box(obj))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        PageSize::new((x1 - x0).abs(), (y1 - y0).abs()).unwrap_or_else(|err| {
            warn!(?page_id, error = %err, "Degenerate MediaBox, using Letter");
            PageSize {
                width: DEFAULT_MEDIA_BOX[2],
                height: DEFAULT_MEDIA_BOX[3],
            }
        })
    }

    fn media_box(&self, object: &Object) -> Option<[f64; 4]> {
        let values = match self.resolve(object) {
            Object::Array(values) => values,
            _ => return None,
        };
        if values.len() != 4 {
            return None;
        }
        let mut out = [0.0; 4];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = number(self.resolve(value))?;
        }
        Some(out)
    }

    /// Look `key` up on the page, then on its `/Parent` chain.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.dictionary(page_id)?;
        for _ in 0..MAX_INHERIT_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.dictionary(parent)?;
        }
        None
    }

    fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        self.document.get_object(id).ok()?.as_dict().ok()
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }
}

impl NativeTextSource for PdfTextSource {
    #[instrument(skip(self))]
    fn extract_native_text(&self, page: u32) -> Result<Option<NativeText>> {
        if !self.document.get_pages().contains_key(&page) {
            return Err(BlattwerkError::Pdf(format!(
                "page {} out of range (document has {} pages)",
                page,
                self.page_count()
            )));
        }
        let text = self
            .document
            .extract_text(&[page])
            .map_err(|err| BlattwerkError::Pdf(format!("text extraction failed on page {}: {}", page, err)))?;
        if text.trim().is_empty() {
            debug!(page, "Page has no text layer");
            return Ok(None);
        }
        debug!(page, chars = text.chars().count(), "Native text extracted");
        Ok(Some(NativeText {
            text,
            words: Vec::new(),
            blocks: Vec::new(),
        }))
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, dictionary};

    /// Two pages: A4 inherited from the page tree, and a rotated Letter page
    /// with its own MediaBox and no text.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello Blattwerk")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let empty_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => empty_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => 90,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![first.into(), second.into()],
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn sizes_follow_inherited_media_box() {
        let source = PdfTextSource::from_bytes(&sample_pdf()).unwrap();
        assert_eq!(source.page_count(), 2);
        let sizes = source.page_sizes();
        assert_eq!(sizes[0], (1, PageSize { width: 595.0, height: 842.0 }));
        assert_eq!(sizes[1], (2, PageSize { width: 612.0, height: 792.0 }));
    }

    #[test]
    fn rotation_is_read() {
        let source = PdfTextSource::from_bytes(&sample_pdf()).unwrap();
        assert_eq!(source.page_rotation(1), 0);
        assert_eq!(source.page_rotation(2), 90);
        let inputs = source.page_inputs();
        assert_eq!(inputs[1].rotation, 90.0);
        assert_eq!(inputs[0].height, 842.0);
    }

    #[test]
    fn text_layer_is_extracted() {
        let source = PdfTextSource::from_bytes(&sample_pdf()).unwrap();
        let native = source.extract_native_text(1).unwrap().unwrap();
        assert!(native.text.contains("Hello"));
        assert!(source.extract_native_text(2).unwrap().is_none());
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let source = PdfTextSource::from_bytes(&sample_pdf()).unwrap();
        assert!(matches!(source.extract_native_text(9), Err(BlattwerkError::Pdf(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(PdfTextSource::from_bytes(b"not a pdf").is_err());
    }

    #[test]
    fn open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.pdf");
        std::fs::write(&path, sample_pdf()).unwrap();
        let source = PdfTextSource::open(&path).unwrap();
        assert_eq!(source.source_path(), Some(path.display().to_string().as_str()));
    }
}
