//! Thin wrapper around `lopdf::Document`

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::coords::{PageSize, LETTER};
use crate::error::PdfError;

/// A loaded page document plus the bytes it was parsed from.
pub struct PdfFile {
    pub(crate) doc: Document,
    pub(crate) bytes: Vec<u8>,
}

impl PdfFile {
    /// Load from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PdfError> {
        let doc = Document::load_mem(&bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
        Ok(Self { doc, bytes })
    }

    /// Build a blank document with the given page count. Used as fallback
    /// source content and as a fixture for exercising the pipeline.
    pub fn blank(page_count: u32, size: PageSize) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(page_count as usize);
        for _ in 0..page_count.max(1) {
            let content = Stream::new(Dictionary::new(), Vec::new());
            let content_id = doc.add_object(Object::Stream(content));

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(size.width as f32),
                    Object::Real(size.height as f32),
                ]),
            );
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut file = Self { doc, bytes: Vec::new() };
        // Render once so `bytes` reflects the document.
        let _ = file.save_to_bytes();
        file
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Object id for a 1-indexed page number.
    pub fn page_id(&self, page_num: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_num).copied()
    }

    /// Page dimensions from the MediaBox, falling back to the parent node
    /// and finally to US Letter.
    pub fn page_size(&self, page_num: u32) -> Result<PageSize, PdfError> {
        let rect = self.media_box(page_num)?;
        Ok(PageSize::new(rect[2], rect[3]))
    }

    /// MediaBox as `[x, y, width, height]`.
    pub fn media_box(&self, page_num: u32) -> Result<[f64; 4], PdfError> {
        let page_id = self
            .page_id(page_num)
            .ok_or(PdfError::PageNotFound(page_num))?;
        let page = self
            .doc
            .get_object(page_id)
            .map_err(|e| PdfError::Operation(e.to_string()))?;
        let page_dict = page
            .as_dict()
            .map_err(|_| PdfError::Operation("page is not a dictionary".to_string()))?;

        if let Ok(media_box) = page_dict.get(b"MediaBox") {
            return self.parse_rect(media_box);
        }

        if let Ok(parent_ref) = page_dict.get(b"Parent") {
            if let Ok(parent_id) = parent_ref.as_reference() {
                if let Ok(parent) = self.doc.get_object(parent_id) {
                    if let Ok(parent_dict) = parent.as_dict() {
                        if let Ok(media_box) = parent_dict.get(b"MediaBox") {
                            return self.parse_rect(media_box);
                        }
                    }
                }
            }
        }

        Ok([0.0, 0.0, LETTER.width, LETTER.height])
    }

    fn parse_rect(&self, obj: &Object) -> Result<[f64; 4], PdfError> {
        let arr = match obj {
            Object::Array(a) => a.clone(),
            Object::Reference(id) => {
                let resolved = self
                    .doc
                    .get_object(*id)
                    .map_err(|e| PdfError::Operation(e.to_string()))?;
                resolved
                    .as_array()
                    .map_err(|_| PdfError::Operation("MediaBox reference is not an array".to_string()))?
                    .clone()
            }
            _ => return Err(PdfError::Operation("MediaBox is not an array".to_string())),
        };

        if arr.len() != 4 {
            return Err(PdfError::Operation(format!(
                "MediaBox has {} elements, expected 4",
                arr.len()
            )));
        }

        let mut values = [0.0f64; 4];
        for (i, obj) in arr.iter().enumerate() {
            values[i] = self.extract_number(obj)?;
        }

        // [x1, y1, x2, y2] to [x, y, width, height]
        Ok([
            values[0],
            values[1],
            values[2] - values[0],
            values[3] - values[1],
        ])
    }

    fn extract_number(&self, obj: &Object) -> Result<f64, PdfError> {
        match obj {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            Object::Reference(id) => {
                let resolved = self
                    .doc
                    .get_object(*id)
                    .map_err(|e| PdfError::Operation(e.to_string()))?;
                self.extract_number(resolved)
            }
            _ => Err(PdfError::Operation(
                "expected number in rectangle".to_string(),
            )),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Serialize and refresh the cached bytes.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Operation(e.to_string()))?;
        self.bytes = buffer.clone();
        Ok(buffer)
    }
}
