//! Remove interactive constructs so embedded content is non-editable

use lopdf::{Document, Object};
use serde::Serialize;

use crate::error::PdfError;
use crate::parser::PdfFile;

/// Annotation subtypes that leave a document editable.
const EDITABLE_SUBTYPES: [&[u8]; 4] = [b"Widget", b"FreeText", b"Ink", b"Popup"];

#[derive(Debug, Clone, Serialize)]
pub struct FlattenReport {
    pub is_flat: bool,
    pub issues: Vec<String>,
}

/// Drop the interactive-form dictionary and every page-level annotation
/// array from an already-loaded document.
pub fn strip_interactive(doc: &mut Document) {
    if let Ok(catalog) = doc.catalog_mut() {
        catalog.remove(b"AcroForm");
    }
    let page_ids: Vec<_> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        if let Ok(page) = doc
            .get_object_mut(page_id)
            .and_then(|obj| obj.as_dict_mut())
        {
            page.remove(b"Annots");
        }
    }
}

/// Flatten raw bytes: parse, strip, serialize.
pub fn flatten(bytes: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut pdf = PdfFile::from_bytes(bytes.to_vec())?;
    strip_interactive(pdf.doc_mut());
    pdf.save_to_bytes()
}

/// Re-open the result and report anything still editable. Findings are
/// returned as a structured list; the caller decides whether they are
/// fatal.
pub fn verify(bytes: &[u8]) -> Result<FlattenReport, PdfError> {
    let pdf = PdfFile::from_bytes(bytes.to_vec())?;
    let doc = pdf.doc();
    let mut issues = Vec::new();

    if let Ok(catalog) = doc.catalog() {
        if let Ok(acroform) = catalog.get(b"AcroForm") {
            let fields_present = resolve(doc, acroform)
                .and_then(|obj| obj.as_dict().ok().cloned())
                .and_then(|dict| dict.get(b"Fields").ok().cloned())
                .and_then(|fields| resolve_owned(doc, fields))
                .and_then(|fields| fields.as_array().ok().map(|a| !a.is_empty()))
                .unwrap_or(true);
            if fields_present {
                issues.push("interactive form dictionary still present".to_string());
            } else {
                issues.push("empty interactive form dictionary still present".to_string());
            }
        }
    }

    for (page_num, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_object(page_id).and_then(|obj| obj.as_dict()) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        let annots = match resolve(doc, annots).and_then(|obj| obj.as_array().ok().cloned()) {
            Some(list) if !list.is_empty() => list,
            Some(_) => continue,
            None => {
                issues.push(format!("page {}: unreadable annotation array", page_num));
                continue;
            }
        };
        for entry in &annots {
            let subtype = resolve(doc, entry)
                .and_then(|obj| obj.as_dict().ok())
                .and_then(|dict| dict.get(b"Subtype").ok())
                .and_then(|sub| sub.as_name().ok());
            match subtype {
                Some(name) if EDITABLE_SUBTYPES.contains(&name) => {
                    issues.push(format!(
                        "page {}: editable {} annotation remains",
                        page_num,
                        String::from_utf8_lossy(name)
                    ));
                }
                Some(_) => {}
                None => {
                    issues.push(format!("page {}: annotation without subtype", page_num));
                }
            }
        }
    }

    Ok(FlattenReport {
        is_flat: issues.is_empty(),
        issues,
    })
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_owned(doc: &Document, obj: Object) -> Option<Object> {
    match obj {
        Object::Reference(id) => doc.get_object(id).ok().cloned(),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LETTER;
    use lopdf::{Dictionary, Object};

    fn pdf_with_widget() -> Vec<u8> {
        let mut pdf = PdfFile::blank(1, LETTER);
        let page_id = pdf.page_id(1).unwrap();
        let doc = pdf.doc_mut();

        let mut annot = Dictionary::new();
        annot.set("Type", Object::Name(b"Annot".to_vec()));
        annot.set("Subtype", Object::Name(b"Widget".to_vec()));
        annot.set("FT", Object::Name(b"Tx".to_vec()));
        let annot_id = doc.add_object(Object::Dictionary(annot));

        let page = doc
            .get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap();
        page.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));

        let mut acroform = Dictionary::new();
        acroform.set("Fields", Object::Array(vec![Object::Reference(annot_id)]));
        let acroform_id = doc.add_object(Object::Dictionary(acroform));
        let catalog = doc.catalog_mut().unwrap();
        catalog.set("AcroForm", Object::Reference(acroform_id));

        pdf.save_to_bytes().unwrap()
    }

    #[test]
    fn widget_document_fails_verification() {
        let report = verify(&pdf_with_widget()).unwrap();
        assert!(!report.is_flat);
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("interactive form dictionary")));
        assert!(report.issues.iter().any(|i| i.contains("Widget")));
    }

    #[test]
    fn flatten_then_verify_is_clean() {
        let flattened = flatten(&pdf_with_widget()).unwrap();
        let report = verify(&flattened).unwrap();
        assert!(report.is_flat, "issues: {:?}", report.issues);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn clean_document_verifies_flat() {
        let mut pdf = PdfFile::blank(2, LETTER);
        let bytes = pdf.save_to_bytes().unwrap();
        let report = verify(&bytes).unwrap();
        assert!(report.is_flat);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn flatten_is_idempotent() {
        let once = flatten(&pdf_with_widget()).unwrap();
        let twice = flatten(&once).unwrap();
        assert!(verify(&twice).unwrap().is_flat);
    }
}
