//! Certificate-of-completion page rendering
//!
//! Produces the summary page proving who signed what, when, and from
//! where — either as a standalone document or appended to the signed
//! output.

use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use shared_types::CompletionCertificate;

use crate::coords::LETTER;
use crate::embed::escape_pdf_string;
use crate::error::PdfError;
use crate::fonts::FontFace;
use crate::parser::PdfFile;

const MARGIN: f64 = 54.0;
const ROW_STEP: f64 = 14.0;

/// Render the certificate as a standalone single-page document.
pub fn render_certificate(cert: &CompletionCertificate) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let page_id = build_certificate_page(&mut doc, pages_id, cert);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Operation(e.to_string()))?;
    Ok(buffer)
}

/// Append the certificate page to an existing document.
pub fn append_certificate(
    bytes: &[u8],
    cert: &CompletionCertificate,
) -> Result<Vec<u8>, PdfError> {
    let mut pdf = PdfFile::from_bytes(bytes.to_vec())?;
    let doc = pdf.doc_mut();

    let pages_id = {
        let catalog = doc
            .catalog()
            .map_err(|e| PdfError::Operation(e.to_string()))?;
        catalog
            .get(b"Pages")
            .and_then(|obj| obj.as_reference())
            .map_err(|_| PdfError::Operation("catalog has no page tree".to_string()))?
    };

    let page_id = build_certificate_page(doc, pages_id, cert);

    let pages = doc
        .get_object_mut(pages_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?
        .as_dict_mut()
        .map_err(|_| PdfError::Operation("page tree root is not a dictionary".to_string()))?;

    let mut kids = pages
        .get(b"Kids")
        .and_then(|obj| obj.as_array().cloned())
        .map_err(|_| PdfError::Operation("page tree has no kids array".to_string()))?;
    kids.push(Object::Reference(page_id));
    pages.set("Kids", Object::Array(kids));

    let count = pages.get(b"Count").and_then(|obj| obj.as_i64()).unwrap_or(0);
    pages.set("Count", Object::Integer(count + 1));

    pdf.save_to_bytes()
}

/// Create the page object (content + resources) under `parent`.
fn build_certificate_page(
    doc: &mut Document,
    parent: ObjectId,
    cert: &CompletionCertificate,
) -> ObjectId {
    let content = certificate_content(cert);
    let content_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        content.into_bytes(),
    )));

    let mut fonts = Dictionary::new();
    for face in [FontFace::Helvetica, FontFace::HelveticaBold] {
        let mut f = Dictionary::new();
        f.set("Type", Object::Name(b"Font".to_vec()));
        f.set("Subtype", Object::Name(b"Type1".to_vec()));
        f.set("BaseFont", Object::Name(face.base_name().as_bytes().to_vec()));
        fonts.set(face.resource_key(), Object::Dictionary(f));
    }
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(parent));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(LETTER.width as f32),
            Object::Real(LETTER.height as f32),
        ]),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    doc.add_object(Object::Dictionary(page))
}

fn certificate_content(cert: &CompletionCertificate) -> String {
    let mut ops = String::from("q\n0 0 0 rg\n");
    let mut y = LETTER.height - 72.0;

    text(&mut ops, MARGIN, y, 18.0, true, "Certificate of Completion");
    y -= 30.0;

    text(
        &mut ops,
        MARGIN,
        y,
        10.0,
        false,
        &format!("Document: {}", truncate(&cert.document_name, 70)),
    );
    y -= ROW_STEP;
    text(
        &mut ops,
        MARGIN,
        y,
        10.0,
        false,
        &format!("Document ID: {}", cert.document_id),
    );
    y -= ROW_STEP;
    text(
        &mut ops,
        MARGIN,
        y,
        10.0,
        false,
        &format!("Created: {}", stamp(Some(cert.created_at))),
    );
    y -= ROW_STEP;
    text(
        &mut ops,
        MARGIN,
        y,
        10.0,
        false,
        &format!("Completed: {}", stamp(cert.completed_at)),
    );
    y -= 28.0;

    text(&mut ops, MARGIN, y, 12.0, true, "Signers");
    y -= ROW_STEP + 4.0;

    let columns = [MARGIN, 200.0, 380.0, 500.0];
    for (x, heading) in columns.iter().zip(["Name", "Email", "Signed at", "IP address"]) {
        text(&mut ops, *x, y, 9.0, true, heading);
    }
    y -= ROW_STEP;

    for signer in &cert.signers {
        if y < 90.0 {
            text(&mut ops, MARGIN, y, 9.0, false, "(roster continues in the audit record)");
            break;
        }
        text(&mut ops, columns[0], y, 9.0, false, &truncate(&signer.name, 28));
        text(&mut ops, columns[1], y, 9.0, false, &truncate(&signer.email, 34));
        text(&mut ops, columns[2], y, 9.0, false, &stamp(signer.signed_at));
        text(
            &mut ops,
            columns[3],
            y,
            9.0,
            false,
            signer.ip_address.as_deref().unwrap_or("-"),
        );
        y -= ROW_STEP;
    }

    y -= ROW_STEP;
    text(
        &mut ops,
        MARGIN,
        y,
        9.0,
        false,
        &format!(
            "{} audit events recorded; the full trail accompanies this certificate.",
            cert.trail.entries.len()
        ),
    );

    ops.push_str("Q\n");
    ops
}

fn text(ops: &mut String, x: f64, y: f64, size: f64, bold: bool, content: &str) {
    let face = if bold {
        FontFace::HelveticaBold
    } else {
        FontFace::Helvetica
    };
    ops.push_str(&format!(
        "BT\n/{} {:.1} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        face.resource_key(),
        size,
        x,
        y,
        escape_pdf_string(content)
    ));
}

fn stamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%B %-d, %Y at %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AuditAction, AuditTrail, SignerAttestation};

    fn sample_certificate() -> CompletionCertificate {
        let mut trail = AuditTrail::new("doc-1");
        for action in [AuditAction::Created, AuditAction::Sent, AuditAction::Signed] {
            trail.append(
                action,
                Some("s1"),
                "ada@example.com",
                serde_json::json!({}),
                Some("203.0.113.7"),
                None,
                Utc::now(),
            );
        }
        CompletionCertificate {
            document_id: "doc-1".to_string(),
            document_name: "Listing Agreement".to_string(),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            signers: vec![SignerAttestation {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                role: "signer".to_string(),
                signed_at: Some(Utc::now()),
                ip_address: Some("203.0.113.7".to_string()),
                user_agent: None,
            }],
            trail,
        }
    }

    #[test]
    fn standalone_certificate_is_a_valid_pdf() {
        let bytes = render_certificate(&sample_certificate()).unwrap();
        let pdf = PdfFile::from_bytes(bytes).unwrap();
        assert_eq!(pdf.page_count(), 1);
    }

    #[test]
    fn appending_adds_exactly_one_page() {
        let mut source = PdfFile::blank(2, LETTER);
        let bytes = source.save_to_bytes().unwrap();
        let combined = append_certificate(&bytes, &sample_certificate()).unwrap();
        let pdf = PdfFile::from_bytes(combined).unwrap();
        assert_eq!(pdf.page_count(), 3);
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("short", 10), "short");
        let long = "an extremely long document name that overflows the line";
        assert!(truncate(long, 20).ends_with("..."));
        assert_eq!(truncate(long, 20).chars().count(), 20);
    }
}
