//! Burn filled field values into a page document
//!
//! Values are appended to page content streams, never as annotations, so
//! a later flatten pass cannot strip them. A field that cannot be drawn
//! (bad image, missing mark) is skipped with a warning; the rest of the
//! document still embeds.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use shared_types::{signature_font, Field, FieldKind, SignatureMark, Signer};

use crate::coords::{storage_to_pdf, PdfRect};
use crate::error::PdfError;
use crate::flatten;
use crate::fonts::{fit_font_size, measure_text, FontFace, MIN_FONT_SIZE};
use crate::image::RasterImage;
use crate::parser::PdfFile;

/// Horizontal inset for text inside a field box, in points.
const TEXT_INSET: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
pub struct EmbedOptions {
    /// Stroke field outlines; used by in-progress previews.
    pub draw_borders: bool,
    /// Strip interactive constructs after drawing.
    pub flatten: bool,
}

impl EmbedOptions {
    /// Final signed output: no borders, flattened.
    pub fn final_output() -> Self {
        Self {
            draw_borders: false,
            flatten: true,
        }
    }

    /// Overlay for signing UIs: editable source left intact.
    pub fn preview(draw_borders: bool) -> Self {
        Self {
            draw_borders,
            flatten: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedWarning {
    pub field_id: String,
    pub message: String,
}

#[derive(Debug)]
pub struct EmbedOutcome {
    pub bytes: Vec<u8>,
    pub warnings: Vec<EmbedWarning>,
}

/// Decoded signature XObjects, cached per signer within one pass so a
/// mark reused across fields and pages decodes once.
struct ImageCache {
    by_signer: HashMap<String, (ObjectId, u32, u32, String)>,
    next_index: usize,
}

impl ImageCache {
    fn new() -> Self {
        Self {
            by_signer: HashMap::new(),
            next_index: 0,
        }
    }

    fn get_or_decode(
        &mut self,
        doc: &mut Document,
        signer_id: &str,
        bytes: &[u8],
    ) -> Result<(ObjectId, u32, u32, String), PdfError> {
        if let Some(entry) = self.by_signer.get(signer_id) {
            return Ok(entry.clone());
        }
        let raster = RasterImage::decode(bytes)?;
        let stream = raster.to_xobject()?;
        let object_id = doc.add_object(Object::Stream(stream));
        self.next_index += 1;
        let name = format!("ImSig{}", self.next_index);
        let entry = (object_id, raster.width, raster.height, name);
        self.by_signer.insert(signer_id.to_string(), entry.clone());
        Ok(entry)
    }
}

/// Embed `fields` into `source`, looking signature marks up by signer id.
pub fn embed_fields(
    source: &[u8],
    fields: &[Field],
    signers: &[Signer],
    marks: &HashMap<String, SignatureMark>,
    opts: &EmbedOptions,
) -> Result<EmbedOutcome, PdfError> {
    let mut pdf = PdfFile::from_bytes(source.to_vec())?;
    let mut warnings = Vec::new();

    let mut by_page: BTreeMap<u32, Vec<&Field>> = BTreeMap::new();
    for field in fields {
        by_page.entry(field.page).or_default().push(field);
    }

    let mut cache = ImageCache::new();

    for (page_num, page_fields) in by_page {
        let Some(page_id) = pdf.page_id(page_num) else {
            for field in &page_fields {
                warnings.push(EmbedWarning {
                    field_id: field.id.clone(),
                    message: format!("page {} not present in document", page_num),
                });
            }
            continue;
        };
        let page_size = pdf.page_size(page_num)?;

        let mut ops = String::new();
        let mut page_images: Vec<(String, ObjectId)> = Vec::new();
        let mut seen_images: HashSet<String> = HashSet::new();

        for field in page_fields {
            let rect = storage_to_pdf(&field.rect, page_size);
            if opts.draw_borders {
                ops.push_str(&border_ops(&rect));
            }
            if let Err(message) = render_field(
                field,
                &rect,
                signers,
                marks,
                pdf.doc_mut(),
                &mut cache,
                &mut page_images,
                &mut seen_images,
                &mut ops,
            ) {
                tracing::warn!(field = %field.id, %message, "skipping field during embed");
                warnings.push(EmbedWarning {
                    field_id: field.id.clone(),
                    message,
                });
            }
        }

        if !ops.is_empty() || !page_images.is_empty() {
            append_page_content(pdf.doc_mut(), page_id, ops, &page_images)?;
        }
    }

    if opts.flatten {
        flatten::strip_interactive(pdf.doc_mut());
    }

    let bytes = pdf.save_to_bytes()?;
    Ok(EmbedOutcome { bytes, warnings })
}

#[allow(clippy::too_many_arguments)]
fn render_field(
    field: &Field,
    rect: &PdfRect,
    signers: &[Signer],
    marks: &HashMap<String, SignatureMark>,
    doc: &mut Document,
    cache: &mut ImageCache,
    page_images: &mut Vec<(String, ObjectId)>,
    seen_images: &mut HashSet<String>,
    ops: &mut String,
) -> Result<(), String> {
    let value = field.value.as_deref().unwrap_or("").trim();

    // Closed dispatch: a new kind must be handled here before it compiles.
    match field.kind {
        FieldKind::Signature | FieldKind::Initials => render_signature(
            field,
            rect,
            signers,
            marks,
            doc,
            cache,
            page_images,
            seen_images,
            ops,
        ),
        FieldKind::Text
        | FieldKind::Dropdown
        | FieldKind::Radio
        | FieldKind::CheckboxGroup
        | FieldKind::Formula => {
            ops.push_str(&text_ops(value, rect, FontFace::Helvetica));
            Ok(())
        }
        FieldKind::Name => {
            ops.push_str(&text_ops(value, rect, FontFace::HelveticaBold));
            Ok(())
        }
        FieldKind::Date | FieldKind::DateSigned => {
            ops.push_str(&text_ops(&format_date(value), rect, FontFace::Helvetica));
            Ok(())
        }
        FieldKind::Number => {
            ops.push_str(&text_ops(&format_number(value), rect, FontFace::Helvetica));
            Ok(())
        }
        FieldKind::Checkbox => {
            if is_truthy(value) {
                ops.push_str(&check_ops(rect));
            }
            Ok(())
        }
        // Referenced, never inlined.
        FieldKind::Note | FieldKind::Attachment => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_signature(
    field: &Field,
    rect: &PdfRect,
    signers: &[Signer],
    marks: &HashMap<String, SignatureMark>,
    doc: &mut Document,
    cache: &mut ImageCache,
    page_images: &mut Vec<(String, ObjectId)>,
    seen_images: &mut HashSet<String>,
    ops: &mut String,
) -> Result<(), String> {
    let signer_id = field
        .signer_id
        .as_deref()
        .ok_or_else(|| "signature field has no owning signer".to_string())?;
    if !signers.iter().any(|s| s.id == signer_id) {
        return Err(format!("signer {} not on document", signer_id));
    }
    let Some(mark) = marks.get(signer_id) else {
        return Err(format!("no captured mark for signer {}", signer_id));
    };

    match mark {
        SignatureMark::Typed { text, font_id } => {
            let face = match signature_font(font_id) {
                Some(font) if !font.oblique => FontFace::Helvetica,
                // Unknown ids degrade to the default script stand-in.
                _ => FontFace::HelveticaOblique,
            };
            let rendered = if field.kind == FieldKind::Initials {
                initials_of(text)
            } else {
                text.clone()
            };
            ops.push_str(&typed_signature_ops(&rendered, rect, face));
            Ok(())
        }
        SignatureMark::Drawn { bytes, .. } | SignatureMark::Uploaded { bytes, .. } => {
            let (object_id, width, height, name) = cache
                .get_or_decode(doc, signer_id, bytes)
                .map_err(|e| e.to_string())?;
            if seen_images.insert(name.clone()) {
                page_images.push((name.clone(), object_id));
            }
            let (x, y, w, h) =
                crate::image::fit_in_box(width, height, rect.x, rect.y, rect.width, rect.height);
            ops.push_str(&format!(
                "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
                w, h, x, y, name
            ));
            Ok(())
        }
    }
}

/// First letter of each whitespace-separated part, uppercased.
fn initials_of(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Left-aligned, vertically centred text sized to fit the box.
fn text_ops(text: &str, rect: &PdfRect, face: FontFace) -> String {
    if text.is_empty() {
        return String::new();
    }
    let avail = (rect.width - 2.0 * TEXT_INSET).max(1.0);
    let size = fit_font_size(text, avail, rect.height, face);
    let baseline = rect.y + rect.height / 2.0 - size * 0.36;
    format!(
        "BT\n/{} {:.1} Tf\n0 0 0 rg\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        face.resource_key(),
        size,
        rect.x + TEXT_INSET,
        baseline,
        escape_pdf_string(text)
    )
}

/// Typed signatures grow into the box and are centred both ways.
fn typed_signature_ops(text: &str, rect: &PdfRect, face: FontFace) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut size = (rect.height * 0.8).clamp(MIN_FONT_SIZE, 48.0);
    while size > MIN_FONT_SIZE && measure_text(text, size, face) > rect.width {
        size -= 0.5;
    }
    let measured = measure_text(text, size, face);
    let x = rect.x + (rect.width - measured).max(0.0) / 2.0;
    let baseline = rect.y + rect.height / 2.0 - size * 0.36;
    format!(
        "BT\n/{} {:.1} Tf\n0 0 0 rg\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        face.resource_key(),
        size,
        x,
        baseline,
        escape_pdf_string(text)
    )
}

/// Two-stroke check mark centred in the box.
fn check_ops(rect: &PdfRect) -> String {
    let s = rect.width.min(rect.height);
    let ox = rect.x + (rect.width - s) / 2.0;
    let oy = rect.y + (rect.height - s) / 2.0;
    format!(
        "q\n0 G\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\n{:.2} {:.2} l\nS\nQ\n",
        (s * 0.12).max(1.0),
        ox + s * 0.2,
        oy + s * 0.5,
        ox + s * 0.4,
        oy + s * 0.3,
        ox + s * 0.8,
        oy + s * 0.8,
    )
}

fn border_ops(rect: &PdfRect) -> String {
    format!(
        "q\n0.2 0.4 0.8 RG\n1 w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
        rect.x, rect.y, rect.width, rect.height
    )
}

/// Values that tick a checkbox.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "checked" | "yes"
    )
}

/// Long human date when the value parses, the raw value otherwise.
fn format_date(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format("%B %-d, %Y").to_string();
    }
    for pattern in ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return date.format("%B %-d, %Y").to_string();
        }
    }
    value.to_string()
}

/// Grouped digits with at most two decimals when numeric, raw otherwise.
fn format_number(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != ' ').collect();
    let Ok(parsed) = cleaned.parse::<f64>() else {
        return value.to_string();
    };
    let rounded = (parsed * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let mut int_part = abs.trunc() as u64;
    let mut frac = ((abs - abs.trunc()) * 100.0).round() as u64;
    if frac >= 100 {
        int_part += 1;
        frac = 0;
    }

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if frac > 0 {
        out.push_str(&format!(".{:02}", frac));
    }
    out
}

/// Escape special characters for PDF string literals.
pub(crate) fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Append an overlay content stream and register the resources it uses.
/// Existing content is bracketed with q/Q so an unbalanced graphics state
/// in the source cannot skew the overlay.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: String,
    images: &[(String, ObjectId)],
) -> Result<(), PdfError> {
    let mut resources = resolve_resources(doc, page_id);

    let mut font_dict = resolve_sub_dict(doc, &resources, b"Font");
    for face in [
        FontFace::Helvetica,
        FontFace::HelveticaBold,
        FontFace::HelveticaOblique,
    ] {
        if !font_dict.has(face.resource_key().as_bytes()) {
            let mut f = Dictionary::new();
            f.set("Type", Object::Name(b"Font".to_vec()));
            f.set("Subtype", Object::Name(b"Type1".to_vec()));
            f.set("BaseFont", Object::Name(face.base_name().as_bytes().to_vec()));
            font_dict.set(face.resource_key(), Object::Dictionary(f));
        }
    }
    resources.set("Font", Object::Dictionary(font_dict));

    if !images.is_empty() {
        let mut xobjects = resolve_sub_dict(doc, &resources, b"XObject");
        for (name, object_id) in images {
            xobjects.set(name.as_str(), Object::Reference(*object_id));
        }
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let existing_contents = {
        let page_dict = page_dict(doc, page_id)?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
            Ok(Object::Array(items)) => items.clone(),
            Ok(stream @ Object::Stream(_)) => {
                let cloned = stream.clone();
                vec![cloned]
            }
            _ => Vec::new(),
        }
    };

    // A direct stream cannot sit in a Contents array; promote it.
    let mut contents: Vec<Object> = Vec::with_capacity(existing_contents.len() + 2);
    let guard_open = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        b"q\n".to_vec(),
    )));
    contents.push(Object::Reference(guard_open));
    for obj in existing_contents {
        match obj {
            Object::Reference(id) => contents.push(Object::Reference(id)),
            stream @ Object::Stream(_) => {
                let id = doc.add_object(stream);
                contents.push(Object::Reference(id));
            }
            other => contents.push(other),
        }
    }
    let overlay = format!("Q\n{}", ops);
    let overlay_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        overlay.into_bytes(),
    )));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?
        .as_dict_mut()
        .map_err(|_| PdfError::Operation("page is not a dictionary".to_string()))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));

    Ok(())
}

fn page_dict<'a>(doc: &'a Document, page_id: ObjectId) -> Result<&'a Dictionary, PdfError> {
    doc.get_object(page_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?
        .as_dict()
        .map_err(|_| PdfError::Operation("page is not a dictionary".to_string()))
}

/// The page's effective Resources dictionary, following a reference or
/// walking up the page tree for inherited entries.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return d.clone(),
            Ok(Object::Reference(r)) => {
                if let Ok(resolved) = doc.get_object(*r).and_then(|o| o.as_dict()) {
                    return resolved.clone();
                }
                return Dictionary::new();
            }
            _ => {}
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok());
    }
    Dictionary::new()
}

/// Clone a sub-dictionary of Resources (Font, XObject), resolving one
/// level of indirection.
fn resolve_sub_dict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key) {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(r)) => doc
            .get_object(*r)
            .and_then(|o| o.as_dict())
            .map(|d| d.clone())
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}
