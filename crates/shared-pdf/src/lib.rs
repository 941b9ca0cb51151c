//! Shared PDF handling for the e-signature engine
//!
//! Coordinate transformation between storage, PDF and pixel spaces,
//! field-value embedding, interactive-construct flattening with
//! verification, and certificate-of-completion rendering.

pub mod certificate;
pub mod coords;
pub mod embed;
pub mod error;
pub mod flatten;
pub mod fonts;
pub mod image;
pub mod parser;

pub use certificate::{append_certificate, render_certificate};
pub use coords::{
    pdf_to_storage, storage_to_pdf, storage_to_pixels, pixels_to_storage, PageSize, PdfRect,
    PixelRect, A4, LEGAL, LETTER, TABLOID,
};
pub use embed::{embed_fields, EmbedOptions, EmbedOutcome, EmbedWarning};
pub use error::PdfError;
pub use flatten::{flatten, verify, FlattenReport};
pub use parser::PdfFile;
