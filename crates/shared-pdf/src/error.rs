use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Unrecognized image format")]
    UnrecognizedImage,

    #[error("Vector signature images must be rasterized before embedding")]
    VectorSignature,

    #[error("Image decode failed: {0}")]
    ImageDecode(String),
}
