//! Captured-mark validation
//!
//! Runs before anything is persisted: a bad mark rejects the submission
//! as a whole rather than leaving a half-signed state behind.

use shared_pdf::image::detect_format;
use shared_types::{signature_font, RasterFormat, SignatureMark};

use crate::error::{CoreError, Result};

/// Upper bound for drawn/uploaded mark payloads.
pub const MAX_MARK_BYTES: usize = 2 * 1024 * 1024;

pub fn validate_mark(mark: &SignatureMark) -> Result<()> {
    match mark {
        SignatureMark::Typed { text, font_id } => {
            if text.trim().is_empty() {
                return Err(CoreError::Validation(
                    "typed signature text must not be empty".to_string(),
                ));
            }
            if signature_font(font_id).is_none() {
                return Err(CoreError::Validation(format!(
                    "unknown signature font: {}",
                    font_id
                )));
            }
            Ok(())
        }
        SignatureMark::Drawn { bytes, format } | SignatureMark::Uploaded { bytes, format } => {
            validate_raster(bytes, *format)
        }
    }
}

fn validate_raster(bytes: &[u8], declared: RasterFormat) -> Result<()> {
    if bytes.is_empty() {
        return Err(CoreError::Validation(
            "signature image must not be empty".to_string(),
        ));
    }
    if bytes.len() > MAX_MARK_BYTES {
        return Err(CoreError::Validation(format!(
            "signature image exceeds {} bytes",
            MAX_MARK_BYTES
        )));
    }
    let detected = detect_format(bytes).map_err(|e| CoreError::Validation(e.to_string()))?;
    if detected != declared {
        return Err(CoreError::Validation(format!(
            "signature image bytes are {:?} but were declared {:?}",
            detected, declared
        )));
    }
    Ok(())
}
