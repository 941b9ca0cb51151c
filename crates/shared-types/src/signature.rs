//! Captured signature marks and the typed-signature font registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raster formats accepted for drawn/uploaded marks. Vector input (SVG)
/// is rejected at capture time and must be rasterized upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterFormat {
    Png,
    Jpeg,
}

/// A font available for typed signatures. The registry is an immutable
/// static table; callers hold references into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureFont {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Rendered with an oblique base font when no script face is embedded.
    pub oblique: bool,
}

pub static SIGNATURE_FONTS: &[SignatureFont] = &[
    SignatureFont {
        id: "cursive-1",
        display_name: "Herr Von Muellerhoff",
        oblique: true,
    },
    SignatureFont {
        id: "cursive-2",
        display_name: "Dancing Script",
        oblique: true,
    },
    SignatureFont {
        id: "cursive-3",
        display_name: "Great Vibes",
        oblique: true,
    },
    SignatureFont {
        id: "print-1",
        display_name: "Homemade Apple",
        oblique: false,
    },
];

/// Look up a typed-signature font by id.
pub fn signature_font(id: &str) -> Option<&'static SignatureFont> {
    SIGNATURE_FONTS.iter().find(|f| f.id == id)
}

/// A captured visual mark. Not a cryptographic signature; legal weight
/// comes from the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignatureMark {
    /// Hand-drawn on a capture surface, exported as raster bytes.
    Drawn {
        #[serde(with = "serde_bytes_b64")]
        bytes: Vec<u8>,
        format: RasterFormat,
    },
    /// Name typed by the signer, rendered in a registry font.
    Typed { text: String, font_id: String },
    /// Pre-existing signature image uploaded by the signer.
    Uploaded {
        #[serde(with = "serde_bytes_b64")]
        bytes: Vec<u8>,
        format: RasterFormat,
    },
}

impl SignatureMark {
    /// Raw raster bytes, if this mark carries any.
    pub fn raster_bytes(&self) -> Option<(&[u8], RasterFormat)> {
        match self {
            SignatureMark::Drawn { bytes, format } | SignatureMark::Uploaded { bytes, format } => {
                Some((bytes, *format))
            }
            SignatureMark::Typed { .. } => None,
        }
    }
}

/// One captured mark tied to one signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: String,
    pub signer_id: String,
    pub mark: SignatureMark,
    pub created_at: DateTime<Utc>,
}

/// Base64 transport for embedded image bytes.
mod serde_bytes_b64 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_lookup() {
        assert!(signature_font("cursive-1").is_some());
        assert!(signature_font("comic-sans").is_none());
    }

    #[test]
    fn typed_mark_has_no_raster_bytes() {
        let mark = SignatureMark::Typed {
            text: "Ada Lovelace".to_string(),
            font_id: "cursive-1".to_string(),
        };
        assert!(mark.raster_bytes().is_none());
    }

    #[test]
    fn mark_json_round_trip() {
        let mark = SignatureMark::Drawn {
            bytes: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00],
            format: RasterFormat::Png,
        };
        let json = serde_json::to_string(&mark).unwrap();
        let back: SignatureMark = serde_json::from_str(&json).unwrap();
        match back {
            SignatureMark::Drawn { bytes, format } => {
                assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]);
                assert_eq!(format, RasterFormat::Png);
            }
            other => panic!("expected drawn mark, got {:?}", other),
        }
    }
}
