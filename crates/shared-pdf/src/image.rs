//! Raster signature image handling
//!
//! Formats are recognized by magic bytes before any decode work. Vector
//! input is refused here; rasterization happens upstream of the engine.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

use shared_types::RasterFormat;

use crate::error::PdfError;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Identify raster bytes by their magic prefix. SVG is detected so it can
/// be rejected with a specific error instead of a generic decode failure.
pub fn detect_format(bytes: &[u8]) -> Result<RasterFormat, PdfError> {
    if bytes.starts_with(&PNG_MAGIC) {
        return Ok(RasterFormat::Png);
    }
    if bytes.starts_with(&JPEG_MAGIC) {
        return Ok(RasterFormat::Jpeg);
    }
    if looks_like_svg(bytes) {
        return Err(PdfError::VectorSignature);
    }
    Err(PdfError::UnrecognizedImage)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes)
        .map(|s| {
            let trimmed = s.trim_start();
            trimmed.starts_with("<?xml") || trimmed.starts_with("<svg")
        })
        .unwrap_or(false)
}

/// A decoded image flattened to opaque RGB.
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
}

impl RasterImage {
    /// Decode PNG or JPEG bytes. Transparency is composited onto white so
    /// marks drawn on a clear canvas print the way they looked on screen.
    pub fn decode(bytes: &[u8]) -> Result<Self, PdfError> {
        let format = detect_format(bytes)?;
        let loaded = match format {
            RasterFormat::Png => {
                image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            }
            RasterFormat::Jpeg => {
                image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
            }
        }
        .map_err(|e| PdfError::ImageDecode(e.to_string()))?;

        let rgba = loaded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for px in rgba.pixels() {
            let [r, g, b, a] = px.0;
            let alpha = a as u16;
            for channel in [r, g, b] {
                let blended = (channel as u16 * alpha + 255 * (255 - alpha)) / 255;
                rgb.push(blended as u8);
            }
        }
        Ok(Self { width, height, rgb })
    }

    /// Build an image XObject stream carrying the pixels as
    /// FlateDecode-compressed DeviceRGB samples.
    pub fn to_xobject(&self) -> Result<Stream, PdfError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.rgb)
            .and_then(|_| encoder.finish())
            .map(|compressed| {
                let mut dict = Dictionary::new();
                dict.set("Type", Object::Name(b"XObject".to_vec()));
                dict.set("Subtype", Object::Name(b"Image".to_vec()));
                dict.set("Width", Object::Integer(self.width as i64));
                dict.set("Height", Object::Integer(self.height as i64));
                dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
                dict.set("BitsPerComponent", Object::Integer(8));
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                Stream::new(dict, compressed)
            })
            .map_err(|e| PdfError::ImageDecode(e.to_string()))
    }

    /// Scale to fit a box while preserving aspect ratio, then center.
    pub fn fit_in_box(&self, box_x: f64, box_y: f64, box_w: f64, box_h: f64) -> (f64, f64, f64, f64) {
        fit_in_box(self.width, self.height, box_x, box_y, box_w, box_h)
    }
}

/// Scale image dimensions to fit a box by `min(bw/iw, bh/ih)` and center
/// the result. Returns `(x, y, width, height)` in the box's space.
pub fn fit_in_box(
    img_w: u32,
    img_h: u32,
    box_x: f64,
    box_y: f64,
    box_w: f64,
    box_h: f64,
) -> (f64, f64, f64, f64) {
    let scale = (box_w / img_w as f64).min(box_h / img_h as f64);
    let w = img_w as f64 * scale;
    let h = img_h as f64 * scale;
    let x = box_x + (box_w - w) / 2.0;
    let y = box_y + (box_h - h) / 2.0;
    (x, y, w, h)
}

/// Render a solid PNG for exercising the decode path.
#[cfg(test)]
pub(crate) fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    let img = ImageBuffer::from_pixel(width, height, Rgba([20u8, 30, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    #[test]
    fn detects_png_and_jpeg() {
        assert_eq!(detect_format(&tiny_png(2, 2)).unwrap(), RasterFormat::Png);
        assert_eq!(
            detect_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap(),
            RasterFormat::Jpeg
        );
    }

    #[test]
    fn rejects_svg_specifically() {
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>";
        assert!(matches!(detect_format(svg), Err(PdfError::VectorSignature)));
        let xml = b"<?xml version=\"1.0\"?><svg/>";
        assert!(matches!(detect_format(xml), Err(PdfError::VectorSignature)));
    }

    #[test]
    fn rejects_unknown_bytes() {
        assert!(matches!(
            detect_format(&[0u8; 16]),
            Err(PdfError::UnrecognizedImage)
        ));
    }

    #[test]
    fn decode_reports_dimensions() {
        let img = RasterImage::decode(&tiny_png(5, 3)).unwrap();
        assert_eq!((img.width, img.height), (5, 3));
        assert_eq!(img.rgb.len(), 5 * 3 * 3);
    }

    #[test]
    fn transparency_blends_to_white() {
        let buf = ImageBuffer::from_pixel(1, 1, Rgba([0u8, 0, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(buf)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        let img = RasterImage::decode(&out.into_inner()).unwrap();
        assert_eq!(&img.rgb, &[255, 255, 255]);
    }

    #[test]
    fn fit_preserves_aspect_and_centers() {
        let (x, y, w, h) = fit_in_box(200, 100, 0.0, 0.0, 100.0, 100.0);
        assert_eq!(w, 100.0);
        assert_eq!(h, 50.0);
        assert_eq!(x, 0.0);
        assert_eq!(y, 25.0);
    }

    #[test]
    fn xobject_carries_dimensions() {
        let img = RasterImage::decode(&tiny_png(4, 4)).unwrap();
        let stream = img.to_xobject().unwrap();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 4);
    }
}
