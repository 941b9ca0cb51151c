//! Helvetica metrics and fit-to-box font sizing
//!
//! Widths are the standard AFM values in 1/1000 em for the printable
//! ASCII range; characters outside it are measured at the average glyph
//! width. Tables are immutable statics.

/// Smallest size still considered readable when burned into a page.
pub const MIN_FONT_SIZE: f64 = 5.0;

/// Embedded values never grow past this, however tall the box is.
pub const MAX_FONT_SIZE: f64 = 18.0;

const FALLBACK_WIDTH: u16 = 556;

/// Helvetica widths for `' '..='~'`.
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // 'A'..'P'
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'Q'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // 'a'..'p'
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'q'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold widths for `' '..='~'`.
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667,
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611,
    611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
    /// Oblique shares the upright metrics.
    HelveticaOblique,
}

impl FontFace {
    /// PostScript base font name for the page resource dictionary.
    pub fn base_name(&self) -> &'static str {
        match self {
            FontFace::Helvetica => "Helvetica",
            FontFace::HelveticaBold => "Helvetica-Bold",
            FontFace::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Resource key used in content streams.
    pub fn resource_key(&self) -> &'static str {
        match self {
            FontFace::Helvetica => "FeH",
            FontFace::HelveticaBold => "FeHB",
            FontFace::HelveticaOblique => "FeHO",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            FontFace::Helvetica | FontFace::HelveticaOblique => &HELVETICA_WIDTHS,
            FontFace::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Width of `text` at `size` points.
pub fn measure_text(text: &str, size: f64, face: FontFace) -> f64 {
    let widths = face.widths();
    let units: u64 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7E).contains(&code) {
                widths[(code - 0x20) as usize] as u64
            } else {
                FALLBACK_WIDTH as u64
            }
        })
        .sum();
    units as f64 / 1000.0 * size
}

/// Pick the largest size, bounded by the box height, at which `text`
/// fits `box_width`. Steps down in half-point increments and floors at
/// [`MIN_FONT_SIZE`] even if the text still does not fit.
pub fn fit_font_size(text: &str, box_width: f64, box_height: f64, face: FontFace) -> f64 {
    let mut size = (box_height * 0.72).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    while size > MIN_FONT_SIZE && measure_text(text, size, face) > box_width {
        size -= 0.5;
    }
    size.max(MIN_FONT_SIZE)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Longer text never fits at a larger size than shorter text.
        #[test]
        fn fitting_is_monotonic(base in "[a-zA-Z ]{1,40}", extra in "[a-zA-Z]{1,20}") {
            let longer = format!("{}{}", base, extra);
            let fit_base = fit_font_size(&base, 100.0, 18.0, FontFace::Helvetica);
            let fit_longer = fit_font_size(&longer, 100.0, 18.0, FontFace::Helvetica);
            prop_assert!(fit_longer <= fit_base);
        }

        /// The fitted size respects both bounds.
        #[test]
        fn fit_within_bounds(
            text in ".{0,120}",
            w in 5.0f64..400.0,
            h in 5.0f64..100.0,
        ) {
            let size = fit_font_size(&text, w, h, FontFace::HelveticaBold);
            prop_assert!(size >= MIN_FONT_SIZE);
            prop_assert!(size <= MAX_FONT_SIZE);
        }
    }
}
