//! Coordinate transformation between storage, PDF and pixel spaces
//!
//! Three spaces are in play: storage geometry is percentages of the page
//! with a top-left origin; PDF points have a bottom-left origin and y
//! growing upward; pixel space is a UI container with a top-left origin.
//! This module is the only place the vertical axis flips — every other
//! component converts through here instead of re-deriving the transform.

use shared_types::{FieldKind, FieldRect};

pub const POINTS_PER_INCH: f64 = 72.0;

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub static LETTER: PageSize = PageSize::new(612.0, 792.0);
pub static LEGAL: PageSize = PageSize::new(612.0, 1008.0);
pub static A4: PageSize = PageSize::new(595.0, 842.0);
pub static TABLOID: PageSize = PageSize::new(792.0, 1224.0);

/// A rectangle in PDF point space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in UI pixel space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert storage percentages to PDF points, flipping the vertical axis.
pub fn storage_to_pdf(rect: &FieldRect, page: PageSize) -> PdfRect {
    let width = rect.width / 100.0 * page.width;
    let height = rect.height / 100.0 * page.height;
    let x = rect.x / 100.0 * page.width;
    let y = page.height - rect.y / 100.0 * page.height - height;
    PdfRect {
        x,
        y,
        width,
        height,
    }
}

/// Inverse of [`storage_to_pdf`].
pub fn pdf_to_storage(rect: &PdfRect, page: PageSize) -> FieldRect {
    let width = rect.width / page.width * 100.0;
    let height = rect.height / page.height * 100.0;
    let x = rect.x / page.width * 100.0;
    let y = (page.height - rect.y - rect.height) / page.height * 100.0;
    FieldRect::new(x, y, width, height)
}

/// Storage percentages to container pixels. Pure scaling, no axis flip.
pub fn storage_to_pixels(rect: &FieldRect, container_w: f64, container_h: f64) -> PixelRect {
    PixelRect {
        x: rect.x / 100.0 * container_w,
        y: rect.y / 100.0 * container_h,
        width: rect.width / 100.0 * container_w,
        height: rect.height / 100.0 * container_h,
    }
}

/// Inverse of [`storage_to_pixels`].
pub fn pixels_to_storage(rect: &PixelRect, container_w: f64, container_h: f64) -> FieldRect {
    FieldRect::new(
        rect.x / container_w * 100.0,
        rect.y / container_h * 100.0,
        rect.width / container_w * 100.0,
        rect.height / container_h * 100.0,
    )
}

/// Clamp geometry back inside the page. Oversized rects shrink to the
/// page; the result always satisfies `x+width <= 100`, `y+height <= 100`.
pub fn clamp_rect(rect: &FieldRect) -> FieldRect {
    let width = rect.width.clamp(0.0, 100.0);
    let height = rect.height.clamp(0.0, 100.0);
    FieldRect::new(
        rect.x.clamp(0.0, 100.0 - width),
        rect.y.clamp(0.0, 100.0 - height),
        width,
        height,
    )
}

/// Rectangle intersection test. Fields on different pages never overlap,
/// and exactly touching edges do not count.
pub fn rects_overlap(page_a: u32, a: &FieldRect, page_b: u32, b: &FieldRect) -> bool {
    if page_a != page_b {
        return false;
    }
    !(a.x + a.width <= b.x
        || b.x + b.width <= a.x
        || a.y + a.height <= b.y
        || b.y + b.height <= a.y)
}

/// Default placement size per field kind, in storage percentages.
pub fn default_size(kind: FieldKind) -> (f64, f64) {
    match kind {
        FieldKind::Signature => (25.0, 6.0),
        FieldKind::Initials => (8.0, 5.0),
        FieldKind::Text => (20.0, 4.0),
        FieldKind::Name => (20.0, 4.0),
        FieldKind::Date => (13.0, 4.0),
        FieldKind::DateSigned => (13.0, 4.0),
        FieldKind::Number => (13.0, 4.0),
        FieldKind::Checkbox => (2.5, 2.0),
        FieldKind::CheckboxGroup => (15.0, 8.0),
        FieldKind::Radio => (2.5, 2.0),
        FieldKind::Dropdown => (18.0, 4.0),
        FieldKind::Formula => (13.0, 4.0),
        FieldKind::Note => (25.0, 8.0),
        FieldKind::Attachment => (15.0, 4.0),
    }
}

/// Snap position to the nearest grid step, then clamp.
pub fn snap_to_grid(rect: &FieldRect, step: f64) -> FieldRect {
    if step <= 0.0 {
        return clamp_rect(rect);
    }
    let snapped = FieldRect::new(
        (rect.x / step).round() * step,
        (rect.y / step).round() * step,
        rect.width,
        rect.height,
    );
    clamp_rect(&snapped)
}

/// Smallest rect enclosing the selection. Empty selections have no box.
pub fn bounding_box(rects: &[FieldRect]) -> Option<FieldRect> {
    let first = rects.first()?;
    let mut min_x = first.x;
    let mut min_y = first.y;
    let mut max_x = first.x + first.width;
    let mut max_y = first.y + first.height;
    for r in &rects[1..] {
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.x + r.width);
        max_y = max_y.max(r.y + r.height);
    }
    Some(FieldRect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    CenterHorizontal,
    CenterVertical,
}

/// Align a selection against its own bounding box.
pub fn align_fields(rects: &mut [FieldRect], alignment: Alignment) {
    let Some(bounds) = bounding_box(rects) else {
        return;
    };
    for r in rects.iter_mut() {
        match alignment {
            Alignment::Left => r.x = bounds.x,
            Alignment::Right => r.x = bounds.x + bounds.width - r.width,
            Alignment::Top => r.y = bounds.y,
            Alignment::Bottom => r.y = bounds.y + bounds.height - r.height,
            Alignment::CenterHorizontal => {
                r.x = bounds.x + (bounds.width - r.width) / 2.0;
            }
            Alignment::CenterVertical => {
                r.y = bounds.y + (bounds.height - r.height) / 2.0;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Spread three or more fields so the gaps between them are equal. The
/// outermost fields stay put.
pub fn distribute_fields(rects: &mut [FieldRect], axis: Axis) {
    if rects.len() < 3 {
        return;
    }
    let mut order: Vec<usize> = (0..rects.len()).collect();
    match axis {
        Axis::Horizontal => order.sort_by(|&a, &b| rects[a].x.total_cmp(&rects[b].x)),
        Axis::Vertical => order.sort_by(|&a, &b| rects[a].y.total_cmp(&rects[b].y)),
    }

    let first = order[0];
    let last = *order.last().expect("len >= 3");
    let (span_start, span_end, occupied): (f64, f64, f64) = match axis {
        Axis::Horizontal => (
            rects[first].x,
            rects[last].x + rects[last].width,
            order.iter().map(|&i| rects[i].width).sum(),
        ),
        Axis::Vertical => (
            rects[first].y,
            rects[last].y + rects[last].height,
            order.iter().map(|&i| rects[i].height).sum(),
        ),
    };
    let gap = (span_end - span_start - occupied) / (rects.len() as f64 - 1.0);

    let mut cursor = span_start;
    for &i in &order {
        match axis {
            Axis::Horizontal => {
                rects[i].x = cursor;
                cursor += rects[i].width + gap;
            }
            Axis::Vertical => {
                rects[i].y = cursor;
                cursor += rects[i].height + gap;
            }
        }
    }
}

/// Center a field on the page along one or both axes.
pub fn center_on_page(rect: &FieldRect, horizontal: bool, vertical: bool) -> FieldRect {
    let mut out = *rect;
    if horizontal {
        out.x = (100.0 - out.width) / 2.0;
    }
    if vertical {
        out.y = (100.0 - out.height) / 2.0;
    }
    clamp_rect(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn storage_top_left_maps_to_pdf_top() {
        // A field at the very top of the page ends up just below the top
        // edge in point space.
        let rect = FieldRect::new(0.0, 0.0, 10.0, 5.0);
        let pdf = storage_to_pdf(&rect, LETTER);
        assert_eq!(pdf.x, 0.0);
        assert!((pdf.y - (792.0 - 39.6)).abs() < 1e-9);
    }

    #[test]
    fn storage_bottom_maps_to_pdf_origin() {
        let rect = FieldRect::new(0.0, 95.0, 10.0, 5.0);
        let pdf = storage_to_pdf(&rect, LETTER);
        assert!(pdf.y.abs() < 1e-9);
    }

    #[test]
    fn round_trip_letter() {
        let rect = FieldRect::new(12.5, 40.0, 25.0, 6.0);
        let back = pdf_to_storage(&storage_to_pdf(&rect, LETTER), LETTER);
        assert!((back.x - rect.x).abs() < 1e-9);
        assert!((back.y - rect.y).abs() < 1e-9);
        assert!((back.width - rect.width).abs() < 1e-9);
        assert!((back.height - rect.height).abs() < 1e-9);
    }

    #[test]
    fn pixel_conversion_does_not_flip() {
        let rect = FieldRect::new(0.0, 0.0, 10.0, 5.0);
        let px = storage_to_pixels(&rect, 900.0, 1200.0);
        // Top of the page stays at the top of the container.
        assert_eq!(px.y, 0.0);
        assert_eq!(px.width, 90.0);
    }

    #[test]
    fn clamp_pushes_back_inside() {
        let clamped = clamp_rect(&FieldRect::new(95.0, 99.0, 20.0, 5.0));
        assert!(clamped.x + clamped.width <= 100.0);
        assert!(clamped.y + clamped.height <= 100.0);
    }

    #[test]
    fn different_pages_never_overlap() {
        let a = FieldRect::new(10.0, 10.0, 20.0, 10.0);
        assert!(!rects_overlap(1, &a, 2, &a));
        assert!(rects_overlap(1, &a, 1, &a));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = FieldRect::new(10.0, 10.0, 20.0, 10.0);
        let b = FieldRect::new(30.0, 10.0, 20.0, 10.0);
        assert!(!rects_overlap(1, &a, 1, &b));
    }

    #[test]
    fn default_sizes_fit_the_page() {
        for kind in [
            FieldKind::Signature,
            FieldKind::Initials,
            FieldKind::Text,
            FieldKind::Name,
            FieldKind::Date,
            FieldKind::DateSigned,
            FieldKind::Number,
            FieldKind::Checkbox,
            FieldKind::CheckboxGroup,
            FieldKind::Radio,
            FieldKind::Dropdown,
            FieldKind::Formula,
            FieldKind::Note,
            FieldKind::Attachment,
        ] {
            let (w, h) = default_size(kind);
            assert!(w > 0.0 && w <= 100.0);
            assert!(h > 0.0 && h <= 100.0);
        }
        // Signature boxes dwarf checkboxes.
        assert!(default_size(FieldKind::Signature).0 > default_size(FieldKind::Checkbox).0);
    }

    #[test]
    fn snap_rounds_to_step() {
        let snapped = snap_to_grid(&FieldRect::new(12.3, 7.8, 10.0, 5.0), 5.0);
        assert_eq!(snapped.x, 10.0);
        assert_eq!(snapped.y, 10.0);
    }

    #[test]
    fn bounding_box_encloses_selection() {
        let rects = [
            FieldRect::new(10.0, 10.0, 10.0, 5.0),
            FieldRect::new(40.0, 30.0, 20.0, 10.0),
        ];
        let bb = bounding_box(&rects).unwrap();
        assert_eq!(bb.x, 10.0);
        assert_eq!(bb.y, 10.0);
        assert_eq!(bb.width, 50.0);
        assert_eq!(bb.height, 30.0);
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn align_left_snaps_to_min_x() {
        let mut rects = vec![
            FieldRect::new(10.0, 10.0, 10.0, 5.0),
            FieldRect::new(40.0, 30.0, 20.0, 10.0),
        ];
        align_fields(&mut rects, Alignment::Left);
        assert_eq!(rects[0].x, 10.0);
        assert_eq!(rects[1].x, 10.0);
    }

    #[test]
    fn distribute_equalizes_gaps() {
        let mut rects = vec![
            FieldRect::new(0.0, 0.0, 10.0, 5.0),
            FieldRect::new(15.0, 0.0, 10.0, 5.0),
            FieldRect::new(60.0, 0.0, 10.0, 5.0),
        ];
        distribute_fields(&mut rects, Axis::Horizontal);
        let gap1 = rects[1].x - (rects[0].x + rects[0].width);
        let gap2 = rects[2].x - (rects[1].x + rects[1].width);
        assert!((gap1 - gap2).abs() < 1e-9);
        assert_eq!(rects[0].x, 0.0);
        assert_eq!(rects[2].x + rects[2].width, 70.0);
    }

    #[test]
    fn center_on_page_both_axes() {
        let centered = center_on_page(&FieldRect::new(0.0, 0.0, 20.0, 10.0), true, true);
        assert_eq!(centered.x, 40.0);
        assert_eq!(centered.y, 45.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn in_bounds_rect() -> impl Strategy<Value = FieldRect> {
        (0.0f64..100.0, 0.0f64..100.0, 0.1f64..100.0, 0.1f64..100.0).prop_map(|(x, y, w, h)| {
            let width = w.min(100.0 - x).max(0.05);
            let height = h.min(100.0 - y).max(0.05);
            FieldRect::new(x.min(100.0 - width), y.min(100.0 - height), width, height)
        })
    }

    fn page_size() -> impl Strategy<Value = PageSize> {
        prop_oneof![Just(LETTER), Just(LEGAL), Just(A4), Just(TABLOID)]
    }

    proptest! {
        /// storage -> pdf -> storage reproduces the original within
        /// floating-point tolerance for any in-bounds field.
        #[test]
        fn storage_pdf_round_trip(rect in in_bounds_rect(), page in page_size()) {
            let back = pdf_to_storage(&storage_to_pdf(&rect, page), page);
            let tol = 1e-6;
            prop_assert!((back.x - rect.x).abs() < tol);
            prop_assert!((back.y - rect.y).abs() < tol);
            prop_assert!((back.width - rect.width).abs() < tol);
            prop_assert!((back.height - rect.height).abs() < tol);
        }

        /// Moving a field down in storage moves it down the page in
        /// point space (smaller y).
        #[test]
        fn vertical_axis_flips(rect in in_bounds_rect(), page in page_size()) {
            prop_assume!(rect.y + rect.height + 1.0 <= 100.0);
            let lower = FieldRect::new(rect.x, rect.y + 1.0, rect.width, rect.height);
            let a = storage_to_pdf(&rect, page);
            let b = storage_to_pdf(&lower, page);
            prop_assert!(b.y < a.y);
        }

        /// Pixel conversion round-trips and preserves orientation.
        #[test]
        fn pixel_round_trip(
            rect in in_bounds_rect(),
            cw in 100.0f64..4000.0,
            ch in 100.0f64..4000.0,
        ) {
            let back = pixels_to_storage(&storage_to_pixels(&rect, cw, ch), cw, ch);
            let tol = 1e-6;
            prop_assert!((back.x - rect.x).abs() < tol);
            prop_assert!((back.y - rect.y).abs() < tol);
        }

        /// Clamp never yields geometry outside the page, for any input.
        #[test]
        fn clamp_never_exceeds_bounds(
            x in -200.0f64..200.0,
            y in -200.0f64..200.0,
            w in 0.0f64..200.0,
            h in 0.0f64..200.0,
        ) {
            let clamped = clamp_rect(&FieldRect::new(x, y, w, h));
            prop_assert!(clamped.x >= 0.0);
            prop_assert!(clamped.y >= 0.0);
            prop_assert!(clamped.x + clamped.width <= 100.0 + 1e-9);
            prop_assert!(clamped.y + clamped.height <= 100.0 + 1e-9);
        }

        /// Overlap is symmetric.
        #[test]
        fn overlap_symmetry(a in in_bounds_rect(), b in in_bounds_rect(), page in 1u32..5) {
            prop_assert_eq!(
                rects_overlap(page, &a, page, &b),
                rects_overlap(page, &b, page, &a)
            );
        }

        /// Snapping lands on the grid and stays in bounds.
        #[test]
        fn snap_lands_on_grid(rect in in_bounds_rect(), step in 0.5f64..10.0) {
            let snapped = snap_to_grid(&rect, step);
            prop_assert!(snapped.x + snapped.width <= 100.0 + 1e-9);
            prop_assert!(snapped.y + snapped.height <= 100.0 + 1e-9);
        }
    }
}
