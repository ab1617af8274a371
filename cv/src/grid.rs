//! Inventory-slot grid segmentation.
//!
//! Known resolutions resolve through a preset table and are exactly
//! reproducible. Anything else goes through a contour-based auto-detection
//! pass that looks for the repeating square slot pattern; when that fails too,
//! the result is an empty list and the caller falls back to text-only
//! detection.

use crate::image::Image;

/// Axis-aligned rectangle in screenshot pixel space denoting one candidate
/// inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    fn right(&self) -> u32 {
        self.x + self.width
    }
    fn bottom(&self) -> u32 {
        self.y + self.height
    }
    fn center_y(&self) -> u32 {
        self.y + self.height / 2
    }

    fn iou(&self, other: &Roi) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter = (x2 - x1) as f32 * (y2 - y1) as f32;
        let a1 = (self.width as f32) * (self.height as f32);
        let a2 = (other.width as f32) * (other.height as f32);
        inter / (a1 + a2 - inter)
    }
}

/// One preset slot layout: a uniform grid anchored at a fixed origin.
#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    pub origin_x: u32,
    pub origin_y: u32,
    pub cell: u32,
    pub gap: u32,
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    pub fn rois(&self) -> Vec<Roi> {
        let mut out = Vec::with_capacity((self.columns * self.rows) as usize);
        for row in 0..self.rows {
            for col in 0..self.columns {
                out.push(Roi {
                    x: self.origin_x + col * (self.cell + self.gap),
                    y: self.origin_y + row * (self.cell + self.gap),
                    width: self.cell,
                    height: self.cell,
                });
            }
        }
        out
    }
}

/// Slot layouts for known capture resolutions.
///
/// Coordinates were measured on the inventory panel at each resolution; the
/// panel scales with UI height, so ultrawide keeps the 1080p vertical layout.
const PRESETS: &[((u32, u32), GridLayout)] = &[
    (
        (1280, 720),
        GridLayout { origin_x: 469, origin_y: 560, cell: 42, gap: 5, columns: 8, rows: 2 },
    ),
    (
        (1600, 900),
        GridLayout { origin_x: 587, origin_y: 700, cell: 53, gap: 7, columns: 8, rows: 2 },
    ),
    (
        (1920, 1080),
        GridLayout { origin_x: 704, origin_y: 840, cell: 64, gap: 8, columns: 8, rows: 2 },
    ),
    (
        (2560, 1080),
        GridLayout { origin_x: 1024, origin_y: 840, cell: 64, gap: 8, columns: 8, rows: 2 },
    ),
    (
        (2560, 1440),
        GridLayout { origin_x: 939, origin_y: 1120, cell: 85, gap: 11, columns: 8, rows: 2 },
    ),
    (
        (3840, 2160),
        GridLayout { origin_x: 1408, origin_y: 1680, cell: 128, gap: 16, columns: 8, rows: 2 },
    ),
];

pub fn preset_for(width: u32, height: u32) -> Option<&'static GridLayout> {
    PRESETS
        .iter()
        .find(|((w, h), _)| *w == width && *h == height)
        .map(|(_, layout)| layout)
}

/// Compute the candidate slot rectangles for a screenshot.
///
/// Exact preset match first; contour-based auto-detection otherwise; `[]`
/// when both fail. Fully deterministic for a given input.
pub fn compute_grid(image: &Image) -> Vec<Roi> {
    if let Some(layout) = preset_for(image.width(), image.height()) {
        return layout.rois();
    }
    auto_detect_grid(image)
}

/// Contour-based fallback: binarize, collect square-ish outer contours sized
/// like inventory slots, and keep rows that repeat.
fn auto_detect_grid(image: &Image) -> Vec<Roi> {
    use imageproc::contours::{BorderType, find_contours};
    use imageproc::contrast::{ThresholdType, equalize_histogram, otsu_level, threshold};

    let w = image.width();
    let h = image.height();
    if w < 64 || h < 64 {
        return vec![];
    }

    let gray = equalize_histogram(&image.to_owned_image().to_gray_image());
    let level = otsu_level(&gray);
    let mut bin = threshold(&gray, level, ThresholdType::Binary);
    normalize_binary(&mut bin);

    let contours = find_contours::<i32>(&bin);

    let min_side = (h as f32 * 0.03) as u32;
    let max_side = (h as f32 * 0.20) as u32;

    let mut rects = Vec::new();
    for c in contours {
        if c.border_type != BorderType::Outer {
            continue;
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for p in &c.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if min_x < 0 || min_y < 0 {
            continue;
        }

        let rw = (max_x - min_x + 1).max(0) as u32;
        let rh = (max_y - min_y + 1).max(0) as u32;
        if rw < min_side || rh < min_side || rw > max_side || rh > max_side {
            continue;
        }
        // Slots are close to square.
        let aspect = rw as f32 / rh as f32;
        if !(0.80..=1.25).contains(&aspect) {
            continue;
        }

        rects.push(Roi {
            x: min_x as u32,
            y: min_y as u32,
            width: rw,
            height: rh,
        });
    }

    if rects.len() < 4 {
        return vec![];
    }

    // Group candidates by approximate row. BTreeMap keeps the row order (and
    // therefore the output) deterministic.
    let tol = (h as f32 * 0.04).round().max(1.0) as u32;
    let mut rows: std::collections::BTreeMap<u32, Vec<Roi>> = std::collections::BTreeMap::new();
    for r in rects {
        rows.entry(r.center_y() / tol).or_default().push(r);
    }

    let mut out: Vec<Roi> = Vec::new();
    for (_, mut row) in rows {
        // A grid row repeats; a lone square is usually a portrait or button.
        if row.len() < 2 {
            continue;
        }
        row.sort_by_key(|r| r.x);

        for r in row {
            if let Some(prev) = out.last_mut() {
                if prev.iou(&r) > 0.5 {
                    // Keep the larger rect.
                    let prev_area = (prev.width as u64) * (prev.height as u64);
                    let r_area = (r.width as u64) * (r.height as u64);
                    if r_area > prev_area {
                        *prev = r;
                    }
                    continue;
                }
            }
            out.push(r);
        }
    }

    if out.len() < 4 {
        return vec![];
    }
    out
}

fn normalize_binary(bin: &mut image::GrayImage) {
    // Contours trace the white side. Slot shapes are a minority of the frame,
    // so invert whenever white is the majority (light UI themes).
    let mut white = 0u64;
    let mut black = 0u64;
    for p in bin.pixels() {
        if p.0[0] > 0 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if white > black {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Color, OwnedImage};

    #[test]
    fn preset_grid_is_reproducible() {
        let img = OwnedImage::filled(1920, 1080, Color::BLACK);
        let a = compute_grid(&img.as_image());
        let b = compute_grid(&img.as_image());

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_eq!(a[0], Roi { x: 704, y: 840, width: 64, height: 64 });
        // Row-major: second row starts after 8 cells.
        assert_eq!(a[8].y, 840 + 64 + 8);
    }

    #[test]
    fn featureless_unknown_resolution_yields_no_regions() {
        let img = OwnedImage::filled(777, 444, Color::new(40, 40, 40));
        assert!(compute_grid(&img.as_image()).is_empty());
    }

    #[test]
    fn auto_detection_finds_a_synthetic_slot_row() {
        // Unknown resolution with a row of bright square slots on black.
        let mut img = OwnedImage::filled(800, 500, Color::BLACK);
        for i in 0..4u32 {
            let slot = OwnedImage::filled(40, 40, Color::new(230, 230, 230));
            img.blit(100 + i * 60, 300, slot.as_image());
        }

        let rois = compute_grid(&img.as_image());
        assert_eq!(rois.len(), 4);
        for (i, roi) in rois.iter().enumerate() {
            assert!((roi.x as i64 - (100 + i as i64 * 60)).abs() <= 2, "{roi:?}");
            assert!((roi.y as i64 - 300).abs() <= 2);
            assert!((roi.width as i64 - 40).abs() <= 3);
        }
    }

    #[test]
    fn roi_iou() {
        let a = Roi { x: 0, y: 0, width: 10, height: 10 };
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let b = Roi { x: 20, y: 20, width: 10, height: 10 };
        assert_eq!(a.iou(&b), 0.0);
    }
}
