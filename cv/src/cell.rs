//! Per-cell classification: emptiness, border rarity, color profile.
//!
//! These are the cheap discriminators computed once per cell before any
//! template scoring happens. They are all sampled at every 4th pixel; slot
//! icons are large enough that the subsample is representative.

use catalog::Rarity;

use crate::image::{Color, Image};

/// Subsampling stride for feature extraction.
const SAMPLE_STRIDE: usize = 4;

/// Reference variance threshold below which a cell counts as empty.
///
/// Tunable constant: the UI renders empty slots as a flat fill, so total
/// per-channel variance (R+G+B) sits near zero there.
pub const EMPTY_CELL_VARIANCE: f32 = 500.0;

/// Width of the border ring sampled for rarity detection.
const BORDER_RING: u32 = 3;

fn samples(image: &Image) -> impl Iterator<Item = Color> {
    image.pixels().step_by(SAMPLE_STRIDE)
}

/// Low-variance test for empty inventory slots.
pub fn is_empty_cell(image: &Image, variance_threshold: f32) -> bool {
    let mut count = 0u32;
    let mut sum = [0.0f32; 3];
    let mut sum_sq = [0.0f32; 3];

    for c in samples(image) {
        for (i, v) in [c.r, c.g, c.b].into_iter().enumerate() {
            let v = v as f32;
            sum[i] += v;
            sum_sq[i] += v * v;
        }
        count += 1;
    }

    if count == 0 {
        return true;
    }

    let n = count as f32;
    let total_variance: f32 = (0..3)
        .map(|i| {
            let mean = sum[i] / n;
            (sum_sq[i] / n - mean * mean).max(0.0)
        })
        .sum();

    total_variance < variance_threshold
}

// ----------

struct RarityBorder {
    rarity: Rarity,
    color: Color,
    tolerance: f32,
}

/// Reference border colors per rarity, with per-rarity tolerance radii.
///
/// Order matters: entries are scanned in rarity rank order, and a strictly
/// smaller distance is required to displace an earlier hit, so equidistant
/// ties resolve to the lower rank.
const RARITY_BORDERS: [RarityBorder; 5] = [
    RarityBorder {
        rarity: Rarity::Common,
        color: Color::new(158, 158, 158),
        tolerance: 60.0,
    },
    RarityBorder {
        rarity: Rarity::Uncommon,
        color: Color::new(76, 175, 80),
        tolerance: 70.0,
    },
    RarityBorder {
        rarity: Rarity::Rare,
        color: Color::new(33, 150, 243),
        tolerance: 70.0,
    },
    RarityBorder {
        rarity: Rarity::Epic,
        color: Color::new(156, 39, 176),
        tolerance: 70.0,
    },
    RarityBorder {
        rarity: Rarity::Legendary,
        color: Color::new(255, 152, 0),
        tolerance: 70.0,
    },
];

/// Average color of the cell's border ring.
fn border_average(image: &Image) -> Color {
    let w = image.width();
    let h = image.height();
    if w <= BORDER_RING * 2 || h <= BORDER_RING * 2 {
        return image.average_color();
    }

    let mut count = 0u32;
    let mut r = 0u32;
    let mut g = 0u32;
    let mut b = 0u32;
    for y in 0..h {
        for x in 0..w {
            let on_ring =
                x < BORDER_RING || x >= w - BORDER_RING || y < BORDER_RING || y >= h - BORDER_RING;
            if !on_ring {
                continue;
            }
            let c = image.pixel(x, y);
            r += c.r as u32;
            g += c.g as u32;
            b += c.b as u32;
            count += 1;
        }
    }

    Color {
        r: (r / count) as u8,
        g: (g / count) as u8,
        b: (b / count) as u8,
    }
}

/// Classify the cell's border ring against the known rarity colors.
///
/// Returns the closest rarity within its tolerance radius, or `None` when no
/// reference color qualifies (unframed cells, tome/skill slots).
pub fn detect_border_rarity(image: &Image) -> Option<Rarity> {
    let avg = border_average(image);

    let mut best: Option<(Rarity, f32)> = None;
    for reference in &RARITY_BORDERS {
        let dist = avg.distance(reference.color);
        if dist > reference.tolerance {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((reference.rarity, dist)),
        }
    }

    best.map(|(rarity, _)| rarity)
}

// ----------

/// Named color categories used for coarse candidate filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBucket {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Gray,
}

impl ColorBucket {
    pub const ALL: [ColorBucket; 8] = [
        ColorBucket::Red,
        ColorBucket::Orange,
        ColorBucket::Yellow,
        ColorBucket::Green,
        ColorBucket::Cyan,
        ColorBucket::Blue,
        ColorBucket::Purple,
        ColorBucket::Gray,
    ];

    fn index(&self) -> usize {
        // Declaration order matches `ALL`.
        *self as usize
    }

    fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        // Dark or washed-out pixels carry no usable hue.
        if v < 0.15 || s < 0.18 {
            return Self::Gray;
        }
        match h {
            _ if h < 15.0 => Self::Red,
            _ if h < 45.0 => Self::Orange,
            _ if h < 70.0 => Self::Yellow,
            _ if h < 165.0 => Self::Green,
            _ if h < 200.0 => Self::Cyan,
            _ if h < 255.0 => Self::Blue,
            _ if h < 345.0 => Self::Purple,
            _ => Self::Red,
        }
    }
}

/// Per-bucket pixel-fraction histogram plus the dominant bucket.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ColorProfile {
    pub dominant: ColorBucket,
    pub histogram: [f32; 8],
}

impl ColorProfile {
    /// Histogram overlap: sum of per-bucket minima, in [0, 1].
    pub fn overlap(&self, other: &ColorProfile) -> f32 {
        self.histogram
            .iter()
            .zip(&other.histogram)
            .map(|(a, b)| a.min(*b))
            .sum()
    }
}

/// Bucket every sampled pixel's hue/value and report the dominant bucket
/// alongside the full histogram.
pub fn extract_color_profile(image: &Image) -> ColorProfile {
    let mut counts = [0u32; 8];
    let mut total = 0u32;

    for c in samples(image) {
        let (h, s, v) = rgb_to_hsv(c);
        counts[ColorBucket::from_hsv(h, s, v).index()] += 1;
        total += 1;
    }

    let total = total.max(1) as f32;
    let mut histogram = [0.0f32; 8];
    for (slot, count) in histogram.iter_mut().zip(counts) {
        *slot = count as f32 / total;
    }

    let dominant = ColorBucket::ALL
        .iter()
        .copied()
        .max_by(|a, b| {
            histogram[a.index()]
                .partial_cmp(&histogram[b.index()])
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(ColorBucket::Gray);

    ColorProfile {
        dominant,
        histogram,
    }
}

/// Average hue/saturation/value over the sampled pixels.
pub fn average_hsv(image: &Image) -> (f32, f32, f32) {
    let mut count = 0u32;
    let mut h_sum = 0.0f32;
    let mut s_sum = 0.0f32;
    let mut v_sum = 0.0f32;

    for c in samples(image) {
        let (h, s, v) = rgb_to_hsv(c);
        h_sum += h;
        s_sum += s;
        v_sum += v;
        count += 1;
    }

    if count == 0 {
        return (0.0, 0.0, 0.0);
    }
    let n = count as f32;
    (h_sum / n, s_sum / n, v_sum / n)
}

/// RGB -> HSV. Hue in [0, 360), saturation and value in [0, 1].
pub fn rgb_to_hsv(c: Color) -> (f32, f32, f32) {
    let r = c.r as f32 / 255.0;
    let g = c.g as f32 / 255.0;
    let b = c.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (h, s, max)
}

// ----------

/// Cheap per-cell discriminators, computed once per detection run.
#[derive(Debug, Clone)]
pub struct CellFeatures {
    pub is_empty: bool,
    pub border_rarity: Option<Rarity>,
    pub profile: Option<ColorProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::OwnedImage;

    #[test]
    fn uniform_cell_is_empty() {
        let img = OwnedImage::filled(32, 32, Color::new(90, 90, 90));
        assert!(is_empty_cell(&img.as_image(), EMPTY_CELL_VARIANCE));
    }

    #[test]
    fn high_contrast_cell_is_not_empty() {
        let mut img = OwnedImage::filled(32, 32, Color::BLACK);
        img.blit(0, 0, OwnedImage::filled(16, 32, Color::WHITE).as_image());
        assert!(!is_empty_cell(&img.as_image(), EMPTY_CELL_VARIANCE));
    }

    #[test]
    fn border_rarity_detected_from_ring() {
        // Legendary orange frame around a dark center.
        let mut img = OwnedImage::filled(32, 32, Color::new(255, 152, 0));
        img.blit(3, 3, OwnedImage::filled(26, 26, Color::new(20, 20, 20)).as_image());
        assert_eq!(detect_border_rarity(&img.as_image()), Some(Rarity::Legendary));

        let mut img = OwnedImage::filled(32, 32, Color::new(33, 150, 243));
        img.blit(3, 3, OwnedImage::filled(26, 26, Color::new(20, 20, 20)).as_image());
        assert_eq!(detect_border_rarity(&img.as_image()), Some(Rarity::Rare));
    }

    #[test]
    fn border_rarity_none_when_out_of_tolerance() {
        let img = OwnedImage::filled(32, 32, Color::new(0, 0, 0));
        assert_eq!(detect_border_rarity(&img.as_image()), None);
    }

    #[test]
    fn color_profile_dominant_bucket() {
        let img = OwnedImage::filled(32, 32, Color::new(200, 30, 30));
        let profile = extract_color_profile(&img.as_image());
        assert_eq!(profile.dominant, ColorBucket::Red);
        assert!(profile.histogram[0] > 0.99);
    }

    #[test]
    fn color_profile_overlap_bounds() {
        let red = extract_color_profile(&OwnedImage::filled(16, 16, Color::new(200, 30, 30)).as_image());
        let blue = extract_color_profile(&OwnedImage::filled(16, 16, Color::new(30, 60, 220)).as_image());

        assert!((red.overlap(&red) - 1.0).abs() < 1e-5);
        assert!(red.overlap(&blue) < 0.05);
    }

    #[test]
    fn hsv_conversion_known_points() {
        let (h, s, v) = rgb_to_hsv(Color::new(255, 0, 0));
        assert!(h.abs() < 1e-3);
        assert!((s - 1.0).abs() < 1e-5);
        assert!((v - 1.0).abs() < 1e-5);

        let (_, s, v) = rgb_to_hsv(Color::new(128, 128, 128));
        assert!(s.abs() < 1e-5);
        assert!((v - 128.0 / 255.0).abs() < 1e-3);
    }
}
