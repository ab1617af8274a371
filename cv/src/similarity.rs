//! Pixel-level similarity metrics.
//!
//! All three metrics consume two grayscale-reduced buffers of equal length
//! (see `Image::gray_values`) and return a score in [0, 1]. The caller is
//! responsible for resizing the template to the cell's dimensions first;
//! mismatched lengths score 0 rather than panicking.

/// Which pixel-similarity metric a strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Normalized cross-correlation, remapped from [-1, 1] to [0, 1].
    Ncc,
    /// Mean squared difference, mapped through 1 / (1 + mean/255).
    Ssd,
    /// Structural similarity (global window).
    Ssim,
}

pub fn score(algorithm: Algorithm, a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    match algorithm {
        Algorithm::Ncc => ncc(a, b),
        Algorithm::Ssd => ssd(a, b),
        Algorithm::Ssim => ssim(a, b),
    }
}

#[inline]
fn mean(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64).sum::<f64>() / v.len() as f64
}

/// Normalized cross-correlation.
///
/// Returns exactly 0 when either signal has zero variance (flat image); a
/// flat patch carries no structure to correlate against. Accumulation is done
/// in f64 so a buffer correlated against itself scores exactly 1.0 after the
/// f32 rounding.
pub fn ncc(a: &[f32], b: &[f32]) -> f32 {
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }

    let r = (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0);
    ((r + 1.0) / 2.0) as f32
}

/// Sum-of-squared-differences similarity.
///
/// Zero difference maps to 1.0; large differences approach 0 asymptotically.
pub fn ssd(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let d = (x - y) as f64;
        sum += d * d;
    }
    let mean_ssd = sum / a.len() as f64;
    (1.0 / (1.0 + mean_ssd / 255.0)) as f32
}

/// Structural similarity index (single global window).
pub fn ssim(a: &[f32], b: &[f32]) -> f32 {
    const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
    const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

    let mean_a = mean(a);
    let mean_b = mean(b);

    let n = a.len() as f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    let mut cov = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        var_a += dx * dx;
        var_b += dy * dy;
        cov += dx * dy;
    }
    var_a /= n;
    var_b /= n;
    cov /= n;

    let numerator = (2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2);
    let denominator = (mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2);
    (numerator / denominator).clamp(0.0, 1.0) as f32
}
