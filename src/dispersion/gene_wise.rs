//! Gene-wise dispersion estimates

use crate::stats::{mean, sample_variance};

/// Mean of 1/s over samples, the Poisson part of the normalized-count variance
pub fn mean_inverse_size_factor(size_factors: &[f64]) -> f64 {
    size_factors.iter().map(|&s| 1.0 / s).sum::<f64>() / size_factors.len() as f64
}

/// Per-sample fitted value of the one-factor linear model: its level mean
fn level_means(normalized: &[f64], groups: &[usize], n_levels: usize) -> Vec<f64> {
    let mut sums = vec![0.0; n_levels];
    let mut sizes = vec![0usize; n_levels];
    for (&y, &g) in normalized.iter().zip(groups) {
        sums[g] += y;
        sizes[g] += 1;
    }
    groups
        .iter()
        .map(|&g| sums[g] / sizes[g].max(1) as f64)
        .collect()
}

/// Rough estimate: sum(((y - mu)^2 - mu) / mu^2) / (m - p), mu floored at 1
pub fn rough_disp_estimate(normalized: &[f64], groups: &[usize], n_levels: usize) -> f64 {
    let m = normalized.len();
    if m <= n_levels {
        return f64::NAN;
    }
    let mu = level_means(normalized, groups, n_levels);
    let sum: f64 = normalized
        .iter()
        .zip(&mu)
        .map(|(&y, &mu)| {
            let mu = mu.max(1.0);
            ((y - mu).powi(2) - mu) / (mu * mu)
        })
        .sum();
    (sum / (m - n_levels) as f64).max(0.0)
}

/// Moments estimate: (var - xim * mean) / mean^2
pub fn moments_disp_estimate(normalized: &[f64], xim: f64) -> f64 {
    let base_mean = mean(normalized);
    if base_mean <= 0.0 {
        return f64::INFINITY;
    }
    (sample_variance(normalized) - xim * base_mean) / (base_mean * base_mean)
}

/// Gene-wise dispersion: the smaller of the two estimates, clamped
///
/// Returns NaN for a gene with no counts.
pub fn gene_wise_dispersion(
    normalized: &[f64],
    groups: &[usize],
    n_levels: usize,
    xim: f64,
    min_disp: f64,
    max_disp: f64,
) -> f64 {
    if normalized.iter().all(|&y| y == 0.0) {
        return f64::NAN;
    }
    let rough = rough_disp_estimate(normalized, groups, n_levels);
    let moments = moments_disp_estimate(normalized, xim);
    rough.min(moments).clamp(min_disp, max_disp)
}
