//! Cook's distance outlier detection and replacement
//!
//! Cells are the levels of the condition factor. Cook's distances use a
//! robust method-of-moments dispersion so that a single outlier cannot mask
//! itself by inflating the dispersion.

use ndarray::{Array2, ArrayView2};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::stats::{round_half_even, trimmed_mean};

/// Floor of the robust dispersion used for Cook's distances
pub const MIN_ROBUST_DISP: f64 = 0.04;

/// Cells need this many samples to enter the max-Cook's filter
pub const MIN_CELL_FOR_FILTER: usize = 3;

/// Trim ratio and scale constant for a cell of `n` samples
fn trim_constants(n: usize) -> (f64, f64) {
    if n <= 3 {
        (1.0 / 3.0, 2.04)
    } else if n <= 23 {
        (1.0 / 4.0, 1.86)
    } else {
        (1.0 / 8.0, 1.51)
    }
}

fn trimmed_variance(values: &[f64], trim: f64, scale: f64) -> f64 {
    let center = trimmed_mean(values, trim);
    let sq: Vec<f64> = values.iter().map(|&v| (v - center).powi(2)).collect();
    scale * trimmed_mean(&sq, trim)
}

/// Number of samples in each level
pub fn cell_sizes(groups: &[usize], n_levels: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; n_levels];
    for &g in groups {
        sizes[g] += 1;
    }
    sizes
}

/// Robust method-of-moments dispersion of one gene
///
/// The variance is the largest trimmed within-cell variance over cells with
/// at least three samples, or the trimmed variance across all samples when no
/// such cell exists.
pub fn robust_moments_dispersion(normalized: &[f64], groups: &[usize], n_levels: usize) -> f64 {
    let sizes = cell_sizes(groups, n_levels);
    let large: Vec<usize> = (0..n_levels).filter(|&l| sizes[l] >= 3).collect();

    let variance = if large.is_empty() {
        trimmed_variance(normalized, 1.0 / 8.0, 1.51)
    } else {
        large
            .iter()
            .map(|&level| {
                let values: Vec<f64> = normalized
                    .iter()
                    .zip(groups)
                    .filter(|(_, &g)| g == level)
                    .map(|(&v, _)| v)
                    .collect();
                let (trim, scale) = trim_constants(values.len());
                trimmed_variance(&values, trim, scale)
            })
            .fold(0.0, f64::max)
    };

    let mean = normalized.iter().sum::<f64>() / normalized.len() as f64;
    if mean > 0.0 {
        ((variance - mean) / (mean * mean)).max(MIN_ROBUST_DISP)
    } else {
        MIN_ROBUST_DISP
    }
}

/// Cook's distances of one gene
///
/// D_j = (y_j - mu_j)^2 / (mu_j + alpha mu_j^2) / p * h_j / (1 - h_j)^2.
/// Samples alone in their cell (h = 1) have no defined distance and get NaN.
pub fn cooks_distances(counts: &[f64], mu: &[f64], hat: &[f64], alpha: f64, n_coefs: usize) -> Vec<f64> {
    counts
        .iter()
        .zip(mu)
        .zip(hat)
        .map(|((&y, &mu), &h)| {
            if h >= 1.0 - 1e-12 {
                return f64::NAN;
            }
            let pearson_sq = (y - mu).powi(2) / (mu + alpha * mu * mu);
            pearson_sq / n_coefs as f64 * h / (1.0 - h).powi(2)
        })
        .collect()
}

/// 0.99 quantile of F(p, m - p)
pub fn cooks_cutoff(n_samples: usize, n_coefs: usize) -> f64 {
    if n_samples <= n_coefs {
        return f64::INFINITY;
    }
    match FisherSnedecor::new(n_coefs as f64, (n_samples - n_coefs) as f64) {
        Ok(f) => f.inverse_cdf(0.99),
        Err(_) => f64::INFINITY,
    }
}

/// Largest Cook's distance of each gene over the samples that count
///
/// Only samples in cells of at least [`MIN_CELL_FOR_FILTER`] samples are
/// considered, and samples flagged in `excluded` (already subject to
/// replacement) are skipped.
pub fn max_cooks(cooks: ArrayView2<'_, f64>, groups: &[usize], n_levels: usize, excluded: &[bool]) -> Vec<f64> {
    let sizes = cell_sizes(groups, n_levels);
    let eligible: Vec<usize> = (0..groups.len())
        .filter(|&j| sizes[groups[j]] >= MIN_CELL_FOR_FILTER && !excluded[j])
        .collect();

    cooks
        .rows()
        .into_iter()
        .map(|row| {
            eligible
                .iter()
                .map(|&j| row[j])
                .filter(|d| d.is_finite())
                .fold(f64::NAN, f64::max)
        })
        .collect()
}

/// Samples whose cell has at least `min_replicates` samples
pub fn replaceable_samples(groups: &[usize], n_levels: usize, min_replicates: usize) -> Vec<bool> {
    let sizes = cell_sizes(groups, n_levels);
    groups.iter().map(|&g| sizes[g] >= min_replicates).collect()
}

/// Replace outlier counts in replaceable samples
///
/// A count whose Cook's distance exceeds `cutoff` becomes the trimmed mean of
/// the gene's normalized counts times the sample's size factor, rounded.
/// Returns the new counts and the indices of genes that changed.
pub fn replace_outliers(
    counts: ArrayView2<'_, f64>,
    cooks: ArrayView2<'_, f64>,
    size_factors: &[f64],
    replaceable: &[bool],
    cutoff: f64,
    trim: f64,
) -> (Array2<f64>, Vec<usize>) {
    let mut replaced = counts.to_owned();
    let mut changed = Vec::new();

    for (i, row) in counts.rows().into_iter().enumerate() {
        let outliers: Vec<usize> = (0..row.len())
            .filter(|&j| replaceable[j] && cooks[[i, j]] > cutoff)
            .collect();
        if outliers.is_empty() {
            continue;
        }

        let normalized: Vec<f64> = row.iter().zip(size_factors).map(|(&y, &s)| y / s).collect();
        let center = trimmed_mean(&normalized, trim);
        for &j in &outliers {
            replaced[[i, j]] = round_half_even(center * size_factors[j]);
        }
        changed.push(i);
    }

    (replaced, changed)
}
