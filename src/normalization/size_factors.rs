//! Size factor estimation using the median of ratios method

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{PipelineError, Result};
use crate::stats::median;

/// Method for size factor estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFactorMethod {
    /// Median of ratios over genes with no zero count
    Ratio,
    /// Geometric means over positive counts only, for sparse data
    PosCounts,
}

/// Estimate per-sample size factors
///
/// With [`SizeFactorMethod::Ratio`], when every gene has a zero in some sample
/// the estimate falls back to [`SizeFactorMethod::PosCounts`] with a warning.
pub fn estimate_size_factors(
    counts: ArrayView2<'_, f64>,
    method: SizeFactorMethod,
) -> Result<Array1<f64>> {
    let (n_genes, n_samples) = counts.dim();
    if n_genes == 0 || n_samples == 0 {
        return Err(PipelineError::EmptyData {
            reason: "Count matrix is empty".to_string(),
        });
    }

    let size_factors = match method {
        SizeFactorMethod::Ratio => match median_of_ratios(counts, false) {
            Some(sf) => sf,
            None => {
                log::warn!(
                    "Every gene contains at least one zero; using positive-count geometric means for size factors"
                );
                median_of_ratios(counts, true).ok_or_else(no_positive_counts)?
            }
        },
        SizeFactorMethod::PosCounts => {
            median_of_ratios(counts, true).ok_or_else(no_positive_counts)?
        }
    };

    if size_factors.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
        return Err(PipelineError::StatisticalFit {
            reason: "Invalid size factors computed".to_string(),
        });
    }
    log::debug!("Size factors: {:?}", size_factors.to_vec());
    Ok(size_factors)
}

fn no_positive_counts() -> PipelineError {
    PipelineError::StatisticalFit {
        reason: "No genes with positive counts found for size factor estimation".to_string(),
    }
}

/// Median over genes of count / geometric mean, per sample
///
/// `poscounts` computes the geometric mean over positive counts (divided by
/// the total sample count) and keeps every gene with any positive count.
/// Returns `None` when no gene qualifies.
fn median_of_ratios(counts: ArrayView2<'_, f64>, poscounts: bool) -> Option<Array1<f64>> {
    let n_samples = counts.ncols();

    let reference: Vec<(usize, f64)> = counts
        .axis_iter(Axis(0))
        .enumerate()
        .filter_map(|(i, row)| {
            let usable = if poscounts {
                row.iter().any(|&x| x > 0.0)
            } else {
                row.iter().all(|&x| x > 0.0)
            };
            if !usable {
                return None;
            }
            let log_sum: f64 = row.iter().filter(|&&x| x > 0.0).map(|&x| x.ln()).sum();
            Some((i, (log_sum / n_samples as f64).exp()))
        })
        .collect();

    if reference.is_empty() {
        return None;
    }

    let mut size_factors = Array1::zeros(n_samples);
    for j in 0..n_samples {
        let ratios: Vec<f64> = reference
            .iter()
            .filter(|(i, _)| counts[[*i, j]] > 0.0)
            .map(|&(i, geo_mean)| counts[[i, j]] / geo_mean)
            .collect();
        // A sample with no usable ratio keeps a neutral factor
        size_factors[j] = if ratios.is_empty() { 1.0 } else { median(&ratios) };
    }

    if poscounts {
        // Re-center so the geometric mean of the factors is 1
        let log_mean = size_factors.iter().map(|x| x.ln()).sum::<f64>() / n_samples as f64;
        let center = log_mean.exp();
        size_factors.mapv_inplace(|x| x / center);
    }
    Some(size_factors)
}

/// Counts divided by their sample's size factor
pub fn normalized_counts(counts: ArrayView2<'_, f64>, size_factors: &Array1<f64>) -> Array2<f64> {
    let mut normalized = counts.to_owned();
    for (mut col, &sf) in normalized.axis_iter_mut(Axis(1)).zip(size_factors.iter()) {
        col.mapv_inplace(|x| x / sf);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_size_factor_estimation() {
        let counts = array![
            [100.0, 200.0, 80.0, 160.0],
            [500.0, 1000.0, 400.0, 800.0],
            [50.0, 100.0, 40.0, 80.0],
            [200.0, 400.0, 160.0, 320.0]
        ];
        let sf = estimate_size_factors(counts.view(), SizeFactorMethod::Ratio).unwrap();
        assert_eq!(sf.len(), 4);
        assert!(sf.iter().all(|&x| x > 0.0));

        // s2 has 2x the depth of s1, s4 2x of s3
        assert!((sf[1] / sf[0] - 2.0).abs() < 1e-9);
        assert!((sf[3] / sf[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_counts_level_out_depth() {
        let counts = array![[100.0, 200.0, 80.0, 160.0], [50.0, 100.0, 40.0, 80.0]];
        let sf = estimate_size_factors(counts.view(), SizeFactorMethod::Ratio).unwrap();
        let norm = normalized_counts(counts.view(), &sf);

        let row: Vec<f64> = norm.row(0).to_vec();
        let mean = row.iter().sum::<f64>() / 4.0;
        for val in row {
            assert!((val - mean).abs() / mean < 1e-9);
        }
    }

    #[test]
    fn test_poscounts_fallback_when_every_gene_has_zero() {
        let counts = array![[0.0, 10.0, 20.0], [5.0, 0.0, 10.0], [4.0, 8.0, 0.0]];
        let sf = estimate_size_factors(counts.view(), SizeFactorMethod::Ratio).unwrap();
        assert!(sf.iter().all(|&x| x > 0.0 && x.is_finite()));
        let log_mean: f64 = sf.iter().map(|x| x.ln()).sum::<f64>() / 3.0;
        assert!(log_mean.abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_matrix_fails() {
        let counts = array![[0.0, 0.0], [0.0, 0.0]];
        assert!(matches!(
            estimate_size_factors(counts.view(), SizeFactorMethod::Ratio),
            Err(PipelineError::StatisticalFit { .. })
        ));
    }
}
