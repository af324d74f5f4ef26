//! Dispersion estimation for negative binomial models

mod gene_wise;
mod map;
mod trend;

pub use gene_wise::{gene_wise_dispersion, mean_inverse_size_factor, moments_disp_estimate, rough_disp_estimate};
pub use map::{estimate_prior_variance, sampling_variance, shrink_dispersion, ShrinkageParams, MIN_PRIOR_VAR};
pub use trend::{fit_dispersion_trend, DispersionTrend};

use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::error::{PipelineError, Result};

/// Parameters of dispersion estimation
#[derive(Debug, Clone)]
pub struct DispersionParams {
    /// Minimum dispersion value
    pub min_disp: f64,
    /// Log-residual SDs above the trend beyond which a gene keeps its gene-wise value
    pub outlier_sd: f64,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            min_disp: 1e-8,
            outlier_sd: 2.0,
        }
    }
}

/// All dispersion estimates of a fitted model
#[derive(Debug, Clone)]
pub struct DispersionFit {
    pub gene_wise: Vec<f64>,
    pub trended: Vec<f64>,
    /// Final (shrunken) dispersions used for testing
    pub map: Vec<f64>,
    pub trend: DispersionTrend,
    pub prior_var: f64,
    /// Observed variance of log residuals, basis of the outlier threshold
    pub var_log_disp_ests: f64,
}

/// Estimate gene-wise, trended and MAP dispersions
///
/// `normalized` holds size-factor normalized counts (genes x samples) and
/// `groups` the level index of every sample.
pub fn estimate_dispersions(
    normalized: &Array2<f64>,
    size_factors: &[f64],
    groups: &[usize],
    n_levels: usize,
    params: &DispersionParams,
) -> Result<DispersionFit> {
    let m = normalized.ncols();
    if m <= n_levels {
        return Err(PipelineError::StatisticalFit {
            reason: format!(
                "{} samples and {} parameters leave no residual degrees of freedom for dispersion estimation",
                m, n_levels
            ),
        });
    }
    let df = m - n_levels;
    let max_disp = (m as f64).max(10.0);
    let xim = mean_inverse_size_factor(size_factors);

    let rows: Vec<Vec<f64>> = normalized.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();

    let gene_wise: Vec<f64> = rows
        .par_iter()
        .map(|row| gene_wise_dispersion(row, groups, n_levels, xim, params.min_disp, max_disp))
        .collect();

    let means: Vec<f64> = rows.iter().map(|r| r.iter().sum::<f64>() / m as f64).collect();
    let trend = fit_dispersion_trend(&means, &gene_wise, params.min_disp)?;
    let trended: Vec<f64> = means.iter().map(|&mu| trend.evaluate(mu)).collect();

    let (prior_var, var_log_disp_ests) =
        estimate_prior_variance(&gene_wise, &trended, df, params.min_disp);
    let shrinkage = ShrinkageParams {
        prior_var,
        sampling_var: sampling_variance(df),
        outlier_threshold: params.outlier_sd * var_log_disp_ests.sqrt(),
        min_disp: params.min_disp,
        max_disp,
    };

    let map: Vec<f64> = gene_wise
        .par_iter()
        .zip(trended.par_iter())
        .map(|(&gw, &tr)| shrink_dispersion(gw, tr, &shrinkage))
        .collect();

    let outliers = gene_wise
        .iter()
        .zip(&map)
        .filter(|(g, d)| g.is_finite() && g == d && **g >= 100.0 * params.min_disp)
        .count();
    log::debug!("{} genes kept their gene-wise dispersion as outliers", outliers);

    Ok(DispersionFit {
        gene_wise,
        trended,
        map,
        trend,
        prior_var,
        var_log_disp_ests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_no_residual_df_is_error() {
        let normalized = Array2::from_elem((3, 2), 10.0);
        let result = estimate_dispersions(&normalized, &[1.0, 1.0], &[0, 1], 2, &DispersionParams::default());
        assert!(matches!(result, Err(PipelineError::StatisticalFit { .. })));
    }

    #[test]
    fn test_estimates_are_finite_and_bounded() {
        let mut normalized = Array2::zeros((40, 6));
        for i in 0..40 {
            let base = 5.0 + 10.0 * i as f64;
            for j in 0..6 {
                let wobble = if (i + j) % 3 == 0 { 1.4 } else { 0.8 };
                normalized[[i, j]] = (base * wobble).round();
            }
        }
        let fit = estimate_dispersions(
            &normalized,
            &[1.0; 6],
            &[0, 0, 0, 1, 1, 1],
            2,
            &DispersionParams::default(),
        )
        .unwrap();
        assert_eq!(fit.map.len(), 40);
        assert!(fit.map.iter().all(|&d| d.is_finite() && d > 0.0 && d <= 10.0));
        assert!(fit.prior_var >= MIN_PRIOR_VAR);
    }
}
