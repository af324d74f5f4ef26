//! Shrinkage of gene-wise dispersions toward the trend

use crate::stats::{median, trigamma};

/// Smallest prior variance of log dispersions
pub const MIN_PRIOR_VAR: f64 = 0.25;

/// Squared median absolute deviation, scaled for consistency with the normal
fn mad_squared(values: &[f64]) -> f64 {
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|&x| (x - center).abs()).collect();
    (1.4826 * median(&deviations)).powi(2)
}

/// Expected sampling variance of a log dispersion estimate with `df` residual degrees of freedom
pub fn sampling_variance(df: usize) -> f64 {
    trigamma(df as f64 / 2.0)
}

/// Prior variance of log dispersions around the trend
///
/// Returns `(prior_var, var_log_disp_ests)` where the second value is the
/// observed spread of log residuals, used for outlier detection.
pub fn estimate_prior_variance(
    gene_wise: &[f64],
    trended: &[f64],
    df: usize,
    min_disp: f64,
) -> (f64, f64) {
    let log_residuals: Vec<f64> = gene_wise
        .iter()
        .zip(trended)
        .filter(|(&g, &t)| g.is_finite() && t.is_finite() && g >= 100.0 * min_disp && t > 0.0)
        .map(|(&g, &t)| g.ln() - t.ln())
        .collect();

    if log_residuals.len() < 3 {
        return (MIN_PRIOR_VAR, MIN_PRIOR_VAR);
    }

    let var_log_disp_ests = mad_squared(&log_residuals);
    let prior_var = (var_log_disp_ests - sampling_variance(df)).max(MIN_PRIOR_VAR);
    log::debug!(
        "Dispersion prior: df={}, varLogDispEsts={:.4}, priorVar={:.4}",
        df,
        var_log_disp_ests,
        prior_var
    );
    (prior_var, var_log_disp_ests)
}

/// Settings for [`shrink_dispersion`]
#[derive(Debug, Clone, Copy)]
pub struct ShrinkageParams {
    pub prior_var: f64,
    pub sampling_var: f64,
    /// Log residuals above this are dispersion outliers and are not shrunk
    pub outlier_threshold: f64,
    pub min_disp: f64,
    pub max_disp: f64,
}

/// Posterior-mode dispersion of one gene on the log scale
///
/// The log gene-wise estimate is combined with the log trend as two normal
/// sources weighted by their inverse variances. Estimates at the dispersion
/// floor carry no information and take the trended value.
pub fn shrink_dispersion(gene_wise: f64, trended: f64, params: &ShrinkageParams) -> f64 {
    if !gene_wise.is_finite() || !trended.is_finite() || trended <= 0.0 {
        return gene_wise;
    }
    if gene_wise < 100.0 * params.min_disp {
        return trended.clamp(params.min_disp, params.max_disp);
    }

    let log_gw = gene_wise.ln();
    let log_tr = trended.ln();
    if log_gw - log_tr > params.outlier_threshold {
        return gene_wise;
    }

    let log_map = (log_gw * params.prior_var + log_tr * params.sampling_var)
        / (params.prior_var + params.sampling_var);
    log_map.exp().clamp(params.min_disp, params.max_disp)
}
