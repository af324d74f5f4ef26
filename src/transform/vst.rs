//! Variance Stabilizing Transformation (VST)
//!
//! Transforms normalized counts to the log2 scale with approximately constant
//! variance across the range of means. The dispersion trend is estimated
//! blind to the design (intercept-only model).

use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::dispersion::{fit_dispersion_trend, gene_wise_dispersion, mean_inverse_size_factor, DispersionTrend};
use crate::error::{PipelineError, Result};

/// Fit the dispersion trend ignoring the design
pub fn blind_dispersion_trend(
    normalized: &Array2<f64>,
    size_factors: &[f64],
    min_disp: f64,
) -> Result<DispersionTrend> {
    let m = normalized.ncols();
    if m < 2 {
        return Err(PipelineError::StatisticalFit {
            reason: "variance stabilization needs at least two samples".to_string(),
        });
    }
    let groups = vec![0usize; m];
    let xim = mean_inverse_size_factor(size_factors);
    let max_disp = (m as f64).max(10.0);

    let rows: Vec<Vec<f64>> = normalized.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
    let dispersions: Vec<f64> = rows
        .par_iter()
        .map(|row| gene_wise_dispersion(row, &groups, 1, xim, min_disp, max_disp))
        .collect();
    let means: Vec<f64> = rows.iter().map(|r| r.iter().sum::<f64>() / m as f64).collect();

    fit_dispersion_trend(&means, &dispersions, min_disp)
}

/// Apply the transformation implied by `trend` to normalized counts
pub fn vst(normalized: &Array2<f64>, trend: &DispersionTrend) -> Array2<f64> {
    let rows: Vec<Vec<f64>> = (0..normalized.nrows())
        .into_par_iter()
        .map(|i| normalized.row(i).iter().map(|&q| vst_single(q, trend)).collect())
        .collect();

    let mut result = Array2::zeros(normalized.dim());
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            result[[i, j]] = v;
        }
    }
    result
}

/// Transform a single normalized count
pub fn vst_single(q: f64, trend: &DispersionTrend) -> f64 {
    match *trend {
        DispersionTrend::Parametric {
            asympt_disp,
            extra_pois,
        } => vst_parametric_single(q, asympt_disp, extra_pois),
        DispersionTrend::Mean(alpha) => vst_mean_single(q, alpha),
    }
}

/// log2((1 + e + 2aq + 2 sqrt(aq (1 + e + aq))) / (4a)), applied to zero counts too
fn vst_parametric_single(q: f64, asympt_disp: f64, extra_pois: f64) -> f64 {
    let a = asympt_disp;
    let e = extra_pois;
    let q = q.max(0.0);

    let numerator = 1.0 + e + 2.0 * a * q + 2.0 * (a * q * (1.0 + e + a * q)).sqrt();
    let denominator = 4.0 * a;

    if numerator > 0.0 && denominator > 0.0 {
        (numerator / denominator).log2()
    } else {
        0.0
    }
}

/// (2 asinh(sqrt(alpha q)) - ln alpha - ln 4) / ln 2
fn vst_mean_single(q: f64, alpha: f64) -> f64 {
    if alpha <= 0.0 {
        return 0.0;
    }
    let q = q.max(0.0);
    let asinh_term = 2.0 * (alpha * q).sqrt().asinh();
    (asinh_term - alpha.ln() - 4.0_f64.ln()) / std::f64::consts::LN_2
}
