//! Dispersion trend fitting

use crate::error::{PipelineError, Result};
use crate::stats::trimmed_mean;

/// Fitted mean-dispersion relationship
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispersionTrend {
    /// dispersion = asympt_disp + extra_pois / mean
    Parametric { asympt_disp: f64, extra_pois: f64 },
    /// A single dispersion for every gene
    Mean(f64),
}

impl DispersionTrend {
    /// Trended dispersion at a given mean of normalized counts
    pub fn evaluate(&self, mean: f64) -> f64 {
        match *self {
            DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            } => {
                if mean > 0.0 {
                    asympt_disp + extra_pois / mean
                } else {
                    asympt_disp
                }
            }
            DispersionTrend::Mean(d) => d,
        }
    }
}

/// Fit the trend of gene-wise dispersions over mean expression
///
/// The parametric fit is tried first; when its coefficients are not positive
/// or it does not converge, the trend is the (lightly trimmed) mean of the
/// gene-wise dispersions.
pub fn fit_dispersion_trend(means: &[f64], dispersions: &[f64], min_disp: f64) -> Result<DispersionTrend> {
    match fit_parametric_trend(means, dispersions, min_disp) {
        Ok((asympt_disp, extra_pois)) => {
            log::debug!(
                "Parametric dispersion trend: asymptDisp={:.6}, extraPois={:.6}",
                asympt_disp,
                extra_pois
            );
            Ok(DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            })
        }
        Err(e) => {
            log::info!("Parametric fit failed ({}), using mean dispersion", e);
            mean_trend(dispersions, min_disp)
        }
    }
}

fn mean_trend(dispersions: &[f64], min_disp: f64) -> Result<DispersionTrend> {
    let usable: Vec<f64> = dispersions
        .iter()
        .copied()
        .filter(|&d| d.is_finite() && d > 10.0 * min_disp)
        .collect();
    let value = if usable.is_empty() {
        // Every gene at the floor: effectively Poisson
        let finite: Vec<f64> = dispersions.iter().copied().filter(|d| d.is_finite()).collect();
        if finite.is_empty() {
            return Err(PipelineError::StatisticalFit {
                reason: "No finite gene-wise dispersions to fit a trend".to_string(),
            });
        }
        trimmed_mean(&finite, 0.001)
    } else {
        trimmed_mean(&usable, 0.001)
    };
    Ok(DispersionTrend::Mean(value.max(min_disp)))
}

/// Fit dispersion = a0 + a1/mean, returning (a0, a1)
fn fit_parametric_trend(means: &[f64], dispersions: &[f64], min_disp: f64) -> Result<(f64, f64)> {
    let valid: Vec<(f64, f64)> = means
        .iter()
        .zip(dispersions.iter())
        .filter(|(&m, &d)| m > 0.0 && d > 100.0 * min_disp && d.is_finite())
        .map(|(&m, &d)| (m, d))
        .collect();

    if valid.len() < 3 {
        return Err(trend_error("not enough valid data points for trend fitting"));
    }

    let mut coefs = (0.1_f64, 1.0_f64);
    let max_iter = 11;
    let tol = 1e-6;

    for iter in 0..max_iter {
        let old_coefs = coefs;

        // Residuals outside (1e-4, 15) are left out of this round
        let good: Vec<(f64, f64)> = valid
            .iter()
            .filter(|&&(mean, disp)| {
                let fitted = coefs.0 + coefs.1 / mean;
                if fitted <= 0.0 {
                    return false;
                }
                let residual = disp / fitted;
                residual > 1e-4 && residual < 15.0
            })
            .copied()
            .collect();

        if good.len() < 3 {
            return Err(trend_error("not enough good residuals for parametric fit"));
        }

        let (new_coefs, glm_converged) = fit_gamma_identity(&good, coefs);
        coefs = new_coefs;
        log::debug!(
            "Parametric fit iter {}: {} genes, a0={:.6}, a1={:.6}",
            iter + 1,
            good.len(),
            coefs.0,
            coefs.1
        );

        if coefs.0 <= 0.0 || coefs.1 <= 0.0 {
            return Err(trend_error(&format!(
                "coefficients not positive (a0={:.4}, a1={:.4})",
                coefs.0, coefs.1
            )));
        }

        let log_change =
            (coefs.0 / old_coefs.0).ln().powi(2) + (coefs.1 / old_coefs.1).ln().powi(2);
        if log_change < tol && glm_converged {
            return Ok(coefs);
        }
    }

    Err(trend_error("dispersion fit did not converge"))
}

fn trend_error(reason: &str) -> PipelineError {
    PipelineError::StatisticalFit {
        reason: format!("dispersion trend: {}", reason),
    }
}

fn gamma_deviance(data: &[(f64, f64)], a0: f64, a1: f64) -> f64 {
    data.iter()
        .map(|&(mean, disp)| {
            let mu = (a0 + a1 / mean).max(1e-8);
            2.0 * (-(disp / mu).ln() + (disp - mu) / mu)
        })
        .sum()
}

/// Gamma GLM with identity link, disp ~ 1 + 1/mean, by IRLS from `start`
///
/// Returns the coefficients and whether the deviance converged.
fn fit_gamma_identity(data: &[(f64, f64)], start: (f64, f64)) -> ((f64, f64), bool) {
    let (mut a0, mut a1) = start;
    let mut dev_old = gamma_deviance(data, a0, a1);

    for _ in 0..25 {
        let (mut sw, mut swx, mut swz, mut swxx, mut swxz) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &(mean, disp) in data {
            let x = 1.0 / mean;
            let mu = (a0 + a1 * x).max(1e-8);
            let w = 1.0 / (mu * mu);
            sw += w;
            swx += w * x;
            swz += w * disp;
            swxx += w * x * x;
            swxz += w * x * disp;
        }

        let det = sw * swxx - swx * swx;
        if det.abs() < 1e-10 {
            return ((a0, a1), false);
        }
        a0 = (swxx * swz - swx * swxz) / det;
        a1 = (sw * swxz - swx * swz) / det;

        let dev = gamma_deviance(data, a0, a1);
        if (dev_old - dev).abs() / (0.1 + dev.abs()) < 1e-8 {
            return ((a0, a1), true);
        }
        dev_old = dev;
    }
    ((a0, a1), false)
}
