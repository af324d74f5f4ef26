//! Negative binomial fit of the one-factor model
//!
//! With `condition` as the only factor each level has its own mean, so the
//! GLM separates into one-parameter fits per level: for level l and sample j
//! in it, mu_j = s_j * exp(beta_l). Each beta_l is found by Fisher scoring.

use ndarray::ArrayView1;

use super::negative_binomial::{nb_log_likelihood, nb_mean, nb_weight, MIN_LOG_MEAN, MIN_MU};

/// Parameters of the per-level fits
#[derive(Debug, Clone)]
pub struct GlmFitParams {
    /// Maximum Fisher-scoring iterations
    pub maxit: usize,
    /// Convergence tolerance on the log-mean update
    pub beta_tol: f64,
}

impl Default for GlmFitParams {
    fn default() -> Self {
        Self {
            maxit: 100,
            beta_tol: 1e-8,
        }
    }
}

/// Fit of a single level of a single gene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelFit {
    /// Natural-log mean on the normalized scale
    pub log_mean: f64,
    /// Fisher information of `log_mean`
    pub information: f64,
    pub converged: bool,
}

/// Fit of one gene across all levels
#[derive(Debug, Clone)]
pub struct GlmFitResult {
    /// Per-level fits, in level order
    pub levels: Vec<LevelFit>,
    /// Fitted mean of every sample
    pub mu: Vec<f64>,
    /// Diagonal of the hat matrix of every sample
    pub hat_diagonals: Vec<f64>,
    pub log_likelihood: f64,
    pub converged: bool,
}

fn information(log_mean: f64, size_factors: &[f64], alpha: f64) -> f64 {
    size_factors
        .iter()
        .map(|&s| nb_weight(nb_mean(log_mean, s).max(MIN_MU), alpha))
        .sum()
}

/// Fit the log mean of one level from its counts and size factors
pub fn fit_level(counts: &[f64], size_factors: &[f64], alpha: f64, params: &GlmFitParams) -> LevelFit {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return LevelFit {
            log_mean: MIN_LOG_MEAN,
            information: information(MIN_LOG_MEAN, size_factors, alpha),
            converged: true,
        };
    }

    // Start from the log of the mean normalized count
    let norm_mean = counts
        .iter()
        .zip(size_factors)
        .map(|(&y, &s)| y / s)
        .sum::<f64>()
        / counts.len() as f64;
    let mut beta = norm_mean.ln();
    let mut converged = false;

    for _ in 0..params.maxit {
        let mut score = 0.0;
        let mut info = 0.0;
        for (&y, &s) in counts.iter().zip(size_factors) {
            let mu = nb_mean(beta, s);
            let denom = 1.0 + alpha * mu;
            score += (y - mu) / denom;
            info += mu / denom;
        }
        if info <= 0.0 || !info.is_finite() {
            break;
        }
        let step = score / info;
        beta = (beta + step).max(MIN_LOG_MEAN);
        if step.abs() < params.beta_tol {
            converged = true;
            break;
        }
    }

    if !converged {
        log::debug!("Level fit did not converge (log mean {:.4})", beta);
    }

    LevelFit {
        log_mean: beta,
        information: information(beta, size_factors, alpha),
        converged,
    }
}

/// Fit all levels of one gene
///
/// `groups[j]` is the level index of sample j; every level in
/// `0..n_levels` must have at least one sample.
pub fn fit_single_gene(
    counts: ArrayView1<'_, f64>,
    size_factors: &[f64],
    groups: &[usize],
    n_levels: usize,
    alpha: f64,
    params: &GlmFitParams,
) -> GlmFitResult {
    let mut levels = Vec::with_capacity(n_levels);
    for level in 0..n_levels {
        let (y, s): (Vec<f64>, Vec<f64>) = groups
            .iter()
            .enumerate()
            .filter(|(_, &g)| g == level)
            .map(|(j, _)| (counts[j], size_factors[j]))
            .unzip();
        levels.push(fit_level(&y, &s, alpha, params));
    }

    let mu: Vec<f64> = groups
        .iter()
        .zip(size_factors)
        .map(|(&g, &s)| nb_mean(levels[g].log_mean, s))
        .collect();

    // In a one-factor model H is block diagonal: h_j = w_j / sum of w over j's level
    let weights: Vec<f64> = mu.iter().map(|&m| nb_weight(m.max(MIN_MU), alpha)).collect();
    let mut level_weight = vec![0.0; n_levels];
    for (&g, &w) in groups.iter().zip(&weights) {
        level_weight[g] += w;
    }
    let hat_diagonals: Vec<f64> = groups
        .iter()
        .zip(&weights)
        .map(|(&g, &w)| w / level_weight[g])
        .collect();

    let log_likelihood = counts
        .iter()
        .zip(&mu)
        .map(|(&y, &m)| nb_log_likelihood(y, m, alpha))
        .sum();

    GlmFitResult {
        converged: levels.iter().all(|l| l.converged),
        levels,
        mu,
        hat_diagonals,
        log_likelihood,
    }
}
