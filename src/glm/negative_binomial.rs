//! Negative binomial distribution utilities

use statrs::function::gamma::ln_gamma;

/// Floor applied to fitted means before computing weights (DESeq2's minmu)
pub const MIN_MU: f64 = 0.5;

/// Lower bound of a level's natural-log mean
///
/// A level whose counts are all zero has no finite maximum-likelihood mean;
/// its log mean is held at this bound (2^-30 on the count scale), which keeps
/// fold changes and standard errors finite.
pub const MIN_LOG_MEAN: f64 = -30.0 * std::f64::consts::LN_2;

/// Maximum eta value to prevent overflow (exp(700) ≈ 1e304)
pub const MAX_ETA: f64 = 700.0;

/// Mean of a sample given the log mean of its level and its size factor
///
/// mu = size_factor * exp(eta)
pub fn nb_mean(eta: f64, size_factor: f64) -> f64 {
    size_factor * eta.clamp(-MAX_ETA, MAX_ETA).exp()
}

/// Var(Y) = mu + alpha * mu^2
pub fn nb_variance(mu: f64, alpha: f64) -> f64 {
    mu + alpha * mu * mu
}

/// Log-likelihood of a single observation, with r = 1/alpha
pub fn nb_log_likelihood(k: f64, mu: f64, alpha: f64) -> f64 {
    if mu <= 0.0 || alpha <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let r = 1.0 / alpha;
    let p = alpha * mu / (1.0 + alpha * mu);

    ln_gamma(k + r) - ln_gamma(r) - ln_gamma(k + 1.0) + r * (1.0 - p).ln() + k * p.ln()
}

/// IRLS weight W = mu / (1 + alpha * mu)
pub fn nb_weight(mu: f64, alpha: f64) -> f64 {
    mu / (1.0 + alpha * mu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nb_mean() {
        let mu = nb_mean(2.0, 1.0);
        assert!((mu - 2.0_f64.exp()).abs() < 1e-10);
    }

    #[test]
    fn test_nb_variance() {
        let var = nb_variance(10.0, 0.1);
        assert!((var - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_log_likelihood_peaks_at_observation() {
        let at_k = nb_log_likelihood(10.0, 10.0, 0.1);
        assert!(at_k > nb_log_likelihood(10.0, 5.0, 0.1));
        assert!(at_k > nb_log_likelihood(10.0, 20.0, 0.1));
    }

    #[test]
    fn test_min_log_mean_is_two_to_minus_thirty() {
        assert!((MIN_LOG_MEAN.exp() - 2f64.powi(-30)).abs() < 1e-18);
    }
}
