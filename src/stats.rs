//! Statistical utility functions shared across modules
//!
//! Small numeric helpers used by the aggregator (rounding), the dispersion
//! estimators (trigamma, variance) and Cook's outlier replacement (trimmed mean).

/// Round to the nearest integer, ties to even.
///
/// Replicate means such as 2.5 round to 2 and 3.5 round to 4, which keeps
/// averaged counts unbiased over many ties.
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}

/// Arithmetic mean; NaN for an empty slice
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unbiased sample variance; NaN for fewer than two values
pub fn sample_variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let m = mean(x);
    x.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (x.len() as f64 - 1.0)
}

/// Median of the finite values; NaN when none are finite
pub fn median(x: &[f64]) -> f64 {
    let mut values: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Trimmed mean dropping `trim` of the observations from each end
/// R equivalent: mean(x, trim=trim)
pub fn trimmed_mean(x: &[f64], trim: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut values = x.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let lo = ((n as f64) * trim.clamp(0.0, 0.5)).floor() as usize;
    let hi = n - lo;
    if lo >= hi {
        return median(&values);
    }
    mean(&values[lo..hi])
}

/// Trigamma function (second derivative of ln Gamma)
///
/// Uses the recurrence psi1(x) = psi1(x + 1) + 1/x^2 to push the argument
/// above 6, then the asymptotic expansion.
pub fn trigamma(x: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 {
        return f64::NAN;
    }
    let mut x = x;
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let x2 = 1.0 / (x * x);
    acc + 1.0 / x
        + x2 / 2.0
        + (1.0 / x) * x2 * (1.0 / 6.0 - x2 * (1.0 / 30.0 - x2 * (1.0 / 42.0 - x2 / 30.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(10.4), 10.0);
        assert_eq!(round_half_even(10.6), 11.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_trimmed_mean_drops_extremes() {
        let x = [1.0, 2.0, 3.0, 4.0, 1000.0];
        // trim 0.2 of 5 values drops one from each end
        assert!((trimmed_mean(&x, 0.2) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_trigamma_known_values() {
        // psi1(1) = pi^2 / 6
        let expected = std::f64::consts::PI.powi(2) / 6.0;
        assert!((trigamma(1.0) - expected).abs() < 1e-8);
        // psi1(0.5) = pi^2 / 2
        let expected_half = std::f64::consts::PI.powi(2) / 2.0;
        assert!((trigamma(0.5) - expected_half).abs() < 1e-8);
    }

    #[test]
    fn test_sample_variance() {
        let v = sample_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((v - 32.0 / 7.0).abs() < 1e-12);
    }
}
