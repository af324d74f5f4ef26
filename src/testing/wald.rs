//! Wald test for a pairwise contrast between two condition levels

use std::f64::consts::LN_2;

use crate::glm::LevelFit;

use super::calculate_pvalue;

/// Wald statistics of one gene for `numerator` vs `denominator`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaldStatistic {
    pub log2_fold_change: f64,
    pub lfc_se: f64,
    pub stat: f64,
    pub pvalue: f64,
}

impl WaldStatistic {
    /// Statistics of a gene that cannot be tested
    pub fn untestable() -> Self {
        Self {
            log2_fold_change: f64::NAN,
            lfc_se: f64::NAN,
            stat: f64::NAN,
            pvalue: f64::NAN,
        }
    }
}

/// Wald test of the log2 fold change between two fitted levels
///
/// The two level means are independent in the one-factor model, so the
/// variance of their difference is the sum of the inverse informations.
pub fn wald_test(numerator: &LevelFit, denominator: &LevelFit) -> WaldStatistic {
    let lfc = (numerator.log_mean - denominator.log_mean) / LN_2;
    let se = (1.0 / numerator.information + 1.0 / denominator.information).sqrt() / LN_2;
    if !lfc.is_finite() || !se.is_finite() || se <= 0.0 {
        return WaldStatistic::untestable();
    }
    let stat = lfc / se;
    WaldStatistic {
        log2_fold_change: lfc,
        lfc_se: se,
        stat,
        pvalue: calculate_pvalue(stat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(mean: f64, information: f64) -> LevelFit {
        LevelFit {
            log_mean: mean.ln(),
            information,
            converged: true,
        }
    }

    #[test]
    fn test_fourfold_change() {
        let res = wald_test(&level(400.0, 50.0), &level(100.0, 50.0));
        assert!((res.log2_fold_change - 2.0).abs() < 1e-12);
        assert!((res.lfc_se - (0.04f64).sqrt() / LN_2).abs() < 1e-12);
        assert!(res.stat > 0.0);
        assert!(res.pvalue < 1e-6);
    }

    #[test]
    fn test_no_change() {
        let res = wald_test(&level(100.0, 20.0), &level(100.0, 20.0));
        assert_eq!(res.log2_fold_change, 0.0);
        assert!((res.pvalue - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_information_untestable() {
        let res = wald_test(&level(10.0, 0.0), &level(10.0, 5.0));
        assert!(res.pvalue.is_nan());
    }
}
