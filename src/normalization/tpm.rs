//! Transcripts-per-million normalization

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};

use crate::data::{CountMatrix, ExpressionMatrix};
use crate::error::{PipelineError, Result};

/// TPM of one sample column
///
/// `lengths` is aligned with `counts`; a NaN length (unknown gene) yields a
/// NaN TPM and is left out of the column total. Zero lengths give infinite
/// rates, which propagate rather than being dropped.
pub fn tpm(counts: ArrayView1<'_, f64>, lengths: &[f64]) -> Vec<f64> {
    let rates: Vec<f64> = counts
        .iter()
        .zip(lengths.iter())
        .map(|(&c, &len)| c / len)
        .collect();
    let total: f64 = rates.iter().filter(|r| !r.is_nan()).sum();
    rates.iter().map(|&r| r / total * 1e6).collect()
}

/// TPM table of a count matrix, in the matrix's gene and sample order
///
/// Genes of the matrix missing from `lengths` get NaN. At least one gene must
/// have a known length.
pub fn tpm_matrix(counts: &CountMatrix, lengths: &HashMap<String, f64>) -> Result<ExpressionMatrix> {
    let aligned: Vec<f64> = counts
        .gene_ids()
        .iter()
        .map(|id| lengths.get(id).copied().unwrap_or(f64::NAN))
        .collect();

    let missing = aligned.iter().filter(|l| l.is_nan()).count();
    if missing == aligned.len() {
        return Err(PipelineError::InvalidInput {
            reason: "No gene of the count matrix has a known length".to_string(),
        });
    }
    if missing > 0 {
        log::warn!(
            "{} of {} genes have no length; their TPM is undefined",
            missing,
            aligned.len()
        );
    }
    let zero = aligned.iter().filter(|&&l| l == 0.0).count();
    if zero > 0 {
        log::warn!("{} genes have zero length; their TPM is not finite", zero);
    }

    let raw = counts.counts();
    let mut values = Array2::zeros(raw.dim());
    for j in 0..counts.n_samples() {
        let column = tpm(raw.column(j), &aligned);
        for (i, v) in column.into_iter().enumerate() {
            values[[i, j]] = v;
        }
    }

    ExpressionMatrix::new(
        values,
        counts.gene_ids().to_vec(),
        counts.sample_ids().to_vec(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn lengths(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_tpm_column_sums_to_one_million() {
        let counts = CountMatrix::new(
            array![[10.0, 0.0], [20.0, 7.0], [5.0, 1.0]],
            vec!["g1".into(), "g2".into(), "g3".into()],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let table = tpm_matrix(&counts, &lengths(&[("g1", 1000.0), ("g2", 500.0), ("g3", 250.0)]))
            .unwrap();

        for j in 0..2 {
            let sum: f64 = table.values().column(j).sum();
            assert!((sum - 1e6).abs() < 1e-6);
        }
        // g2 rate 0.04, g1 0.01, g3 0.02 in column a
        assert!((table.values()[[1, 0]] - 1e6 * 0.04 / 0.07).abs() < 1e-6);
    }

    #[test]
    fn test_missing_length_gives_nan() {
        let counts = CountMatrix::new(
            array![[10.0], [20.0]],
            vec!["g1".into(), "unknown".into()],
            vec!["a".into()],
        )
        .unwrap();
        let table = tpm_matrix(&counts, &lengths(&[("g1", 100.0)])).unwrap();
        assert_eq!(table.gene_ids(), &["g1", "unknown"]);
        assert!((table.values()[[0, 0]] - 1e6).abs() < 1e-6);
        assert!(table.values()[[1, 0]].is_nan());
    }

    #[test]
    fn test_zero_length_is_not_finite() {
        let values = tpm(array![5.0, 10.0].view(), &[0.0, 100.0]);
        assert!(!values[0].is_finite());
        assert_eq!(values[1], 0.0);
    }

    #[test]
    fn test_no_overlap_is_error() {
        let counts =
            CountMatrix::new(array![[1.0]], vec!["g1".into()], vec!["a".into()]).unwrap();
        assert!(tpm_matrix(&counts, &lengths(&[("other", 10.0)])).is_err());
    }
}
