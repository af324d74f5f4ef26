//! Count matrix representation for RNA-seq data

use std::collections::HashSet;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{PipelineError, Result};

/// A gene x sample count matrix
///
/// Rows are genes (unique ids). Columns carry sample labels, which may repeat
/// once run ids have been relabeled with their condition.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Count data (genes x samples)
    counts: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Sample (column) labels
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(
        counts: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(PipelineError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(n_genes);
        if let Some(dup) = gene_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(PipelineError::InvalidCountMatrix {
                reason: format!("Duplicate gene id '{}'", dup),
            });
        }

        if counts.iter().any(|&x| x != x.round()) {
            log::warn!(
                "Some count values are not integers. The negative binomial model expects \
                 integer counts."
            );
        }

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get sample labels
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Calculate sum of counts per sample (library size)
    pub fn library_sizes(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(1))
            .map(|col| col.sum())
            .collect()
    }

    /// Calculate total counts per gene across samples
    pub fn gene_totals(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(0))
            .map(|row| row.sum())
            .collect()
    }

    /// Keep genes whose total count across all samples is at least `min_total`
    pub fn filter_min_total(&self, min_total: f64) -> Result<Self> {
        let keep_genes: Vec<usize> = self
            .gene_totals()
            .iter()
            .enumerate()
            .filter(|(_, &total)| total >= min_total)
            .map(|(i, _)| i)
            .collect();

        if keep_genes.is_empty() {
            return Err(PipelineError::EmptyData {
                reason: format!("No genes have a total count of at least {}", min_total),
            });
        }

        self.subset_genes(&keep_genes)
    }

    /// Subset to specific samples
    pub fn subset_samples(&self, sample_indices: &[usize]) -> Result<Self> {
        let new_counts = self.counts.select(Axis(1), sample_indices);
        let new_sample_ids: Vec<String> = sample_indices
            .iter()
            .map(|&i| self.sample_ids[i].clone())
            .collect();

        Self::new(new_counts, self.gene_ids.clone(), new_sample_ids)
    }

    /// Subset to specific genes
    pub fn subset_genes(&self, gene_indices: &[usize]) -> Result<Self> {
        let new_counts = self.counts.select(Axis(0), gene_indices);
        let new_gene_ids: Vec<String> = gene_indices
            .iter()
            .map(|&i| self.gene_ids[i].clone())
            .collect();

        Self::new(new_counts, new_gene_ids, self.sample_ids.clone())
    }

    /// Replace the sample labels, keeping counts and gene ids
    pub fn with_sample_ids(self, sample_ids: Vec<String>) -> Result<Self> {
        Self::new(self.counts, self.gene_ids, sample_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_count_matrix_creation() {
        let counts = array![[10.0, 20.0, 30.0], [5.0, 15.0, 25.0]];
        let matrix =
            CountMatrix::new(counts, ids(&["gene1", "gene2"]), ids(&["s1", "s2", "s3"])).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
    }

    #[test]
    fn test_repeated_sample_labels_allowed() {
        let counts = array![[1.0, 2.0], [3.0, 4.0]];
        let matrix =
            CountMatrix::new(counts, ids(&["g1", "g2"]), ids(&["ctrl", "ctrl"])).unwrap();
        assert_eq!(matrix.sample_ids(), &["ctrl", "ctrl"]);
    }

    #[test]
    fn test_duplicate_gene_rejected() {
        let counts = array![[1.0], [2.0]];
        let result = CountMatrix::new(counts, ids(&["g1", "g1"]), ids(&["s1"]));
        assert!(matches!(result, Err(PipelineError::InvalidCountMatrix { .. })));
    }

    #[test]
    fn test_negative_counts_rejected() {
        let counts = array![[10.0, -5.0], [5.0, 15.0]];
        let result = CountMatrix::new(counts, ids(&["gene1", "gene2"]), ids(&["s1", "s2"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_library_sizes_and_totals() {
        let counts = array![[10.0, 20.0], [5.0, 15.0]];
        let matrix =
            CountMatrix::new(counts, ids(&["gene1", "gene2"]), ids(&["s1", "s2"])).unwrap();
        assert_eq!(matrix.library_sizes(), vec![15.0, 35.0]);
        assert_eq!(matrix.gene_totals(), vec![30.0, 20.0]);
    }

    #[test]
    fn test_filter_min_total() {
        let counts = array![[5.0, 4.0], [5.0, 5.0], [0.0, 0.0]];
        let matrix =
            CountMatrix::new(counts, ids(&["low", "edge", "zero"]), ids(&["s1", "s2"])).unwrap();
        let filtered = matrix.filter_min_total(10.0).unwrap();
        assert_eq!(filtered.gene_ids(), &["edge"]);
    }
}
