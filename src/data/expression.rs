//! Real-valued gene x sample matrices (TPM, variance-stabilized counts)

use ndarray::{Array2, ArrayView2};

use crate::error::{PipelineError, Result};

/// A labeled gene x sample matrix of derived values
///
/// Unlike [`super::CountMatrix`] the values may be non-finite: a TPM of a gene
/// with no known length is NaN.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    values: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
}

/// Output of the engine's normalization step
pub type NormalizedMatrix = ExpressionMatrix;

impl ExpressionMatrix {
    pub fn new(values: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        if values.nrows() != gene_ids.len() || values.ncols() != sample_ids.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} x {} values", gene_ids.len(), sample_ids.len()),
                got: format!("{} x {} values", values.nrows(), values.ncols()),
            });
        }
        Ok(Self {
            values,
            gene_ids,
            sample_ids,
        })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }
}
