//! Library-size normalization and TPM

mod size_factors;
mod tpm;

pub use size_factors::{estimate_size_factors, normalized_counts, SizeFactorMethod};
pub use tpm::{tpm, tpm_matrix};
