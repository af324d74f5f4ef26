//! Statistics engine interface and its DESeq2-style implementation
//!
//! The pipeline only talks to [`StatisticsEngine`]: fit a model once, derive
//! the design-blind normalized matrix from it, fit the condition effects,
//! then test any pair of condition levels.

mod deseq;

pub use deseq::{DeseqEngine, DeseqFit, DeseqModel};

use crate::data::{CountMatrix, NormalizedMatrix, SampleDesign};
use crate::dispersion::DispersionParams;
use crate::error::Result;
use crate::glm::GlmFitParams;
use crate::io::DgeResults;

/// A fitted-model backend for differential expression
pub trait StatisticsEngine {
    /// Validated counts and design with normalization factors
    type Model;
    /// Model with dispersions and per-level effects
    type Fitted;

    /// Set up the model with `condition` as the only design factor
    fn fit(&self, counts: &CountMatrix, design: &SampleDesign) -> Result<Self::Model>;

    /// Design-blind normalized (variance-stabilized) counts
    fn normalize(&self, model: &Self::Model) -> Result<NormalizedMatrix>;

    /// Fit dispersions and condition effects
    fn fit_effects(&self, model: Self::Model) -> Result<Self::Fitted>;

    /// Test level `b` against reference level `a`
    fn test(&self, fitted: &Self::Fitted, a: &str, b: &str) -> Result<DgeResults>;
}

/// Tuning of [`DeseqEngine`]
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Worker threads of the engine's pool
    pub threads: usize,
    /// Replace Cook's outliers and refit the affected genes
    pub refit_cooks: bool,
    /// Minimum samples in a level for its counts to be replaceable
    pub min_replicates: usize,
    /// Trim fraction of the mean that replaces an outlier count
    pub cooks_trim: f64,
    pub min_disp: f64,
    pub maxit: usize,
    pub beta_tol: f64,
    pub outlier_sd: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            threads: 8,
            refit_cooks: true,
            min_replicates: 7,
            cooks_trim: 0.2,
            min_disp: 1e-8,
            maxit: 100,
            beta_tol: 1e-8,
            outlier_sd: 2.0,
        }
    }
}

impl EngineParams {
    pub fn dispersion_params(&self) -> DispersionParams {
        DispersionParams {
            min_disp: self.min_disp,
            outlier_sd: self.outlier_sd,
        }
    }

    pub fn glm_params(&self) -> GlmFitParams {
        GlmFitParams {
            maxit: self.maxit,
            beta_tol: self.beta_tol,
        }
    }
}
