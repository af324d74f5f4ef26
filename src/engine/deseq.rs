//! Single-factor negative binomial engine
//!
//! `fit` validates the design and estimates size factors, which is all the
//! blind transform needs. `fit_effects` then runs dispersions, per level NB
//! fits, Cook's distances and (optionally) outlier replacement with a refit
//! of the genes that changed. All parallel work runs inside the engine's own
//! rayon pool.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use super::{EngineParams, StatisticsEngine};
use crate::data::{CountMatrix, ExpressionMatrix, NormalizedMatrix, SampleDesign, CONDITION_FACTOR};
use crate::dispersion::{estimate_dispersions, DispersionFit};
use crate::error::{PipelineError, Result};
use crate::filter::{
    cooks_cutoff, cooks_distances, max_cooks, replace_outliers, replaceable_samples,
    robust_moments_dispersion,
};
use crate::glm::{fit_single_gene, GlmFitResult};
use crate::io::{Contrast, DgeResults};
use crate::normalization::{estimate_size_factors, normalized_counts, SizeFactorMethod};
use crate::testing::{benjamini_hochberg, wald_test, WaldStatistic};
use crate::transform::{blind_dispersion_trend, vst};

/// DESeq2-style engine owning a fixed-size worker pool
pub struct DeseqEngine {
    params: EngineParams,
    pool: rayon::ThreadPool,
}

/// A validated dataset with its size factors, before any dispersion fit
#[derive(Debug, Clone)]
pub struct DeseqModel {
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
    levels: Vec<String>,
    groups: Vec<usize>,
    counts: Array2<f64>,
    size_factors: Array1<f64>,
    normalized: Array2<f64>,
}

impl DeseqModel {
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Condition levels in first-seen order
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn size_factors(&self) -> &Array1<f64> {
        &self.size_factors
    }

    fn level_index(&self, level: &str) -> Result<usize> {
        self.levels
            .iter()
            .position(|l| l == level)
            .ok_or_else(|| PipelineError::InvalidInput {
                reason: format!(
                    "Level '{}' not found in {}; available levels: {:?}",
                    level, CONDITION_FACTOR, self.levels
                ),
            })
    }
}

/// Dispersions, per-level fits and Cook's statistics of a [`DeseqModel`]
#[derive(Debug, Clone)]
pub struct DeseqFit {
    model: DeseqModel,
    /// Counts after outlier replacement
    counts: Array2<f64>,
    dispersions: DispersionFit,
    fits: Vec<GlmFitResult>,
    replaced_genes: Vec<usize>,
    max_cooks: Vec<f64>,
    cooks_cutoff: f64,
}

impl DeseqFit {
    pub fn model(&self) -> &DeseqModel {
        &self.model
    }

    /// Counts used for the final fits (outliers replaced)
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    pub fn dispersions(&self) -> &DispersionFit {
        &self.dispersions
    }

    pub fn fits(&self) -> &[GlmFitResult] {
        &self.fits
    }

    /// Genes whose counts were replaced and refit
    pub fn replaced_genes(&self) -> &[usize] {
        &self.replaced_genes
    }

    pub fn max_cooks(&self) -> &[f64] {
        &self.max_cooks
    }

    pub fn cooks_cutoff(&self) -> f64 {
        self.cooks_cutoff
    }
}

impl DeseqEngine {
    pub fn new(params: EngineParams) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .build()
            .map_err(|e| PipelineError::Configuration {
                reason: format!("cannot start {} worker threads: {}", params.threads, e),
            })?;
        Ok(Self { params, pool })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    fn fit_genes(
        &self,
        counts: ArrayView2<'_, f64>,
        genes: &[usize],
        size_factors: &[f64],
        groups: &[usize],
        n_levels: usize,
        dispersions: &[f64],
    ) -> Vec<GlmFitResult> {
        let glm = self.params.glm_params();
        genes
            .par_iter()
            .map(|&i| {
                // All-zero genes have no dispersion estimate
                let alpha = if dispersions[i].is_finite() {
                    dispersions[i]
                } else {
                    self.params.min_disp
                };
                fit_single_gene(counts.row(i), size_factors, groups, n_levels, alpha, &glm)
            })
            .collect()
    }

    fn fit_effects_inner(&self, model: DeseqModel) -> Result<DeseqFit> {
        let groups = &model.groups;
        let n_levels = model.levels.len();
        let (n_genes, m) = model.counts.dim();
        let raw = model.counts.view();
        let sf = model.size_factors.to_vec();

        let disp_params = self.params.dispersion_params();
        let mut dispersions =
            estimate_dispersions(&model.normalized, &sf, groups, n_levels, &disp_params)?;
        log::info!(
            "Dispersions estimated for {} genes (prior variance {:.4})",
            n_genes,
            dispersions.prior_var
        );

        let all_genes: Vec<usize> = (0..n_genes).collect();
        let mut fits = self.fit_genes(raw, &all_genes, &sf, groups, n_levels, &dispersions.map);
        let not_converged = fits.iter().filter(|f| !f.converged).count();
        if not_converged > 0 {
            log::warn!("{} genes did not converge", not_converged);
        }

        let cooks = cooks_matrix(raw, &model.normalized, &fits, groups, n_levels);
        let cutoff = cooks_cutoff(m, n_levels);
        log::debug!("Cook's distance cutoff: {:.4}", cutoff);

        let replaceable = if self.params.refit_cooks {
            replaceable_samples(groups, n_levels, self.params.min_replicates)
        } else {
            vec![false; m]
        };

        let mut final_counts = raw.to_owned();
        let mut replaced_genes = Vec::new();
        if replaceable.iter().any(|&r| r) {
            let (replaced, changed) = replace_outliers(
                raw,
                cooks.view(),
                &sf,
                &replaceable,
                cutoff,
                self.params.cooks_trim,
            );
            if !changed.is_empty() {
                log::info!(
                    "Replaced outlier counts in {} genes, refitting them",
                    changed.len()
                );
                let renormalized = normalized_counts(replaced.view(), &model.size_factors);
                let refit_disp =
                    estimate_dispersions(&renormalized, &sf, groups, n_levels, &disp_params)?;
                for &i in &changed {
                    dispersions.gene_wise[i] = refit_disp.gene_wise[i];
                    dispersions.map[i] = refit_disp.map[i];
                }
                let refits = self.fit_genes(
                    replaced.view(),
                    &changed,
                    &sf,
                    groups,
                    n_levels,
                    &dispersions.map,
                );
                for (&i, fit) in changed.iter().zip(refits) {
                    fits[i] = fit;
                }
            }
            final_counts = replaced;
            replaced_genes = changed;
        } else if self.params.refit_cooks {
            log::debug!(
                "No level has {} or more samples; outliers are not replaced",
                self.params.min_replicates
            );
        }

        let max_cooks = max_cooks(cooks.view(), groups, n_levels, &replaceable);
        let flagged = max_cooks.iter().filter(|&&d| d > cutoff).count();
        if flagged > 0 {
            log::info!("{} genes flagged as Cook's outliers", flagged);
        }

        Ok(DeseqFit {
            model,
            counts: final_counts,
            dispersions,
            fits,
            replaced_genes,
            max_cooks,
            cooks_cutoff: cutoff,
        })
    }
}

/// Cook's distances of every gene and sample
fn cooks_matrix(
    counts: ArrayView2<'_, f64>,
    normalized: &Array2<f64>,
    fits: &[GlmFitResult],
    groups: &[usize],
    n_levels: usize,
) -> Array2<f64> {
    let rows: Vec<Vec<f64>> = (0..counts.nrows())
        .into_par_iter()
        .map(|i| {
            let y = counts.row(i).to_vec();
            let q = normalized.row(i).to_vec();
            let robust = robust_moments_dispersion(&q, groups, n_levels);
            cooks_distances(&y, &fits[i].mu, &fits[i].hat_diagonals, robust, n_levels)
        })
        .collect();

    let mut cooks = Array2::zeros(counts.dim());
    for (i, row) in rows.into_iter().enumerate() {
        for (j, d) in row.into_iter().enumerate() {
            cooks[[i, j]] = d;
        }
    }
    cooks
}

impl StatisticsEngine for DeseqEngine {
    type Model = DeseqModel;
    type Fitted = DeseqFit;

    fn fit(&self, counts: &CountMatrix, design: &SampleDesign) -> Result<DeseqModel> {
        if design.n_samples() != counts.n_samples() {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} design rows", counts.n_samples()),
                got: format!("{} design rows", design.n_samples()),
            });
        }
        let levels = design.levels();
        let n_levels = levels.len();
        if n_levels < 2 {
            return Err(PipelineError::StatisticalFit {
                reason: format!(
                    "design needs at least two {} levels, found {}",
                    CONDITION_FACTOR, n_levels
                ),
            });
        }
        if counts.n_samples() <= n_levels {
            return Err(PipelineError::StatisticalFit {
                reason: format!(
                    "{} samples for {} coefficients leave no residual degrees of freedom",
                    counts.n_samples(),
                    n_levels
                ),
            });
        }

        let raw = counts.counts();
        let size_factors = estimate_size_factors(raw, SizeFactorMethod::Ratio)?;
        let normalized = normalized_counts(raw, &size_factors);
        Ok(DeseqModel {
            gene_ids: counts.gene_ids().to_vec(),
            sample_ids: counts.sample_ids().to_vec(),
            levels,
            groups: design.level_indices(),
            counts: raw.to_owned(),
            size_factors,
            normalized,
        })
    }

    fn normalize(&self, model: &DeseqModel) -> Result<NormalizedMatrix> {
        let values = self.pool.install(|| -> Result<Array2<f64>> {
            let sf = model.size_factors.to_vec();
            let trend = blind_dispersion_trend(&model.normalized, &sf, self.params.min_disp)?;
            Ok(vst(&model.normalized, &trend))
        })?;
        ExpressionMatrix::new(values, model.gene_ids.clone(), model.sample_ids.clone())
    }

    fn fit_effects(&self, model: DeseqModel) -> Result<DeseqFit> {
        log::info!(
            "Fitting {} genes x {} samples, {} levels of {}",
            model.gene_ids.len(),
            model.sample_ids.len(),
            model.levels.len(),
            CONDITION_FACTOR
        );
        self.pool.install(|| self.fit_effects_inner(model))
    }

    fn test(&self, fitted: &DeseqFit, a: &str, b: &str) -> Result<DgeResults> {
        let model = &fitted.model;
        let ia = model.level_index(a)?;
        let ib = model.level_index(b)?;
        if ia == ib {
            return Err(PipelineError::InvalidInput {
                reason: format!("cannot test level '{}' against itself", a),
            });
        }

        let contrast = Contrast::new(CONDITION_FACTOR, b, a);
        let mut results = DgeResults::new(model.gene_ids.clone(), contrast);

        let in_pair: Vec<usize> = (0..model.groups.len())
            .filter(|&j| model.groups[j] == ia || model.groups[j] == ib)
            .collect();
        let sf = &model.size_factors;

        for (i, row) in fitted.counts.axis_iter(Axis(0)).enumerate() {
            results.base_means[i] = row
                .iter()
                .zip(sf.iter())
                .map(|(&y, &s)| y / s)
                .sum::<f64>()
                / row.len() as f64;

            let stat = if in_pair.iter().all(|&j| row[j] == 0.0) {
                WaldStatistic::untestable()
            } else {
                let fit = &fitted.fits[i];
                wald_test(&fit.levels[ib], &fit.levels[ia])
            };
            results.log2_fold_changes[i] = stat.log2_fold_change;
            results.lfc_se[i] = stat.lfc_se;
            results.stat[i] = stat.stat;
            results.pvalues[i] = if fitted.max_cooks[i] > fitted.cooks_cutoff {
                f64::NAN
            } else {
                stat.pvalue
            };
        }

        results.padj = benjamini_hochberg(&results.pvalues);
        Ok(results)
    }
}
