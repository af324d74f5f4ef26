//! End-to-end pipeline: metadata, counts, TPM, aggregation and pairwise tests

use std::path::{Path, PathBuf};

use crate::data::{collapse_replicates, infer_condition_column, CountMatrix, SampleDesign, SampleMetadata};
use crate::engine::{DeseqEngine, EngineParams, StatisticsEngine};
use crate::error::Result;
use crate::io::{
    default_metadata_path, download_metadata, load_read_counts, read_gene_lengths, read_metadata,
    write_matrix_csv, write_results_csv, LoaderParams, DEFAULT_ALPHA, DEFAULT_DOWNLOADER,
};
use crate::normalization::tpm_matrix;

/// Genes with a smaller total count are not tested
pub const DEFAULT_MIN_TOTAL_COUNT: f64 = 10.0;

/// Settings of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub project_id: String,
    /// `gene_id,length` table used for TPM
    pub gene_lengths: PathBuf,
    /// Root of the input layout; every output is written here
    pub root: PathBuf,
    /// Read-count table; defaults to `<root>/read_counts/featureCounts_results_<id>.txt`
    pub counts: Option<PathBuf>,
    /// Run table; when absent it is downloaded to `<id>/SraRunTable.csv`
    pub metadata: Option<PathBuf>,
    pub downloader: String,
    pub min_total_count: f64,
    pub loader: LoaderParams,
    pub engine: EngineParams,
}

impl PipelineConfig {
    pub fn new(project_id: &str, gene_lengths: PathBuf, root: PathBuf) -> Self {
        Self {
            project_id: project_id.to_string(),
            gene_lengths,
            root,
            counts: None,
            metadata: None,
            downloader: DEFAULT_DOWNLOADER.to_string(),
            min_total_count: DEFAULT_MIN_TOTAL_COUNT,
            loader: LoaderParams::default(),
            engine: EngineParams::default(),
        }
    }

    pub fn counts_path(&self) -> PathBuf {
        self.counts.clone().unwrap_or_else(|| {
            self.root
                .join("read_counts")
                .join(format!("featureCounts_results_{}.txt", self.project_id))
        })
    }

    pub fn tpm_path(&self) -> PathBuf {
        self.root.join(format!("{}_tpm_counts.csv", self.project_id))
    }

    pub fn normalized_path(&self) -> PathBuf {
        normalized_counts_path(&self.root, &self.project_id)
    }
}

fn normalized_counts_path(out_dir: &Path, project_id: &str) -> PathBuf {
    out_dir.join(format!("{}_rlog_normalized_counts.csv", project_id))
}

/// Files written by [`run_differential_expression`]
#[derive(Debug, Clone)]
pub struct DgeOutputs {
    pub normalized: PathBuf,
    /// One results table per pair of conditions, in pair order
    pub results: Vec<PathBuf>,
}

/// Files written by [`run_pipeline`]
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub condition_column: String,
    pub tpm: PathBuf,
    pub dge: DgeOutputs,
}

/// Run one stage, logging its name if it fails
pub fn stage<T>(name: &str, run: impl FnOnce() -> Result<T>) -> Result<T> {
    log::debug!("Stage '{}' started", name);
    run().map_err(|e| {
        log::error!("Stage '{}' failed: {}", name, e);
        e
    })
}

/// Fit the engine on aggregated counts and write every artifact
///
/// Genes with a total count below `min_total_count` are removed first. The
/// normalized matrix goes to `<out_dir>/<project>_rlog_normalized_counts.csv`
/// before the effects are fitted, and each pair `(A, B)` of levels in first-seen order is tested as B vs A
/// and written to `DGE_{B}_vs_{A}_{project}.csv`.
pub fn run_differential_expression<E: StatisticsEngine>(
    engine: &E,
    counts: &CountMatrix,
    design: &SampleDesign,
    project_id: &str,
    out_dir: &Path,
    min_total_count: f64,
) -> Result<DgeOutputs> {
    let filtered = counts.filter_min_total(min_total_count)?;
    log::info!(
        "{} of {} genes have a total count of at least {}",
        filtered.n_genes(),
        counts.n_genes(),
        min_total_count
    );

    let model = engine.fit(&filtered, design)?;

    let normalized = engine.normalize(&model)?;
    let normalized_path = normalized_counts_path(out_dir, project_id);
    write_matrix_csv(&normalized_path, &normalized)?;
    log::info!("Normalized counts written to {}", normalized_path.display());

    let fitted = engine.fit_effects(model)?;
    let mut results = Vec::new();
    for (a, b) in design.level_pairs() {
        let table = engine.test(&fitted, &a, &b)?;
        let path = out_dir.join(table.contrast.file_name(project_id));
        write_results_csv(&path, &table)?;
        log::info!("{}: {}", table.contrast, table.summary(DEFAULT_ALPHA));
        results.push(path);
    }

    Ok(DgeOutputs {
        normalized: normalized_path,
        results,
    })
}

/// Locate (downloading if needed) and read the run table
pub fn load_metadata(config: &PipelineConfig) -> Result<SampleMetadata> {
    let path = match &config.metadata {
        Some(path) => path.clone(),
        None => {
            let path = default_metadata_path(&config.project_id);
            stage("metadata download", || {
                download_metadata(&config.downloader, &config.project_id, &path)
            })?;
            path
        }
    };
    stage("metadata loading", || read_metadata(&path))
}

/// Run the whole pipeline for one project
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutputs> {
    let metadata = load_metadata(config)?;
    let condition_column = stage("condition inference", || infer_condition_column(&metadata))?;

    let counts_path = config.counts_path();
    let counts = stage("read-count loading", || {
        load_read_counts(&counts_path, &metadata, &condition_column, &config.loader)
    })?;

    let tpm_path = config.tpm_path();
    stage("TPM normalization", || {
        let lengths = read_gene_lengths(&config.gene_lengths)?;
        let tpm = tpm_matrix(&counts, &lengths)?;
        write_matrix_csv(&tpm_path, &tpm)
    })?;
    log::info!("TPM table written to {}", tpm_path.display());

    let (averaged, design) = stage("sample aggregation", || collapse_replicates(&counts))?;
    log::info!(
        "Averaged {} run columns into {} samples over {} conditions",
        counts.n_samples(),
        averaged.n_samples(),
        design.levels().len()
    );

    let dge = stage("differential expression", || {
        let engine = DeseqEngine::new(config.engine.clone())?;
        run_differential_expression(
            &engine,
            &averaged,
            &design,
            &config.project_id,
            &config.root,
            config.min_total_count,
        )
    })?;

    Ok(PipelineOutputs {
        condition_column,
        tpm: tpm_path,
        dge,
    })
}
