//! Command-line interface for rnaseq_dge

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::annotation::DEFAULT_ID_ATTRIBUTE;
use crate::engine::EngineParams;
use crate::io::{LoaderParams, DEFAULT_DOWNLOADER};
use crate::pipeline::PipelineConfig;

#[derive(Parser)]
#[command(name = "rnaseq_dge")]
#[command(version)]
#[command(about = "RNA-seq read counts to TPM tables and pairwise differential expression")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an annotation table and gene lengths from a GFF file
    #[command(after_long_help = "\
Examples:
  rnaseq_dge annotate --gff Ecoli_ASM584v2.gff \\
    --annotation gene_annotation.csv --lengths gene_lengths.csv")]
    Annotate {
        /// GFF3 genome annotation
        #[arg(long)]
        gff: PathBuf,

        /// Output CSV of annotated features (those with a `product`)
        #[arg(long)]
        annotation: PathBuf,

        /// Output `gene_id,length` CSV
        #[arg(long)]
        lengths: PathBuf,

        /// Attribute used as the gene id of the length table
        #[arg(long, default_value = DEFAULT_ID_ATTRIBUTE)]
        id_attribute: String,
    },

    /// Run the full pipeline for one project
    #[command(
        long_about = "Run the full pipeline for one project\n\n\
            Downloads (or reads) the run table, infers the condition column, loads\n\
            featureCounts output, writes a TPM table, averages technical replicates\n\
            and tests every pair of conditions.",
        after_long_help = "\
Examples:
  # Download metadata with pysradb, read <ROOT>/read_counts/featureCounts_results_<ID>.txt
  rnaseq_dge run PRJNA123456 gene_lengths.csv /data/project

  # Local metadata and counts, 4 worker threads
  rnaseq_dge run PRJNA123456 gene_lengths.csv out \\
    --metadata SraRunTable.csv --counts counts.txt --threads 4"
    )]
    Run {
        /// Project accession, used in output file names
        project_id: String,

        /// `gene_id,length` table for TPM
        gene_lengths: PathBuf,

        /// Root directory of inputs and outputs
        root: PathBuf,

        /// Read-count table [default: <ROOT>/read_counts/featureCounts_results_<PROJECT_ID>.txt]
        #[arg(long)]
        counts: Option<PathBuf>,

        /// Run table; skips the download when given
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Metadata download executable
        #[arg(long, default_value = DEFAULT_DOWNLOADER)]
        downloader: String,

        /// Number of engine worker threads
        #[arg(short = 't', long, default_value_t = 8)]
        threads: usize,

        /// Genes with a smaller total count are not tested
        #[arg(long, default_value_t = 10.0)]
        min_total_count: f64,

        /// Annotation columns between the gene id and the first count column
        #[arg(long, default_value_t = 5)]
        annotation_columns: usize,

        /// Do not replace Cook's outliers and refit
        #[arg(long)]
        no_refit_cooks: bool,
    },

    /// Print the condition column inferred from a run table
    Resolve {
        /// Run table CSV
        #[arg(short, long)]
        metadata: PathBuf,
    },
}

/// Build a pipeline configuration from the `run` arguments
#[allow(clippy::too_many_arguments)]
pub fn pipeline_config(
    project_id: String,
    gene_lengths: PathBuf,
    root: PathBuf,
    counts: Option<PathBuf>,
    metadata: Option<PathBuf>,
    downloader: String,
    threads: usize,
    min_total_count: f64,
    annotation_columns: usize,
    no_refit_cooks: bool,
) -> PipelineConfig {
    let mut config = PipelineConfig::new(&project_id, gene_lengths, root);
    config.counts = counts;
    config.metadata = metadata;
    config.downloader = downloader;
    config.min_total_count = min_total_count;
    config.loader = LoaderParams {
        annotation_columns,
        ..LoaderParams::default()
    };
    config.engine = EngineParams {
        threads,
        refit_cooks: !no_refit_cooks,
        ..EngineParams::default()
    };
    config
}
