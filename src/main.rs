//! rnaseq_dge command-line interface

use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rnaseq_dge::cli::{pipeline_config, Cli, Commands};
use rnaseq_dge::prelude::*;

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Annotate {
            gff,
            annotation,
            lengths,
            id_attribute,
        } => run_annotate(&gff, &annotation, &lengths, &id_attribute),
        Commands::Run {
            project_id,
            gene_lengths,
            root,
            counts,
            metadata,
            downloader,
            threads,
            min_total_count,
            annotation_columns,
            no_refit_cooks,
        } => {
            let config = pipeline_config(
                project_id,
                gene_lengths,
                root,
                counts,
                metadata,
                downloader,
                threads,
                min_total_count,
                annotation_columns,
                no_refit_cooks,
            );
            run_full(&config)
        }
        Commands::Resolve { metadata } => run_resolve(&metadata),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_annotate(gff: &Path, annotation: &Path, lengths: &Path, id_attribute: &str) -> Result<()> {
    info!("Reading GFF features from: {}", gff.display());
    let summary = extract_annotation(gff, annotation, lengths, id_attribute)?;
    info!(
        "  {} features, {} annotated, {} gene lengths",
        summary.features, summary.annotated, summary.lengths
    );
    Ok(())
}

fn run_full(config: &PipelineConfig) -> Result<()> {
    info!("Project: {}", config.project_id);
    info!("Output root: {}", config.root.display());

    let outputs = run_pipeline(config)?;

    info!("Condition column: {}", outputs.condition_column);
    info!("TPM table: {}", outputs.tpm.display());
    info!("Normalized counts: {}", outputs.dge.normalized.display());
    for path in &outputs.dge.results {
        info!("Results: {}", path.display());
    }
    info!("Done!");
    Ok(())
}

fn run_resolve(metadata_path: &Path) -> Result<()> {
    info!("Loading metadata from: {}", metadata_path.display());
    let metadata = read_metadata(metadata_path)?;
    let column = infer_condition_column(&metadata)?;
    println!("{}", column);
    Ok(())
}
