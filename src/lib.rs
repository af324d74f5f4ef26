//! rnaseq_dge: RNA-seq read counts to expression tables and differential expression
//!
//! The crate turns featureCounts tables and SRA run tables into TPM tables,
//! averages technical replicates into biological samples, and tests every
//! pair of inferred conditions with a DESeq2-style negative binomial model.
//!
//! # Example
//!
//! ```ignore
//! use rnaseq_dge::prelude::*;
//!
//! let metadata = read_metadata("SraRunTable.csv")?;
//! let column = infer_condition_column(&metadata)?;
//! let counts = load_read_counts("counts.txt", &metadata, &column, &LoaderParams::default())?;
//!
//! let (averaged, design) = collapse_replicates(&counts)?;
//! let engine = DeseqEngine::new(EngineParams::default())?;
//! run_differential_expression(&engine, &averaged, &design, "PRJNA1", Path::new("out"), 10.0)?;
//! ```

pub mod annotation;
pub mod cli;
pub mod data;
pub mod dispersion;
pub mod engine;
pub mod error;
pub mod filter;
pub mod glm;
pub mod io;
pub mod normalization;
pub mod pipeline;
pub mod stats;
pub mod testing;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotation::{extract_annotation, read_gff, AnnotationTable};
    pub use crate::data::{
        collapse_replicates, infer_condition_column, CountMatrix, ExpressionMatrix, NormalizedMatrix,
        SampleDesign, SampleMetadata,
    };
    pub use crate::engine::{DeseqEngine, DeseqFit, DeseqModel, EngineParams, StatisticsEngine};
    pub use crate::error::{PipelineError, Result};
    pub use crate::io::{
        load_read_counts, read_gene_lengths, read_metadata, write_matrix_csv, write_results_csv,
        Contrast, DgeResults, LoaderParams,
    };
    pub use crate::normalization::{tpm, tpm_matrix};
    pub use crate::pipeline::{run_differential_expression, run_pipeline, PipelineConfig};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::fs;
    use std::io::Write;

    const RUNS: [&str; 12] = [
        "SRR101", "SRR102", "SRR103", "SRR104", "SRR105", "SRR106", "SRR107", "SRR108", "SRR109",
        "SRR110", "SRR111", "SRR112",
    ];

    /// Two runs per biological sample, two samples per condition
    fn run_table(path: &std::path::Path) {
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, "Run,Bases,Sample Name,treatment,strain").unwrap();
        let labels = [
            "ctrl_a", "ctrl_a", "ctrl_b", "ctrl_b", "heat_a", "heat_a", "heat_b", "heat_b",
            "cold_a", "cold_a", "cold_b", "cold_b",
        ];
        for (run, label) in RUNS.iter().zip(labels) {
            writeln!(file, "{},1000,{},{},K-12", run, run, label).unwrap();
        }
        writeln!(file, "SRR999,1000,SRR999,NA,K-12").unwrap();
    }

    fn feature_counts(path: &std::path::Path) {
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, "# Program:featureCounts v2.0.6").unwrap();
        let mut header = "Geneid\tChr\tStart\tEnd\tStrand\tLength".to_string();
        for run in RUNS {
            header.push_str(&format!("\t/bam/{}.sorted.bam", run));
        }
        header.push_str("\t/bam/SRR101_unpaired.bam\t/bam/SRR999.sorted.bam");
        writeln!(file, "{}", header).unwrap();

        let genes: [(&str, [f64; 3]); 6] = [
            ("b0001", [100.0, 400.0, 100.0]),
            ("b0002", [500.0, 500.0, 500.0]),
            ("b0003", [300.0, 300.0, 60.0]),
            ("b0004", [200.0, 210.0, 190.0]),
            ("b0005", [50.0, 55.0, 45.0]),
            ("b0006", [1.0, 0.0, 2.0]),
        ];
        for (i, (gene, means)) in genes.iter().enumerate() {
            let mut line = format!("{}\tNC_1\t{}\t{}\t+\t300", gene, i * 1000, i * 1000 + 300);
            for (r, _) in RUNS.iter().enumerate() {
                let level = r / 4;
                let wobble = [0.9, 1.1, 1.0, 1.05][r % 4];
                line.push_str(&format!("\t{}", (means[level] * wobble).round()));
            }
            line.push_str("\t7\t7");
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn gene_lengths(path: &std::path::Path) {
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, ",gene_id,length").unwrap();
        for (i, gene) in ["b0001", "b0002", "b0003", "b0004", "b0005"].iter().enumerate() {
            writeln!(file, "{},{},{}", i, gene, 300 * (i + 1)).unwrap();
        }
    }

    #[test]
    fn test_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("read_counts")).unwrap();

        let metadata = root.join("SraRunTable.csv");
        run_table(&metadata);
        feature_counts(&root.join("read_counts/featureCounts_results_PRJNA42.txt"));
        let lengths = root.join("gene_lengths.csv");
        gene_lengths(&lengths);

        let mut config = PipelineConfig::new("PRJNA42", lengths, root.clone());
        config.metadata = Some(metadata);
        config.engine.threads = 2;

        let outputs = run_pipeline(&config).unwrap();
        assert_eq!(outputs.condition_column, "treatment");

        // TPM keeps every gene and every matched run column
        let tpm = fs::read_to_string(root.join("PRJNA42_tpm_counts.csv")).unwrap();
        let mut lines = tpm.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header.len(), 13);
        assert_eq!(header[1], "ctrl_a");
        let b0006: Vec<&str> = tpm.lines().last().unwrap().split(',').collect();
        assert_eq!(b0006[0], "b0006");
        assert_eq!(b0006[1], "");

        // Pairs in first-seen order: (ctrl, heat), (ctrl, cold), (heat, cold)
        let names: Vec<String> = outputs
            .dge
            .results
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "DGE_heat_vs_ctrl_PRJNA42.csv",
                "DGE_cold_vs_ctrl_PRJNA42.csv",
                "DGE_cold_vs_heat_PRJNA42.csv",
            ]
        );

        let normalized = fs::read_to_string(root.join("PRJNA42_rlog_normalized_counts.csv")).unwrap();
        assert!(normalized.starts_with("gene_id,ctrl_a,ctrl_b,heat_a,heat_b,cold_a,cold_b\n"));

        // b0006 (total < 10) is not tested
        let heat = fs::read_to_string(root.join("DGE_heat_vs_ctrl_PRJNA42.csv")).unwrap();
        let rows: Vec<Vec<&str>> = heat.lines().skip(1).map(|l| l.split(',').collect()).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], "b0001");
        let lfc: f64 = rows[0][2].parse().unwrap();
        assert!(lfc > 1.0, "b0001 is up in heat, got {}", lfc);
        let cold = fs::read_to_string(root.join("DGE_cold_vs_ctrl_PRJNA42.csv")).unwrap();
        let b0003: Vec<&str> = cold.lines().nth(3).unwrap().split(',').collect();
        assert!(b0003[2].parse::<f64>().unwrap() < -1.0);
    }
}
