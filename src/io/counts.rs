//! featureCounts read-count table loading and run relabeling

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;
use regex::Regex;

use crate::data::{CountMatrix, SampleMetadata};
use crate::error::{PipelineError, Result};

/// Options controlling how a raw count table is interpreted
#[derive(Debug, Clone)]
pub struct LoaderParams {
    /// Annotation columns dropped after the gene-id column
    /// (`Chr`, `Start`, `End`, `Strand`, `Length` in featureCounts output)
    pub annotation_columns: usize,
    /// Headers matching this pattern are auxiliary columns and discarded
    pub auxiliary_pattern: String,
    /// Pattern extracting the run id from a column header
    pub run_id_pattern: String,
}

impl Default for LoaderParams {
    fn default() -> Self {
        Self {
            annotation_columns: 5,
            auxiliary_pattern: r"paired|unpaired".to_string(),
            run_id_pattern: r"SRR\d+".to_string(),
        }
    }
}

/// Read a featureCounts table
///
/// The first line is a comment written by featureCounts and is skipped. The
/// next line is the header; the first column holds gene ids, the following
/// `annotation_columns` columns are dropped, and so is every remaining column
/// whose header matches the auxiliary pattern.
pub fn read_feature_counts<P: AsRef<Path>>(path: P, params: &LoaderParams) -> Result<CountMatrix> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let mut comment = String::new();
    if reader.read_line(&mut comment)? == 0 {
        return Err(PipelineError::EmptyData {
            reason: format!("Read-count file {} is empty", path.display()),
        });
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    let header: Vec<String> = csv_reader.headers()?.iter().map(|s| s.to_string()).collect();
    let first_count_col = 1 + params.annotation_columns;
    if header.len() <= first_count_col {
        return Err(PipelineError::InvalidCountMatrix {
            reason: format!(
                "Header has {} columns, expected more than {} (gene id + annotation)",
                header.len(),
                first_count_col
            ),
        });
    }

    let auxiliary = Regex::new(&params.auxiliary_pattern)?;
    let keep: Vec<usize> = (first_count_col..header.len())
        .filter(|&j| !auxiliary.is_match(&header[j]))
        .collect();
    let dropped = header.len() - first_count_col - keep.len();
    if dropped > 0 {
        log::debug!("Discarded {} auxiliary columns", dropped);
    }
    let sample_ids: Vec<String> = keep.iter().map(|&j| header[j].clone()).collect();

    let mut gene_ids = Vec::new();
    let mut values = Vec::new();
    for (line_no, record) in csv_reader.records().enumerate() {
        let record = record?;
        if record.len() != header.len() {
            return Err(PipelineError::InvalidCountMatrix {
                reason: format!(
                    "Row {} has {} fields, expected {}",
                    line_no + 1,
                    record.len(),
                    header.len()
                ),
            });
        }
        gene_ids.push(record[0].to_string());
        for &j in &keep {
            let raw = record[j].trim();
            let count = raw.parse::<f64>().map_err(|_| PipelineError::InvalidCountMatrix {
                reason: format!("Invalid count value '{}' for gene {}", raw, &record[0]),
            })?;
            values.push(count);
        }
    }

    if gene_ids.is_empty() {
        return Err(PipelineError::EmptyData {
            reason: "No genes found in read-count file".to_string(),
        });
    }

    let counts = Array2::from_shape_vec((gene_ids.len(), keep.len()), values).map_err(|e| {
        PipelineError::InvalidCountMatrix {
            reason: e.to_string(),
        }
    })?;

    log::info!(
        "Loaded {} genes x {} samples from {}",
        gene_ids.len(),
        sample_ids.len(),
        path.display()
    );
    CountMatrix::new(counts, gene_ids, sample_ids)
}

/// Reduce each header to the run id it contains; unmatched headers are kept
pub fn normalize_run_ids(headers: &[String], run_id: &Regex) -> Vec<String> {
    headers
        .iter()
        .map(|h| run_id.find(h).map_or_else(|| h.clone(), |m| m.as_str().to_string()))
        .collect()
}

/// Restrict raw counts to runs of the metadata and relabel them by condition
///
/// Rows missing a value in `condition_column` are dropped from the metadata
/// first. Columns whose run id is not listed are discarded; kept columns are
/// relabeled with their condition value, or keep their run id when no value
/// is mapped.
pub fn relabel_by_condition(
    raw: &CountMatrix,
    metadata: &SampleMetadata,
    condition_column: &str,
    params: &LoaderParams,
) -> Result<CountMatrix> {
    let metadata = metadata.drop_missing(condition_column)?;
    let known: HashSet<&str> = metadata.run_ids()?.into_iter().collect();
    let run_to_condition = metadata.run_to_condition(condition_column)?;

    let run_id = Regex::new(&params.run_id_pattern)?;
    let runs = normalize_run_ids(raw.sample_ids(), &run_id);

    let keep: Vec<usize> = runs
        .iter()
        .enumerate()
        .filter(|(_, r)| known.contains(r.as_str()))
        .map(|(j, _)| j)
        .collect();

    if keep.is_empty() {
        return Err(PipelineError::InvalidCountMatrix {
            reason: "No count columns match a run id in the metadata".to_string(),
        });
    }
    log::info!(
        "Matched {} of {} count columns to metadata runs",
        keep.len(),
        runs.len()
    );

    let labels: Vec<String> = keep
        .iter()
        .map(|&j| {
            run_to_condition
                .get(&runs[j])
                .cloned()
                .unwrap_or_else(|| runs[j].clone())
        })
        .collect();

    raw.subset_samples(&keep)?.with_sample_ids(labels)
}

/// Read a featureCounts table and relabel its runs by condition
pub fn load_read_counts<P: AsRef<Path>>(
    path: P,
    metadata: &SampleMetadata,
    condition_column: &str,
    params: &LoaderParams,
) -> Result<CountMatrix> {
    let raw = read_feature_counts(path, params)?;
    relabel_by_condition(&raw, metadata, condition_column, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn feature_counts_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Program:featureCounts v2.0.1; Command:\"featureCounts\"").unwrap();
        writeln!(
            file,
            "Geneid\tChr\tStart\tEnd\tStrand\tLength\t/data/SRR001.bam\t/data/SRR002_paired.bam\t/data/SRR003.bam\tunrelated.bam"
        )
        .unwrap();
        writeln!(file, "g1\tchr\t1\t90\t+\t90\t10\t99\t12\t7").unwrap();
        writeln!(file, "g2\tchr\t100\t400\t-\t300\t0\t99\t3\t1").unwrap();
        file
    }

    fn metadata() -> SampleMetadata {
        let mut meta = SampleMetadata::new(3);
        meta.add_column(
            "Run",
            vec![Some("SRR001".into()), Some("SRR003".into()), Some("SRR004".into())],
        )
        .unwrap();
        meta.add_column(
            "condition",
            vec![Some("ctrl_0".into()), Some("heat_30".into()), None],
        )
        .unwrap();
        meta
    }

    #[test]
    fn test_read_feature_counts_drops_annotation_and_auxiliary() {
        let file = feature_counts_file();
        let matrix = read_feature_counts(file.path(), &LoaderParams::default()).unwrap();
        assert_eq!(matrix.gene_ids(), &["g1", "g2"]);
        assert_eq!(
            matrix.sample_ids(),
            &["/data/SRR001.bam", "/data/SRR003.bam", "unrelated.bam"]
        );
        assert_eq!(matrix.counts()[[1, 1]], 3.0);
    }

    #[test]
    fn test_first_run_after_length_column_is_kept() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Program:featureCounts v2.0.6").unwrap();
        writeln!(
            file,
            "Geneid\tChr\tStart\tEnd\tStrand\tLength\tSRR001.bam\tSRR002.bam\tSRR003.bam"
        )
        .unwrap();
        writeln!(file, "g1\tchr\t1\t90\t+\t90\t4\t5\t6").unwrap();

        let matrix = read_feature_counts(file.path(), &LoaderParams::default()).unwrap();
        assert_eq!(matrix.sample_ids(), &["SRR001.bam", "SRR002.bam", "SRR003.bam"]);
        assert_eq!(matrix.counts().row(0).to_vec(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_extra_annotation_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "Geneid\tChr\tStart\tEnd\tStrand\tLength\tType\tSRR001.bam").unwrap();
        writeln!(file, "g1\tchr\t1\t90\t+\t90\tCDS\t4").unwrap();

        let params = LoaderParams {
            annotation_columns: 6,
            ..LoaderParams::default()
        };
        let matrix = read_feature_counts(file.path(), &params).unwrap();
        assert_eq!(matrix.sample_ids(), &["SRR001.bam"]);
    }

    #[test]
    fn test_normalize_run_ids() {
        let re = Regex::new(r"SRR\d+").unwrap();
        let headers = vec!["/x/SRR42.sorted.bam".to_string(), "other".to_string()];
        assert_eq!(normalize_run_ids(&headers, &re), vec!["SRR42", "other"]);
    }

    #[test]
    fn test_load_read_counts_relabels_known_runs() {
        let file = feature_counts_file();
        let matrix = load_read_counts(
            file.path(),
            &metadata(),
            "condition",
            &LoaderParams::default(),
        )
        .unwrap();
        assert_eq!(matrix.sample_ids(), &["ctrl_0", "heat_30"]);
        assert_eq!(matrix.counts().column(0).to_vec(), vec![10.0, 0.0]);
    }

    #[test]
    fn test_no_matching_runs_is_error() {
        let file = feature_counts_file();
        let mut meta = SampleMetadata::new(1);
        meta.add_column("Run", vec![Some("SRR999".into())]).unwrap();
        meta.add_column("condition", vec![Some("a".into())]).unwrap();
        let result = load_read_counts(file.path(), &meta, "condition", &LoaderParams::default());
        assert!(matches!(result, Err(PipelineError::InvalidCountMatrix { .. })));
    }

    #[test]
    fn test_too_few_columns_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "Geneid\tChr\tStart").unwrap();
        writeln!(file, "g1\tchr\t1").unwrap();
        assert!(read_feature_counts(file.path(), &LoaderParams::default()).is_err());
    }
}
