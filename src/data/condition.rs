//! Condition column inference from sample metadata
//!
//! Run tables downloaded from the sequence archive carry dozens of columns and
//! rarely name the experimental factor consistently. The resolver picks the
//! column most likely to encode the grouping by cardinality and name.

use crate::error::{PipelineError, Result};

use super::SampleMetadata;

/// Columns that never encode the experimental condition
pub const EXCLUDED_COLUMNS: [&str; 8] = [
    "Run",
    "Sample Name",
    "LibraryName",
    "avgLength",
    "Bases",
    "spots",
    "Experiment",
    "BioProject",
];

/// Preferred column names, highest priority first
pub const PRIORITY_COLUMNS: [&str; 4] = ["condition", "treatment", "group", "factor"];

/// Smallest number of distinct values a condition column may have
pub const MIN_LEVELS: usize = 2;

/// Largest number of distinct values a condition column may have
pub const MAX_LEVELS: usize = 10;

/// A metadata column that passed the cardinality filter
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionCandidate {
    pub column: String,
    pub n_levels: usize,
}

/// Columns eligible as condition column, in table order
pub fn condition_candidates(metadata: &SampleMetadata) -> Vec<ConditionCandidate> {
    metadata
        .column_names()
        .filter(|name| !EXCLUDED_COLUMNS.contains(name))
        .filter(|name| !metadata.is_all_missing(name))
        .filter_map(|name| {
            let n_levels = metadata.distinct_values(name)?.len();
            (MIN_LEVELS..=MAX_LEVELS)
                .contains(&n_levels)
                .then(|| ConditionCandidate {
                    column: name.to_string(),
                    n_levels,
                })
        })
        .collect()
}

/// Select the metadata column holding condition labels
///
/// A candidate named after one of [`PRIORITY_COLUMNS`] wins outright (first in
/// priority order). Otherwise the candidate with the fewest distinct values is
/// returned, the earliest column winning ties.
pub fn infer_condition_column(metadata: &SampleMetadata) -> Result<String> {
    let candidates = condition_candidates(metadata);

    if candidates.is_empty() {
        return Err(PipelineError::Configuration {
            reason: format!(
                "no suitable condition column found in metadata (need {}-{} distinct values)",
                MIN_LEVELS, MAX_LEVELS
            ),
        });
    }

    for preferred in PRIORITY_COLUMNS {
        if candidates.iter().any(|c| c.column == preferred) {
            log::info!("Automatically selected condition column: '{}'", preferred);
            return Ok(preferred.to_string());
        }
    }

    // min_by_key returns the first minimum, keeping column order for ties
    let best = candidates
        .iter()
        .min_by_key(|c| c.n_levels)
        .map(|c| c.column.clone())
        .unwrap_or_default();
    log::warn!(
        "Using best guess for condition column: '{}' ({} candidates considered)",
        best,
        candidates.len()
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<(&str, Vec<Option<&str>>)>) -> SampleMetadata {
        let n = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut meta = SampleMetadata::new(n);
        for (name, values) in columns {
            meta.add_column(name, values.into_iter().map(|v| v.map(String::from)).collect())
                .unwrap();
        }
        meta
    }

    #[test]
    fn test_condition_column_wins_regardless_of_scores() {
        let meta = table(vec![
            ("Run", vec![Some("SRR1"), Some("SRR2"), Some("SRR3"), Some("SRR4")]),
            ("strain", vec![Some("a"), Some("a"), Some("b"), Some("b")]),
            ("condition", vec![Some("x"), Some("y"), Some("z"), Some("w")]),
        ]);
        assert_eq!(infer_condition_column(&meta).unwrap(), "condition");
    }

    #[test]
    fn test_priority_order() {
        let meta = table(vec![
            ("group", vec![Some("a"), Some("b")]),
            ("treatment", vec![Some("c"), Some("d")]),
        ]);
        assert_eq!(infer_condition_column(&meta).unwrap(), "treatment");
    }

    #[test]
    fn test_fewest_levels_with_stable_ties() {
        let meta = table(vec![
            ("Run", vec![Some("SRR1"), Some("SRR2"), Some("SRR3")]),
            ("temperature", vec![Some("30"), Some("37"), Some("42")]),
            ("media", vec![Some("LB"), Some("M9"), Some("LB")]),
            ("phase", vec![Some("log"), Some("log"), Some("stat")]),
        ]);
        assert_eq!(infer_condition_column(&meta).unwrap(), "media");
    }

    #[test]
    fn test_excluded_and_missing_columns_ignored() {
        let meta = table(vec![
            ("Experiment", vec![Some("SRX1"), Some("SRX2")]),
            ("empty", vec![None, None]),
            ("genotype", vec![Some("wt"), Some("ko")]),
        ]);
        let candidates = condition_candidates(&meta);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].column, "genotype");
    }

    #[test]
    fn test_missing_values_not_counted_as_level() {
        let meta = table(vec![("dose", vec![Some("low"), None, Some("low")])]);
        assert!(condition_candidates(&meta).is_empty());
    }

    #[test]
    fn test_no_candidate_is_configuration_error() {
        let ids: Vec<String> = (0..12).map(|i| format!("id{}", i)).collect();
        let meta = table(vec![
            ("Run", vec![Some("SRR1"); 12]),
            ("constant", vec![Some("same"); 12]),
            ("unique", ids.iter().map(|s| Some(s.as_str())).collect()),
        ]);
        assert!(matches!(
            infer_condition_column(&meta),
            Err(PipelineError::Configuration { .. })
        ));
    }
}
