//! Sample design table for the single-factor model

use indexmap::IndexSet;

use crate::error::{PipelineError, Result};

/// Name of the only design factor
pub const CONDITION_FACTOR: &str = "condition";

/// One row per averaged sample column, with its `condition` level
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDesign {
    sample_ids: Vec<String>,
    conditions: Vec<String>,
}

/// Strip the trailing `_<suffix>` segment of a column label
///
/// `"heat_30min"` becomes `"heat"`, `"ctrl_0"` becomes `"ctrl"`, a label with no
/// underscore is returned unchanged.
pub fn strip_label_suffix(label: &str) -> &str {
    label.rsplit_once('_').map_or(label, |(head, _)| head)
}

impl SampleDesign {
    /// Create a design from explicit sample ids and condition levels
    pub fn new(sample_ids: Vec<String>, conditions: Vec<String>) -> Result<Self> {
        if sample_ids.len() != conditions.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} condition values", sample_ids.len()),
                got: format!("{} condition values", conditions.len()),
            });
        }
        Ok(Self {
            sample_ids,
            conditions,
        })
    }

    /// Derive the design from averaged column labels
    pub fn from_labels(labels: &[String]) -> Self {
        Self {
            sample_ids: labels.to_vec(),
            conditions: labels
                .iter()
                .map(|l| strip_label_suffix(l).to_string())
                .collect(),
        }
    }

    /// Sample ids (column labels of the averaged matrix)
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Condition level of every sample
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Unique levels in the order they are first encountered among samples
    pub fn levels(&self) -> Vec<String> {
        self.conditions
            .iter()
            .map(|c| c.as_str())
            .collect::<IndexSet<&str>>()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Index of each sample's level within `levels()`
    pub fn level_indices(&self) -> Vec<usize> {
        let levels: IndexSet<&str> = self.conditions.iter().map(|c| c.as_str()).collect();
        self.conditions
            .iter()
            .map(|c| levels.get_index_of(c.as_str()).unwrap_or(0))
            .collect()
    }

    /// Sample indices for a specific level
    pub fn samples_with_level(&self, level: &str) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == level)
            .map(|(i, _)| i)
            .collect()
    }

    /// Every unordered pair of distinct levels, in first-encountered order
    ///
    /// Each pair `(a, b)` is tested as `b` vs `a`.
    pub fn level_pairs(&self) -> Vec<(String, String)> {
        let levels = self.levels();
        let mut pairs = Vec::with_capacity(levels.len() * levels.len().saturating_sub(1) / 2);
        for (i, a) in levels.iter().enumerate() {
            for b in &levels[i + 1..] {
                pairs.push((a.clone(), b.clone()));
            }
        }
        pairs
    }
}
