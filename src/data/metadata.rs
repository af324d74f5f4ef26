//! Sample metadata table keyed by sequencing run

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Column holding the sequencing-run accession
pub const RUN_COLUMN: &str = "Run";

/// Sample metadata: one row per sequencing run, string-typed columns
///
/// Cells are `None` when missing. Column order is the order of the source
/// table and is significant for condition-column tie breaking.
#[derive(Debug, Clone, Default)]
pub struct SampleMetadata {
    columns: IndexMap<String, Vec<Option<String>>>,
    n_rows: usize,
}

impl SampleMetadata {
    /// Create an empty table with `n_rows` rows and no columns
    pub fn new(n_rows: usize) -> Self {
        Self {
            columns: IndexMap::new(),
            n_rows,
        }
    }

    /// Add a column; its length must match the row count
    pub fn add_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(PipelineError::DimensionMismatch {
                expected: format!("{} values", self.n_rows),
                got: format!("{} values", values.len()),
            });
        }
        if self.columns.contains_key(name) {
            return Err(PipelineError::InvalidMetadata {
                reason: format!("Duplicate column '{}'", name),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Number of rows (runs)
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get the values of a column
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Get a column or fail with a missing-column error
    pub fn require_column(&self, name: &str) -> Result<&[Option<String>]> {
        self.column(name).ok_or_else(|| PipelineError::MissingColumn {
            column: name.to_string(),
            table: "sample metadata".to_string(),
        })
    }

    /// Distinct non-missing values of a column, in first-seen order
    pub fn distinct_values(&self, name: &str) -> Option<IndexSet<&str>> {
        self.columns
            .get(name)
            .map(|values| values.iter().flatten().map(|v| v.as_str()).collect())
    }

    /// Whether every value of a column is missing
    pub fn is_all_missing(&self, name: &str) -> bool {
        self.columns
            .get(name)
            .map_or(true, |values| values.iter().all(|v| v.is_none()))
    }

    /// Keep only rows where `column` has a value
    pub fn drop_missing(&self, column: &str) -> Result<Self> {
        let keep: Vec<usize> = self
            .require_column(column)?
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| i)
            .collect();
        self.subset(&keep)
    }

    /// Subset metadata to specific rows
    pub fn subset(&self, row_indices: &[usize]) -> Result<Self> {
        let mut new_meta = SampleMetadata::new(row_indices.len());
        for (name, values) in &self.columns {
            let new_values: Vec<Option<String>> =
                row_indices.iter().map(|&i| values[i].clone()).collect();
            new_meta.add_column(name, new_values)?;
        }
        Ok(new_meta)
    }

    /// Run ids present in the `Run` column
    pub fn run_ids(&self) -> Result<Vec<&str>> {
        Ok(self
            .require_column(RUN_COLUMN)?
            .iter()
            .flatten()
            .map(|s| s.as_str())
            .collect())
    }

    /// Map each run id to its value in `condition_column`
    ///
    /// Rows missing either value are skipped. A run listed twice keeps its
    /// last value.
    pub fn run_to_condition(&self, condition_column: &str) -> Result<HashMap<String, String>> {
        let runs = self.require_column(RUN_COLUMN)?;
        let conditions = self.require_column(condition_column)?;
        Ok(runs
            .iter()
            .zip(conditions.iter())
            .filter_map(|(run, cond)| match (run, cond) {
                (Some(r), Some(c)) => Some((r.clone(), c.clone())),
                _ => None,
            })
            .collect())
    }
}
