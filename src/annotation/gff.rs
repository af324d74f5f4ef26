//! GFF3 feature parsing into a flat table

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::error::{PipelineError, Result};

/// The eight fixed GFF columns preceding the attributes
pub const BASE_FIELDS: [&str; 8] = [
    "seqid", "source", "type", "start", "end", "score", "strand", "phase",
];

/// Attribute that marks a feature as annotated
pub const PRODUCT_ATTRIBUTE: &str = "product";

/// One feature: base fields followed by its attributes
pub type FeatureRow = IndexMap<String, String>;

/// Split a column-9 string into `key=value` pairs
///
/// Pairs are separated by `;` and split at the first `=`; pairs without `=`
/// are ignored.
pub fn parse_attributes(attributes: &str) -> IndexMap<String, String> {
    attributes
        .trim()
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parse a feature line; `None` for comments and lines without 9 fields
pub fn parse_gff_line(line: &str) -> Option<FeatureRow> {
    if line.starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.trim().split('\t').collect();
    if fields.len() != 9 {
        return None;
    }

    let mut row: FeatureRow = BASE_FIELDS
        .iter()
        .zip(&fields[..8])
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    // Attributes win over base fields of the same name
    row.extend(parse_attributes(fields[8]));
    Some(row)
}

/// All features of a GFF file, with the union of their columns
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    columns: IndexSet<String>,
    rows: Vec<FeatureRow>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self {
            columns: BASE_FIELDS.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: FeatureRow) {
        for key in row.keys() {
            if !self.columns.contains(key) {
                self.columns.insert(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Base fields, then attribute keys in first-seen order
    pub fn columns(&self) -> &IndexSet<String> {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Keep only features with a non-empty `product` attribute
    pub fn with_product(&self) -> Result<Self> {
        let rows: Vec<FeatureRow> = self
            .rows
            .iter()
            .filter(|row| row.get(PRODUCT_ATTRIBUTE).is_some_and(|p| !p.is_empty()))
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(PipelineError::InvalidAnnotation {
                reason: format!("no feature carries a '{}' attribute", PRODUCT_ATTRIBUTE),
            });
        }
        log::info!(
            "Kept {} of {} features with a {}",
            rows.len(),
            self.rows.len(),
            PRODUCT_ATTRIBUTE
        );
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// `(id, |end - start|)` for every feature carrying `id_attribute`
    pub fn gene_lengths(&self, id_attribute: &str) -> Result<Vec<(String, u64)>> {
        let mut lengths = Vec::new();
        let mut skipped = 0usize;
        for row in &self.rows {
            let Some(id) = row.get(id_attribute).filter(|id| !id.is_empty()) else {
                skipped += 1;
                continue;
            };
            let start = coordinate(row, "start")?;
            let end = coordinate(row, "end")?;
            lengths.push((id.clone(), end.abs_diff(start)));
        }
        if skipped > 0 {
            log::debug!("{} features have no '{}' and get no length", skipped, id_attribute);
        }
        Ok(lengths)
    }
}

fn coordinate(row: &FeatureRow, field: &str) -> Result<i64> {
    let raw = row.get(field).map(String::as_str).unwrap_or("");
    raw.trim()
        .parse::<i64>()
        .map_err(|_| PipelineError::InvalidAnnotation {
            reason: format!("invalid {} coordinate '{}'", field, raw),
        })
}

/// Read every feature line of a GFF file
pub fn read_gff<P: AsRef<Path>>(path: P) -> Result<AnnotationTable> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut table = AnnotationTable::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        match parse_gff_line(&line) {
            Some(row) => table.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} lines without 9 tab-separated fields", skipped);
    }
    log::info!(
        "Parsed {} features with {} columns from {}",
        table.n_rows(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}
