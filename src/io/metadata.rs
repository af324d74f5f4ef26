//! Run-table (sample metadata) CSV reading

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::data::{SampleMetadata, RUN_COLUMN};
use crate::error::{PipelineError, Result};

/// Cell values treated as missing
pub const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn parse_cell(raw: &str) -> Option<String> {
    if MISSING_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Rename repeated headers to `name.1`, `name.2`, ...
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    headers
        .iter()
        .map(|h| {
            let count = seen.entry(h.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                return h.clone();
            }
            let mut suffix = *count - 1;
            let mut candidate = format!("{}.{}", h, suffix);
            while taken.contains(&candidate) {
                suffix += 1;
                candidate = format!("{}.{}", h, suffix);
            }
            taken.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Read a run table; every cell is kept as a string
///
/// The table must contain a `Run` column.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)?;

    let raw_headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if raw_headers.is_empty() {
        return Err(PipelineError::EmptyData {
            reason: format!("Metadata file {} has no header", path.display()),
        });
    }
    let headers = dedupe_headers(&raw_headers);

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.push(parse_cell(cell));
        }
    }

    let n_rows = columns.first().map_or(0, |c| c.len());
    if n_rows == 0 {
        return Err(PipelineError::EmptyData {
            reason: format!("No runs found in metadata file {}", path.display()),
        });
    }

    let mut metadata = SampleMetadata::new(n_rows);
    for (name, values) in headers.iter().zip(columns) {
        metadata.add_column(name, values)?;
    }
    metadata.require_column(RUN_COLUMN)?;

    log::info!(
        "Loaded metadata for {} runs with {} columns",
        n_rows,
        headers.len()
    );
    Ok(metadata)
}
