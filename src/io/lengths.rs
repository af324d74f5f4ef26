//! Gene-length reference table

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize)]
struct LengthRecord {
    gene_id: String,
    length: f64,
}

/// Read a `gene_id,length` CSV into a map
///
/// Columns are matched by name, so extra columns such as a leading unnamed
/// index are ignored. A gene listed twice keeps its last length.
pub fn read_gene_lengths<P: AsRef<Path>>(path: P) -> Result<HashMap<String, f64>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in ["gene_id", "length"] {
        if !headers.iter().any(|h| h == required) {
            return Err(PipelineError::MissingColumn {
                column: required.to_string(),
                table: format!("gene-length table {}", path.display()),
            });
        }
    }

    let mut lengths = HashMap::new();
    for record in reader.deserialize() {
        let record: LengthRecord = record?;
        lengths.insert(record.gene_id, record.length);
    }

    if lengths.is_empty() {
        return Err(PipelineError::EmptyData {
            reason: format!("No gene lengths in {}", path.display()),
        });
    }
    log::info!("Loaded {} gene lengths", lengths.len());
    Ok(lengths)
}
