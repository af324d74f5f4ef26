//! Input/Output: read-count tables, run metadata, gene lengths, result tables

mod counts;
mod download;
mod lengths;
mod metadata;
mod results;
mod tables;

pub use counts::{load_read_counts, normalize_run_ids, read_feature_counts, relabel_by_condition, LoaderParams};
pub use download::{default_metadata_path, download_metadata, DEFAULT_DOWNLOADER};
pub use lengths::read_gene_lengths;
pub use metadata::{dedupe_headers, read_metadata, MISSING_TOKENS};
pub use results::{Contrast, DgeResults, ResultsSummary, DEFAULT_ALPHA};
pub use tables::{format_value, write_matrix_csv, write_results_csv, RESULTS_HEADER};
