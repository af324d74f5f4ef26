//! Count matrices, run metadata and the sample design

mod collapse;
pub mod condition;
mod count_matrix;
mod design;
mod expression;
mod metadata;

pub use collapse::{chunked_reduce, collapse_replicates, collapse_replicates_with_chunk, REPLICATE_CHUNK};
pub use condition::infer_condition_column;
pub use count_matrix::CountMatrix;
pub use expression::{ExpressionMatrix, NormalizedMatrix};
pub use design::{strip_label_suffix, SampleDesign, CONDITION_FACTOR};
pub use metadata::{SampleMetadata, RUN_COLUMN};
