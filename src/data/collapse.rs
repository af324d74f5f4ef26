//! Collapse technical replicates by averaging counts
//!
//! Related to R's collapseReplicates(), but replicate columns are averaged
//! rather than summed, and grouping is positional: consecutive same-labeled
//! columns are taken in chunks of at most [`REPLICATE_CHUNK`].

use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::{CountMatrix, SampleDesign};
use crate::error::{PipelineError, Result};
use crate::stats::round_half_even;

/// Maximum number of technical replicates averaged into one sample column
pub const REPLICATE_CHUNK: usize = 4;

/// Split `items` into consecutive chunks of at most `size` and reduce each
pub fn chunked_reduce<T, R, F>(items: &[T], size: usize, mut reduce: F) -> Vec<R>
where
    F: FnMut(&[T]) -> R,
{
    if size == 0 {
        return Vec::new();
    }
    items.chunks(size).map(|chunk| reduce(chunk)).collect()
}

/// Indices of columns with at least one nonzero count
pub fn expressed_columns(counts: &CountMatrix) -> Vec<usize> {
    counts
        .counts()
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, col)| col.iter().any(|&x| x != 0.0))
        .map(|(j, _)| j)
        .collect()
}

/// Element-wise rounded mean of a set of columns
fn rounded_mean(columns: &[ArrayView1<'_, f64>]) -> Array1<f64> {
    let n = columns.len() as f64;
    let mut acc = Array1::<f64>::zeros(columns[0].len());
    for col in columns {
        acc += col;
    }
    acc.mapv(|x| round_half_even(x / n))
}

/// Average replicate columns into biological-sample columns
///
/// Columns summing to zero are dropped first. Remaining columns are grouped
/// by exact label in first-seen order, each group is split into consecutive
/// chunks of up to [`REPLICATE_CHUNK`], and each chunk becomes one column
/// holding its rounded element-wise mean (a single trailing column is only
/// rounded). Gene rows are never filtered here, even when entirely zero.
///
/// Returns the averaged matrix and the design derived from its labels.
pub fn collapse_replicates(counts: &CountMatrix) -> Result<(CountMatrix, SampleDesign)> {
    collapse_replicates_with_chunk(counts, REPLICATE_CHUNK)
}

/// [`collapse_replicates`] with an explicit chunk size
pub fn collapse_replicates_with_chunk(
    counts: &CountMatrix,
    chunk: usize,
) -> Result<(CountMatrix, SampleDesign)> {
    if chunk == 0 {
        return Err(PipelineError::InvalidInput {
            reason: "replicate chunk size must be at least 1".to_string(),
        });
    }

    let expressed = expressed_columns(counts);
    let dropped = counts.n_samples() - expressed.len();
    if dropped > 0 {
        log::info!("Dropped {} sample columns with zero total count", dropped);
    }
    if expressed.is_empty() {
        return Err(PipelineError::EmptyData {
            reason: "every sample column has zero total count".to_string(),
        });
    }

    let raw = counts.counts();
    let labels = counts.sample_ids();

    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for &j in &expressed {
        groups.entry(labels[j].as_str()).or_default().push(j);
    }

    let mut new_columns: Vec<Array1<f64>> = Vec::new();
    let mut new_labels: Vec<String> = Vec::new();

    for (label, members) in &groups {
        let reduced = chunked_reduce(members, chunk, |idx| {
            let cols: Vec<ArrayView1<'_, f64>> = idx.iter().map(|&j| raw.column(j)).collect();
            rounded_mean(&cols)
        });
        log::debug!(
            "Sample '{}': {} replicate columns -> {} averaged columns",
            label,
            members.len(),
            reduced.len()
        );
        new_labels.extend(std::iter::repeat(label.to_string()).take(reduced.len()));
        new_columns.extend(reduced);
    }

    let n_genes = counts.n_genes();
    let mut averaged = Array2::zeros((n_genes, new_columns.len()));
    for (j, col) in new_columns.iter().enumerate() {
        averaged.column_mut(j).assign(col);
    }

    let design = SampleDesign::from_labels(&new_labels);
    let matrix = CountMatrix::new(averaged, counts.gene_ids().to_vec(), new_labels)?;
    Ok((matrix, design))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chunked_reduce() {
        let sums = chunked_reduce(&[1, 2, 3, 4, 5, 6, 7], 3, |c| c.iter().sum::<i32>());
        assert_eq!(sums, vec![6, 15, 7]);
    }

    #[test]
    fn test_four_replicates_become_one() {
        let counts = CountMatrix::new(
            array![[1.0, 2.0, 3.0, 5.0], [10.0, 10.0, 11.0, 11.0]],
            labels(&["g1", "g2"]),
            labels(&["a_1", "a_1", "a_1", "a_1"]),
        )
        .unwrap();

        let (avg, design) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.n_samples(), 1);
        assert_eq!(avg.sample_ids(), &["a_1"]);
        // 11/4 = 2.75 -> 3, 42/4 = 10.5 -> 10 (ties to even)
        assert_eq!(avg.counts()[[0, 0]], 3.0);
        assert_eq!(avg.counts()[[1, 0]], 10.0);
        assert_eq!(design.conditions(), &["a"]);
    }

    #[test]
    fn test_five_replicates_become_two() {
        let counts = CountMatrix::new(
            array![[4.0, 4.0, 8.0, 8.0, 7.0]],
            labels(&["g1"]),
            labels(&["x", "x", "x", "x", "x"]),
        )
        .unwrap();

        let (avg, _) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.n_samples(), 2);
        assert_eq!(avg.counts()[[0, 0]], 6.0);
        assert_eq!(avg.counts()[[0, 1]], 7.0);
        assert_eq!(avg.sample_ids(), &["x", "x"]);
    }

    #[test]
    fn test_partial_chunk_of_three_is_averaged() {
        let counts = CountMatrix::new(
            array![[1.0, 1.0, 1.0, 1.0, 2.0, 4.0, 6.0]],
            labels(&["g1"]),
            labels(&["x", "x", "x", "x", "x", "x", "x"]),
        )
        .unwrap();

        let (avg, _) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.counts().row(0).to_vec(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_zero_columns_dropped_and_group_order_kept() {
        let counts = CountMatrix::new(
            array![[0.0, 5.0, 3.0, 0.0], [0.0, 1.0, 3.0, 0.0]],
            labels(&["g1", "g2"]),
            labels(&["trt_0", "trt_0", "ctrl_0", "dead_0"]),
        )
        .unwrap();

        let (avg, design) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.sample_ids(), &["trt_0", "ctrl_0"]);
        assert_eq!(avg.counts().column(0).to_vec(), vec![5.0, 1.0]);
        assert_eq!(design.levels(), vec!["trt", "ctrl"]);
        assert!(!avg.sample_ids().iter().any(|s| s == "dead_0"));
    }

    #[test]
    fn test_interleaved_labels_grouped_by_label() {
        let counts = CountMatrix::new(
            array![[2.0, 10.0, 4.0, 20.0]],
            labels(&["g1"]),
            labels(&["a", "b", "a", "b"]),
        )
        .unwrap();

        let (avg, _) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.sample_ids(), &["a", "b"]);
        assert_eq!(avg.counts().row(0).to_vec(), vec![3.0, 15.0]);
    }

    #[test]
    fn test_all_zero_gene_row_retained() {
        let mut run_labels = vec!["ctrl_0"; 4];
        run_labels.extend(vec!["trt_0"; 4]);
        let counts = CountMatrix::new(
            array![
                [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            ],
            labels(&["g1", "g2"]),
            labels(&run_labels),
        )
        .unwrap();

        let (avg, design) = collapse_replicates(&counts).unwrap();
        assert_eq!(avg.sample_ids(), &["ctrl_0", "trt_0"]);
        assert_eq!(avg.gene_ids(), &["g1", "g2"]);
        assert_eq!(avg.counts().row(0).to_vec(), vec![10.0, 10.0]);
        assert_eq!(avg.counts().row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(design.conditions(), &["ctrl", "trt"]);
    }

    #[test]
    fn test_all_zero_matrix_is_error() {
        let counts = CountMatrix::new(
            array![[0.0, 0.0]],
            labels(&["g1"]),
            labels(&["a", "b"]),
        )
        .unwrap();
        assert!(matches!(
            collapse_replicates(&counts),
            Err(PipelineError::EmptyData { .. })
        ));
    }
}
