//! Multiple testing correction

/// Benjamini-Hochberg adjusted p-values
///
/// NaN p-values are left out of the family and stay NaN.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    if n == 0 {
        return vec![];
    }

    // Create indices for sorting
    let mut indices: Vec<usize> = (0..n).collect();

    // NaN sorts last
    indices.sort_by(|&a, &b| match (pvalues[a].is_nan(), pvalues[b].is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => pvalues[a].total_cmp(&pvalues[b]),
    });

    let m = pvalues.iter().filter(|p| p.is_finite()).count();

    if m == 0 {
        return vec![f64::NAN; n];
    }

    let mut padj = vec![f64::NAN; n];
    let mut cummin = f64::INFINITY;
    let mut rank = m;

    for &i in indices.iter().rev() {
        let p = pvalues[i];

        if p.is_finite() {
            let adj = (p * m as f64 / rank as f64).min(1.0);
            cummin = cummin.min(adj);
            padj[i] = cummin;
            rank -= 1;
        }
    }

    padj
}
