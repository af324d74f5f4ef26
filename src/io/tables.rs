//! CSV output for matrices and results tables

use std::path::Path;

use crate::data::ExpressionMatrix;
use crate::error::Result;

use super::DgeResults;

/// Header of every results table
pub const RESULTS_HEADER: [&str; 7] = [
    "gene_id",
    "baseMean",
    "log2FoldChange",
    "lfcSE",
    "stat",
    "pvalue",
    "padj",
];

/// Render one numeric cell; NaN becomes an empty cell
pub fn format_value(x: f64) -> String {
    if x.is_nan() {
        String::new()
    } else if x == f64::INFINITY {
        "inf".to_string()
    } else if x == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        x.to_string()
    }
}

/// Write a labeled matrix with a leading `gene_id` column
pub fn write_matrix_csv<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(matrix.n_samples() + 1);
    header.push("gene_id");
    header.extend(matrix.sample_ids().iter().map(|s| s.as_str()));
    writer.write_record(&header)?;

    let values = matrix.values();
    for (i, gene) in matrix.gene_ids().iter().enumerate() {
        let mut row = Vec::with_capacity(matrix.n_samples() + 1);
        row.push(gene.clone());
        row.extend(values.row(i).iter().map(|&x| format_value(x)));
        writer.write_record(&row)?;
    }
    writer.flush()?;

    log::debug!(
        "Wrote {} x {} matrix to {}",
        matrix.n_genes(),
        matrix.n_samples(),
        path.display()
    );
    Ok(())
}

/// Write one results table
pub fn write_results_csv<P: AsRef<Path>>(path: P, results: &DgeResults) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(RESULTS_HEADER)?;

    for (i, gene) in results.gene_ids.iter().enumerate() {
        let cell = |v: &[f64]| format_value(v.get(i).copied().unwrap_or(f64::NAN));
        writer.write_record([
            gene.clone(),
            cell(&results.base_means),
            cell(&results.log2_fold_changes),
            cell(&results.lfc_se),
            cell(&results.stat),
            cell(&results.pvalues),
            cell(&results.padj),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Contrast;
    use ndarray::array;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(f64::NAN), "");
        assert_eq!(format_value(f64::INFINITY), "inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(10.0), "10");
    }

    #[test]
    fn test_write_matrix_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let matrix = ExpressionMatrix::new(
            array![[1.5, f64::NAN], [0.0, 3.0]],
            vec!["g1".into(), "g2".into()],
            vec!["ctrl_0".into(), "trt_0".into()],
        )
        .unwrap();

        write_matrix_csv(&path, &matrix).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "gene_id,ctrl_0,trt_0\ng1,1.5,\ng2,0,3\n");
    }

    #[test]
    fn test_write_results_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        let mut res = DgeResults::new(vec!["g1".into()], Contrast::new("condition", "B", "A"));
        res.base_means = vec![12.0];
        res.pvalues = vec![0.01];

        write_results_csv(&path, &res).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "gene_id,baseMean,log2FoldChange,lfcSE,stat,pvalue,padj"
        );
        assert_eq!(lines.next().unwrap(), "g1,12,,,,0.01,");
    }
}
