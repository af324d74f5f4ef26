//! Differential expression results table

/// Significance threshold used when summarizing a contrast
pub const DEFAULT_ALPHA: f64 = 0.05;

/// The two condition levels compared by one test, `numerator` vs `denominator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contrast {
    /// Design factor (always `condition` here)
    pub variable: String,
    /// Level in the numerator of the fold change (B)
    pub numerator: String,
    /// Reference level (A)
    pub denominator: String,
}

impl Contrast {
    pub fn new(variable: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            variable: variable.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }

    /// File stem `DGE_{B}_vs_{A}_{project}`
    pub fn file_name(&self, project_id: &str) -> String {
        format!(
            "DGE_{}_vs_{}_{}.csv",
            self.numerator, self.denominator, project_id
        )
    }
}

impl std::fmt::Display for Contrast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vs {}",
            self.variable, self.numerator, self.denominator
        )
    }
}

/// Per-gene results of one pairwise test
///
/// All vectors are aligned with `gene_ids`. Genes that could not be tested
/// carry NaN.
#[derive(Debug, Clone)]
pub struct DgeResults {
    pub gene_ids: Vec<String>,
    /// Mean of size-factor normalized counts over all samples
    pub base_means: Vec<f64>,
    pub log2_fold_changes: Vec<f64>,
    pub lfc_se: Vec<f64>,
    /// Wald statistic
    pub stat: Vec<f64>,
    pub pvalues: Vec<f64>,
    /// Benjamini-Hochberg adjusted p-values
    pub padj: Vec<f64>,
    pub contrast: Contrast,
}

impl DgeResults {
    /// Create results with every statistic set to NaN
    pub fn new(gene_ids: Vec<String>, contrast: Contrast) -> Self {
        let n = gene_ids.len();
        Self {
            gene_ids,
            base_means: vec![f64::NAN; n],
            log2_fold_changes: vec![f64::NAN; n],
            lfc_se: vec![f64::NAN; n],
            stat: vec![f64::NAN; n],
            pvalues: vec![f64::NAN; n],
            padj: vec![f64::NAN; n],
            contrast,
        }
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    /// Genes with adjusted p-value below `alpha`
    pub fn significant_genes(&self, alpha: f64) -> Vec<&str> {
        self.gene_ids
            .iter()
            .zip(self.padj.iter())
            .filter(|(_, &p)| p.is_finite() && p < alpha)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn summary(&self, alpha: f64) -> ResultsSummary {
        let significant = |up: bool| {
            self.padj
                .iter()
                .zip(self.log2_fold_changes.iter())
                .filter(|(&p, &lfc)| p.is_finite() && p < alpha && (lfc > 0.0) == up)
                .count()
        };
        ResultsSummary {
            total_genes: self.n_genes(),
            genes_tested: self.pvalues.iter().filter(|p| p.is_finite()).count(),
            significant: self.significant_genes(alpha).len(),
            upregulated: significant(true),
            downregulated: significant(false),
            alpha,
        }
    }
}

/// Counts of tested and significant genes for one contrast
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
}

impl std::fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} genes tested, {} significant at padj < {} ({} up, {} down)",
            self.genes_tested,
            self.total_genes,
            self.significant,
            self.alpha,
            self.upregulated,
            self.downregulated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_file_name() {
        let c = Contrast::new("condition", "heat", "ctrl");
        assert_eq!(c.file_name("PRJNA1"), "DGE_heat_vs_ctrl_PRJNA1.csv");
    }

    #[test]
    fn test_summary_counts() {
        let mut res = DgeResults::new(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            Contrast::new("condition", "B", "A"),
        );
        res.log2_fold_changes = vec![2.0, -1.5, 0.1, f64::NAN];
        res.pvalues = vec![0.001, 0.002, 0.8, f64::NAN];
        res.padj = vec![0.002, 0.003, 0.8, f64::NAN];

        let summary = res.summary(DEFAULT_ALPHA);
        assert_eq!(summary.genes_tested, 3);
        assert_eq!(summary.significant, 2);
        assert_eq!(summary.upregulated, 1);
        assert_eq!(summary.downregulated, 1);
        assert_eq!(res.significant_genes(DEFAULT_ALPHA), vec!["a", "b"]);
    }
}
