//! Annotation and gene-length CSV output

use std::path::Path;

use super::gff::{read_gff, AnnotationTable};
use crate::error::Result;

/// Attribute used as the gene id of the length table by default
pub const DEFAULT_ID_ATTRIBUTE: &str = "protein_id";

/// Write the flat annotation table; absent attributes become empty cells
pub fn write_annotation_csv<P: AsRef<Path>>(path: P, table: &AnnotationTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(
            table
                .columns()
                .iter()
                .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a `gene_id,length` table
pub fn write_gene_lengths_csv<P: AsRef<Path>>(path: P, lengths: &[(String, u64)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["gene_id", "length"])?;
    for (id, length) in lengths {
        writer.write_record([id.as_str(), length.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Counts reported by [`extract_annotation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationSummary {
    pub features: usize,
    pub annotated: usize,
    pub lengths: usize,
}

/// Parse a GFF file and write its annotated features and their lengths
pub fn extract_annotation(
    gff: &Path,
    annotation_out: &Path,
    lengths_out: &Path,
    id_attribute: &str,
) -> Result<AnnotationSummary> {
    let table = read_gff(gff)?;
    let annotated = table.with_product()?;
    write_annotation_csv(annotation_out, &annotated)?;

    let lengths = annotated.gene_lengths(id_attribute)?;
    write_gene_lengths_csv(lengths_out, &lengths)?;
    log::info!(
        "Wrote {} annotated features to {} and {} gene lengths to {}",
        annotated.n_rows(),
        annotation_out.display(),
        lengths.len(),
        lengths_out.display()
    );

    Ok(AnnotationSummary {
        features: table.n_rows(),
        annotated: annotated.n_rows(),
        lengths: lengths.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_gene_lengths;
    use std::io::Write;

    #[test]
    fn test_extract_annotation_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let gff = dir.path().join("genome.gff");
        let mut file = std::fs::File::create(&gff).unwrap();
        writeln!(file, "#!genome-build ASM584v2").unwrap();
        writeln!(file, "NC_1\tRefSeq\tgene\t337\t2799\t.\t+\t.\tID=gene-thrA;gene=thrA").unwrap();
        writeln!(
            file,
            "NC_1\tRefSeq\tCDS\t337\t2799\t.\t+\t0\tID=cds-NP_2;gene=thrA;product=\"aspartokinase, homoserine dehydrogenase\";protein_id=NP_2"
        )
        .unwrap();
        writeln!(
            file,
            "NC_1\tRefSeq\tCDS\t2801\t3733\t.\t+\t0\tID=cds-NP_3;product=homoserine kinase;protein_id=NP_3"
        )
        .unwrap();
        writeln!(
            file,
            "NC_1\tRefSeq\tpseudogene\t4000\t4100\t.\t+\t.\tID=ps-1;product=pseudo"
        )
        .unwrap();
        drop(file);

        let annotation = dir.path().join("annotation.csv");
        let lengths = dir.path().join("lengths.csv");
        let summary = extract_annotation(&gff, &annotation, &lengths, DEFAULT_ID_ATTRIBUTE).unwrap();
        assert_eq!(
            summary,
            AnnotationSummary {
                features: 4,
                annotated: 3,
                lengths: 2
            }
        );

        let text = std::fs::read_to_string(&annotation).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "seqid,source,type,start,end,score,strand,phase,ID,gene,product,protein_id"
        );
        assert!(lines.next().unwrap().starts_with("NC_1,RefSeq,CDS,337,2799"));
        assert!(text.lines().last().unwrap().ends_with("ps-1,,pseudo,"));

        let table = read_gene_lengths(&lengths).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["NP_2"], 2462.0);
        assert_eq!(table["NP_3"], 932.0);
    }
}
