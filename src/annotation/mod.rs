//! Genome annotation extraction: GFF features to annotation and gene-length tables

mod export;
mod gff;

pub use export::{
    extract_annotation, write_annotation_csv, write_gene_lengths_csv, AnnotationSummary,
    DEFAULT_ID_ATTRIBUTE,
};
pub use gff::{
    parse_attributes, parse_gff_line, read_gff, AnnotationTable, FeatureRow, BASE_FIELDS,
    PRODUCT_ATTRIBUTE,
};
