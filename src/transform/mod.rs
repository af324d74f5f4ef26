//! Variance-stabilizing transformation for normalized count tables

mod vst;

pub use vst::{blind_dispersion_trend, vst, vst_single};
