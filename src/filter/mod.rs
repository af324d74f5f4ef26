//! Count outlier handling

mod cooks;

pub use cooks::{
    cell_sizes, cooks_cutoff, cooks_distances, max_cooks, replace_outliers, replaceable_samples,
    robust_moments_dispersion, MIN_CELL_FOR_FILTER, MIN_ROBUST_DISP,
};
