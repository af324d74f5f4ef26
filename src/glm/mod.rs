//! Negative binomial GLM fitting for the one-factor design

mod fitting;
mod negative_binomial;

pub use fitting::{fit_level, fit_single_gene, GlmFitParams, GlmFitResult, LevelFit};
pub use negative_binomial::{nb_log_likelihood, nb_mean, nb_variance, nb_weight, MIN_LOG_MEAN, MIN_MU};
