//! Data structures module
//!
//! Provides the regression dataset type and the built-in Longley data.

mod dataset;
mod longley;

pub use dataset::Dataset;
pub use longley::{longley, LONGLEY_FEATURES, LONGLEY_TARGET};
