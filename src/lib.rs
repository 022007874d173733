//! # stat_trees - Critical values and tree-based regression
//!
//! Two small toolkits built on the same ambient stack:
//!
//! - critical values of the Gaussian, Student's t and Chi-squared
//!   distributions, with the decision rule that compares a test statistic
//!   against them
//! - regression recipes on the Longley economic data: CART, bagged trees,
//!   random forest and Cubist rule-based model trees, scored by mean
//!   squared error
//!
//! ## Modules
//!
//! - `stats` - Reference distributions, critical regions and p-values
//! - `data` - Dataset container and the Longley data
//! - `metrics` - Regression error metrics
//! - `models` - Tree and rule-based regressors
//! - `recipes` - Fit, predict and score a model in one call
//! - `config` - JSON-loadable model settings

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod recipes;
pub mod stats;

pub use config::RecipeConfig;
pub use data::{longley, Dataset};
pub use error::{Error, Result};
pub use recipes::{run_all, run_recipe, Recipe, RecipeReport};
pub use stats::{critical_value, ReferenceDistribution};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RecipeConfig;
    pub use crate::data::{longley, Dataset};
    pub use crate::error::{Error, Result};
    pub use crate::metrics::{mean_squared_error, RegressionMetrics};
    pub use crate::models::{
        BaggedTrees, BaggingConfig, Cubist, CubistConfig, ForestConfig, RandomForest,
        RegressionTree, Regressor, TreeConfig,
    };
    pub use crate::recipes::{evaluate, run_all, run_recipe, Recipe, RecipeReport};
    pub use crate::stats::{
        critical_region, critical_value, p_value, CriticalRegion, CriticalValue, Decision,
        DistributionKind, ReferenceDistribution, Tail,
    };
}
