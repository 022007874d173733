//! Regression models module
//!
//! CART, bagged trees, random forest and Cubist rule-based model trees.

pub mod bagging;
pub mod cart;
pub mod cubist;
mod ensemble;
mod linear;
pub mod random_forest;

pub use bagging::{BaggedTrees, BaggingConfig};
pub use cart::{RegressionTree, TreeConfig, TreeNode};
pub use cubist::{Cubist, CubistConfig, Rule};
pub use ensemble::OobScore;
pub use linear::LinearModel;
pub use random_forest::{ForestConfig, RandomForest};

use crate::data::Dataset;
use crate::error::Result;

/// A model that maps a feature row to a numeric prediction
pub trait Regressor {
    /// Train on every row of `dataset`
    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// Predict a single row
    fn predict_one(&self, features: &[f64]) -> Result<f64>;

    /// Predict every row of `dataset`
    fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset
            .features
            .iter()
            .map(|row| self.predict_one(row))
            .collect()
    }
}
