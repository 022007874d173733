//! Bagged regression trees
//!
//! Bootstrap aggregation: every tree sees a resampled copy of the training
//! rows and all features; predictions are averaged.

use super::cart::{RegressionTree, TreeConfig};
use super::ensemble::{self, OobScore};
use super::Regressor;
use crate::data::Dataset;
use crate::error::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Bagging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaggingConfig {
    /// Number of bootstrap replicates
    pub n_estimators: usize,
    /// Controls for every tree
    pub tree: TreeConfig,
    /// Random seed
    pub seed: u64,
    /// Compute the out-of-bag error after fitting
    pub oob_score: bool,
}

impl Default for BaggingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 25,
            tree: TreeConfig::default(),
            seed: 42,
            oob_score: false,
        }
    }
}

/// Bagged CART ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedTrees {
    config: BaggingConfig,
    trees: Vec<RegressionTree>,
    n_features: usize,
    oob: Option<OobScore>,
}

impl BaggedTrees {
    pub fn new(config: BaggingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            oob: None,
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Out-of-bag estimate, if requested in the config
    pub fn oob_score(&self) -> Option<OobScore> {
        self.oob
    }
}

impl Regressor for BaggedTrees {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        // Every tree considers every feature
        let tree_config = TreeConfig {
            max_features: None,
            ..self.config.tree.clone()
        };

        self.trees = ensemble::grow_trees(
            dataset,
            self.config.n_estimators,
            true,
            self.config.seed,
            &tree_config,
        )?;
        self.n_features = dataset.n_features();

        self.oob = if self.config.oob_score {
            ensemble::oob_score(&self.trees, dataset, self.config.seed)?
        } else {
            None
        };

        info!(
            trees = self.trees.len(),
            oob_mse = ?self.oob.map(|o| o.mse),
            "fitted bagged trees"
        );
        Ok(())
    }

    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::NotFitted);
        }
        Error::check_len(self.n_features, features.len())?;
        ensemble::average_prediction(&self.trees, features)
    }

    fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset
            .features
            .par_iter()
            .map(|row| self.predict_one(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::longley;
    use crate::metrics::mean_squared_error;

    fn config() -> BaggingConfig {
        BaggingConfig {
            tree: TreeConfig {
                min_samples_split: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_bagging_on_longley() {
        let data = longley();
        let mut model = BaggedTrees::new(config());
        model.fit(&data).unwrap();

        assert_eq!(model.n_estimators(), 25);

        let preds = model.predict(&data).unwrap();
        let mse = mean_squared_error(&data.targets, &preds).unwrap();
        assert!(mse >= 0.0 && mse < 3.0, "mse = {}", mse);

        let (lo, hi) = data.target_range().unwrap();
        assert!(preds.iter().all(|p| *p >= lo && *p <= hi));
    }

    #[test]
    fn test_bagging_is_deterministic() {
        let data = longley();
        let mut a = BaggedTrees::new(config());
        let mut b = BaggedTrees::new(config());
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();
        assert_eq!(a.predict(&data).unwrap(), b.predict(&data).unwrap());
    }

    #[test]
    fn test_oob_score() {
        let data = longley();
        let mut model = BaggedTrees::new(BaggingConfig {
            oob_score: true,
            ..config()
        });
        model.fit(&data).unwrap();

        let oob = model.oob_score().unwrap();
        assert!(oob.mse >= 0.0);
        assert!(oob.n_covered > 0 && oob.n_covered <= 16);
    }

    #[test]
    fn test_unfitted() {
        let model = BaggedTrees::new(config());
        assert!(matches!(model.predict_one(&[0.0; 6]), Err(Error::NotFitted)));
    }
}
