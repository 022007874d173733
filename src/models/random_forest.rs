//! Random Forest implementation

use super::cart::{RegressionTree, TreeConfig};
use super::ensemble::{self, OobScore};
use super::Regressor;
use crate::data::Dataset;
use crate::error::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Random Forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree (None = grow until node size stops it)
    pub max_depth: Option<usize>,
    /// Nodes with at most this many rows are not split
    pub node_size: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features tried at each split (max(p / 3, 1) if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
    /// Out-of-bag score calculation
    pub oob_score: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 500,
            max_depth: None,
            node_size: 5,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
            oob_score: true,
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
    oob_score_value: Option<OobScore>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Features tried per split for `n_features` columns
    pub fn resolved_max_features(&self, n_features: usize) -> usize {
        self.config
            .max_features
            .unwrap_or(n_features / 3)
            .clamp(1, n_features.max(1))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Get feature names with importances, sorted by importance
    pub fn feature_importance_ranking(&self) -> Vec<(&str, f64)> {
        let mut ranking: Vec<(&str, f64)> = self
            .feature_names
            .iter()
            .zip(self.feature_importances.iter())
            .map(|(n, &i)| (n.as_str(), i))
            .collect();

        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    /// Get OOB score
    pub fn oob_score(&self) -> Option<OobScore> {
        self.oob_score_value
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Text summary of the fitted forest
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Random Forest Summary".to_string(),
            "=====================".to_string(),
            format!("Number of trees: {}", self.n_trees()),
            format!(
                "Features per split: {}",
                self.resolved_max_features(self.feature_names.len())
            ),
        ];

        if let Some(oob) = self.oob_score_value {
            lines.push(format!("OOB MSE: {:.4}", oob.mse));
            lines.push(format!("% Var explained: {:.2}", oob.r2 * 100.0));
        }

        lines.push("Feature Importances:".to_string());
        for (name, importance) in self.feature_importance_ranking() {
            lines.push(format!("  {}: {:.4}", name, importance));
        }
        lines.join("\n")
    }
}

impl Regressor for RandomForest {
    /// Train the random forest
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.feature_names = dataset.feature_names.clone();
        let n_features = dataset.n_features();
        let max_features = self.resolved_max_features(n_features);

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth.unwrap_or(usize::MAX),
            min_samples_split: self.config.node_size + 1,
            min_samples_leaf: Some(self.config.min_samples_leaf),
            cp: 0.0,
            max_features: Some(max_features),
            seed: self.config.seed,
        };

        // Build trees in parallel
        self.trees = ensemble::grow_trees(
            dataset,
            self.config.n_trees,
            self.config.bootstrap,
            self.config.seed,
            &tree_config,
        )?;

        self.feature_importances = ensemble::aggregate_importances(&self.trees, n_features);

        // Calculate OOB score if enabled
        self.oob_score_value = if self.config.oob_score && self.config.bootstrap {
            ensemble::oob_score(&self.trees, dataset, self.config.seed)?
        } else {
            None
        };

        info!(
            trees = self.trees.len(),
            max_features,
            oob_mse = ?self.oob_score_value.map(|o| o.mse),
            "fitted random forest"
        );
        Ok(())
    }

    /// Predict for a single sample
    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::NotFitted);
        }
        Error::check_len(self.feature_names.len(), features.len())?;
        ensemble::average_prediction(&self.trees, features)
    }

    /// Predict for multiple samples
    fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset
            .features
            .par_iter()
            .map(|f| self.predict_one(f))
            .collect()
    }
}
