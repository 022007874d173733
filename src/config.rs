//! Model settings for the regression recipes

use crate::error::Result;
use crate::models::{BaggingConfig, CubistConfig, ForestConfig, TreeConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Settings for every recipe, loadable from JSON.
///
/// Missing sections and fields fall back to their defaults, so a file only
/// needs the values it changes:
///
/// ```json
/// { "forest": { "n_trees": 100 }, "cubist": { "committees": 5 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    pub cart: TreeConfig,
    pub bagging: BaggingConfig,
    pub forest: ForestConfig,
    pub cubist: CubistConfig,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        // Small data: split nodes down to 5 rows
        let tree = TreeConfig {
            min_samples_split: 5,
            ..TreeConfig::default()
        };

        Self {
            cart: tree.clone(),
            bagging: BaggingConfig {
                tree,
                ..BaggingConfig::default()
            },
            forest: ForestConfig::default(),
            cubist: CubistConfig::default(),
        }
    }
}

impl RecipeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Use one seed for every randomised model
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.cart.seed = seed;
        self.bagging.seed = seed;
        self.bagging.tree.seed = seed;
        self.forest.seed = seed;
        self
    }

    /// Check every section before any model is fitted
    pub fn validate(&self) -> Result<()> {
        self.cart.validate()?;
        self.bagging.tree.validate()?;
        self.cubist.validate()
    }
}
