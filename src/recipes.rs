//! Fit-predict-score recipes
//!
//! Each recipe fits one model on a dataset, predicts the same rows back and
//! reports the in-sample error.

use crate::config::RecipeConfig;
use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::metrics::RegressionMetrics;
use crate::models::{BaggedTrees, Cubist, RandomForest, RegressionTree, Regressor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    Cart,
    Bagging,
    RandomForest,
    Cubist,
}

impl Recipe {
    pub const ALL: [Recipe; 4] = [
        Recipe::Cart,
        Recipe::Bagging,
        Recipe::RandomForest,
        Recipe::Cubist,
    ];

    /// Unfitted model for this recipe
    pub fn build(&self, config: &RecipeConfig) -> Box<dyn Regressor> {
        match self {
            Recipe::Cart => Box::new(RegressionTree::new(config.cart.clone())),
            Recipe::Bagging => Box::new(BaggedTrees::new(config.bagging.clone())),
            Recipe::RandomForest => Box::new(RandomForest::new(config.forest.clone())),
            Recipe::Cubist => Box::new(Cubist::new(config.cubist.clone())),
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Recipe::Cart => "cart",
            Recipe::Bagging => "bagging",
            Recipe::RandomForest => "random-forest",
            Recipe::Cubist => "cubist",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Recipe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "cart" | "rpart" | "tree" => Ok(Recipe::Cart),
            "bagging" | "bagged-trees" | "treebag" => Ok(Recipe::Bagging),
            "random-forest" | "randomforest" | "rf" | "forest" => Ok(Recipe::RandomForest),
            "cubist" => Ok(Recipe::Cubist),
            _ => Err(Error::unknown("recipe", s)),
        }
    }
}

/// Outcome of one recipe run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeReport {
    pub recipe: Recipe,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub predictions: Vec<f64>,
}

impl fmt::Display for RecipeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} MSE = {:.6}  RMSE = {:.6}  R² = {:.4}",
            self.recipe.to_string(),
            self.mse,
            self.rmse,
            self.r2
        )
    }
}

/// Fit, predict the training rows and score them
pub fn run_recipe(
    recipe: Recipe,
    dataset: &Dataset,
    config: &RecipeConfig,
) -> Result<RecipeReport> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let mut model = recipe.build(config);
    model.fit(dataset)?;
    evaluate(recipe, model.as_ref(), dataset)
}

/// Score an already fitted model on `dataset`
pub fn evaluate(recipe: Recipe, model: &dyn Regressor, dataset: &Dataset) -> Result<RecipeReport> {
    let predictions = model.predict(dataset)?;
    let metrics = RegressionMetrics::calculate(&dataset.targets, &predictions)?;

    info!(%recipe, mse = metrics.mse, r2 = metrics.r2, "recipe finished");

    Ok(RecipeReport {
        recipe,
        mse: metrics.mse,
        rmse: metrics.rmse,
        r2: metrics.r2,
        predictions,
    })
}

/// Run every recipe in `Recipe::ALL` order
pub fn run_all(dataset: &Dataset, config: &RecipeConfig) -> Result<Vec<RecipeReport>> {
    Recipe::ALL
        .iter()
        .map(|&recipe| run_recipe(recipe, dataset, config))
        .collect()
}
