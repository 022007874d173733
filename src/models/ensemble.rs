//! Shared machinery for bootstrap ensembles of regression trees

use super::cart::{RegressionTree, TreeConfig};
use crate::data::Dataset;
use crate::error::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Out-of-bag error estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OobScore {
    /// Mean squared error over rows that were out of bag for at least one tree
    pub mse: f64,
    /// 1 - mse / var(y), the "variance explained"
    pub r2: f64,
    /// Rows that received at least one out-of-bag prediction
    pub n_covered: usize,
}

/// Grow `n_trees` trees in parallel. Tree `i` uses seed `seed + i` both for its
/// bootstrap draw and for its per-node feature sampling.
pub(crate) fn grow_trees(
    dataset: &Dataset,
    n_trees: usize,
    bootstrap: bool,
    seed: u64,
    tree_config: &TreeConfig,
) -> Result<Vec<RegressionTree>> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    dataset.check_finite()?;
    if n_trees == 0 {
        return Err(Error::Config("ensemble needs at least one tree".to_string()));
    }

    let all: Vec<usize> = (0..dataset.n_samples()).collect();

    (0..n_trees)
        .into_par_iter()
        .map(|i| {
            let tree_seed = seed.wrapping_add(i as u64);
            let mut tree = RegressionTree::new(TreeConfig {
                seed: tree_seed,
                ..tree_config.clone()
            });

            // Bootstrap sample or use full dataset
            if bootstrap {
                tree.fit_indices(dataset, &dataset.bootstrap_indices(tree_seed))?;
            } else {
                tree.fit_indices(dataset, &all)?;
            }
            Ok(tree)
        })
        .collect()
}

/// Average the trees' predictions for one row
pub(crate) fn average_prediction(trees: &[RegressionTree], features: &[f64]) -> Result<f64> {
    use super::Regressor;

    if trees.is_empty() {
        return Err(Error::NotFitted);
    }
    let mut sum = 0.0;
    for tree in trees {
        sum += tree.predict_one(features)?;
    }
    Ok(sum / trees.len() as f64)
}

/// Score each row using only the trees whose bootstrap sample left it out
pub(crate) fn oob_score(
    trees: &[RegressionTree],
    dataset: &Dataset,
    seed: u64,
) -> Result<Option<OobScore>> {
    use super::Regressor;

    let n_samples = dataset.n_samples();
    let mut sums = vec![0.0; n_samples];
    let mut counts = vec![0usize; n_samples];

    for (tree_idx, tree) in trees.iter().enumerate() {
        let mut in_bag = vec![false; n_samples];
        for i in dataset.bootstrap_indices(seed.wrapping_add(tree_idx as u64)) {
            in_bag[i] = true;
        }

        for i in (0..n_samples).filter(|&i| !in_bag[i]) {
            sums[i] += tree.predict_one(&dataset.features[i])?;
            counts[i] += 1;
        }
    }

    let mut sq_error = 0.0;
    let mut covered = 0;
    for i in 0..n_samples {
        if counts[i] > 0 {
            let avg_pred = sums[i] / counts[i] as f64;
            sq_error += (avg_pred - dataset.targets[i]).powi(2);
            covered += 1;
        }
    }

    if covered == 0 {
        return Ok(None);
    }

    let mse = sq_error / covered as f64;
    let mean_target = dataset.targets.iter().sum::<f64>() / n_samples as f64;
    let variance = dataset
        .targets
        .iter()
        .map(|t| (t - mean_target).powi(2))
        .sum::<f64>()
        / n_samples as f64;
    let r2 = if variance > 0.0 { 1.0 - mse / variance } else { 0.0 };

    Ok(Some(OobScore {
        mse,
        r2,
        n_covered: covered,
    }))
}

/// Sum per-tree importances and normalise to 1
pub(crate) fn aggregate_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut importances = vec![0.0; n_features];
    for tree in trees {
        for (i, &imp) in tree.feature_importances().iter().enumerate() {
            importances[i] += imp;
        }
    }

    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        for imp in &mut importances {
            *imp /= sum;
        }
    }
    importances
}
