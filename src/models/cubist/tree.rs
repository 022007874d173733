//! Model tree growth and pruning.
//!
//! Splits maximise the reduction in target standard deviation. Every node
//! carries a simplified linear model; a subtree is replaced by its root's
//! model when that model's adjusted error is no worse than the subtree's.

use crate::data::Dataset;
use crate::error::Result;
use crate::models::linear::LinearModel;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) enum ModelNode {
    Leaf {
        model: LinearModel,
        n_samples: usize,
        error: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        model: LinearModel,
        n_samples: usize,
        error: f64,
        left: Box<ModelNode>,
        right: Box<ModelNode>,
    },
}

impl ModelNode {
    pub(crate) fn error(&self) -> f64 {
        match self {
            ModelNode::Leaf { error, .. } | ModelNode::Split { error, .. } => *error,
        }
    }

    pub(crate) fn model(&self) -> &LinearModel {
        match self {
            ModelNode::Leaf { model, .. } | ModelNode::Split { model, .. } => model,
        }
    }

    pub(crate) fn n_leaves(&self) -> usize {
        match self {
            ModelNode::Leaf { .. } => 1,
            ModelNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

pub(crate) struct TreeGrower {
    pub min_cases: usize,
    /// Stop splitting once a node's SD falls below this fraction of the root SD
    pub sd_fraction: f64,
}

impl TreeGrower {
    pub(crate) fn grow(&self, dataset: &Dataset, indices: &[usize]) -> Result<ModelNode> {
        let root_sd = std_dev(&targets_of(dataset, indices));
        let attributes: Vec<usize> = (0..dataset.n_features()).collect();
        let root = self.build(dataset, indices, &attributes, root_sd)?;
        debug!(leaves = root.n_leaves(), "grew model tree");
        Ok(root)
    }

    fn build(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        attributes: &[usize],
        root_sd: f64,
    ) -> Result<ModelNode> {
        let n = indices.len();
        let model = LinearModel::fit_simplified(dataset, indices, attributes)?;
        let error = model.adjusted_error(dataset, indices);
        let sd = std_dev(&targets_of(dataset, indices));

        let leaf = |model: LinearModel| ModelNode::Leaf {
            model,
            n_samples: n,
            error,
        };

        if n < 2 * self.min_cases || sd <= self.sd_fraction * root_sd {
            return Ok(leaf(model));
        }

        let (feature_idx, threshold) = match self.best_split(dataset, indices, sd) {
            Some(split) => split,
            None => return Ok(leaf(model)),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| dataset.features[i][feature_idx] <= threshold);

        let left = self.build(dataset, &left_idx, attributes, root_sd)?;
        let right = self.build(dataset, &right_idx, attributes, root_sd)?;

        let subtree_error = (left_idx.len() as f64 * left.error()
            + right_idx.len() as f64 * right.error())
            / n as f64;

        if error <= subtree_error + 1e-9 * (1.0 + subtree_error.abs()) {
            return Ok(leaf(model));
        }

        Ok(ModelNode::Split {
            feature_idx,
            threshold,
            model,
            n_samples: n,
            error: subtree_error,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Split with the largest standard deviation reduction, keeping at least
    /// `min_cases` rows on each side
    fn best_split(&self, dataset: &Dataset, indices: &[usize], sd: f64) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| dataset.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| dataset.targets[i].powi(2)).sum();

        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in 0..dataset.n_features() {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| {
                dataset.features[a][feature_idx].total_cmp(&dataset.features[b][feature_idx])
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let y = dataset.targets[order[k]];
                left_sum += y;
                left_sq += y * y;

                let x_here = dataset.features[order[k]][feature_idx];
                let x_next = dataset.features[order[k + 1]][feature_idx];
                let n_left = k + 1;
                let n_right = n - n_left;
                if x_here == x_next || n_left < self.min_cases || n_right < self.min_cases {
                    continue;
                }

                let sd_left = sd_from_sums(left_sum, left_sq, n_left);
                let sd_right = sd_from_sums(total_sum - left_sum, total_sq - left_sq, n_right);
                let reduction =
                    sd - (n_left as f64 * sd_left + n_right as f64 * sd_right) / n as f64;

                if reduction > 0.0 && best.map_or(true, |(_, _, r)| reduction > r) {
                    best = Some((feature_idx, (x_here + x_next) / 2.0, reduction));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }
}

fn targets_of(dataset: &Dataset, indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| dataset.targets[i]).collect()
}

fn sd_from_sums(sum: f64, sq: f64, n: usize) -> f64 {
    let n = n as f64;
    let mean = sum / n;
    (sq / n - mean * mean).max(0.0).sqrt()
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vee() -> Dataset {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        for i in 0..80 {
            let x = i as f64 * 0.5;
            let y = if x < 10.0 { x } else { 30.0 - 2.0 * x };
            data.add_sample(vec![x], y).unwrap();
        }
        data
    }

    #[test]
    fn test_linear_data_stays_a_single_leaf() {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        for i in 0..30 {
            data.add_sample(vec![i as f64], 1.0 + 0.5 * i as f64).unwrap();
        }
        let rows: Vec<usize> = (0..30).collect();
        let grower = TreeGrower {
            min_cases: 2,
            sd_fraction: 0.05,
        };
        let root = grower.grow(&data, &rows).unwrap();
        assert_eq!(root.n_leaves(), 1);
    }

    #[test]
    fn test_kinked_data_keeps_a_split() {
        let data = vee();
        let rows: Vec<usize> = (0..80).collect();
        let grower = TreeGrower {
            min_cases: 2,
            sd_fraction: 0.05,
        };
        let root = grower.grow(&data, &rows).unwrap();
        assert!(root.n_leaves() >= 2);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
