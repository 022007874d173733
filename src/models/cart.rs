//! CART regression tree
//!
//! Recursive binary partitioning that minimises the sum of squared errors.
//! Controls follow the usual rpart knobs: a node must hold `min_samples_split`
//! rows before a split is attempted, each child must keep `min_samples_leaf`
//! rows, and a split must remove at least `cp` times the root SSE.

use super::Regressor;
use crate::data::Dataset;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

/// Decision tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Maximum depth of tree (root is depth 0)
    pub max_depth: usize,
    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node (None = round(min_samples_split / 3))
    pub min_samples_leaf: Option<usize>,
    /// Complexity parameter: minimum SSE reduction as a fraction of root SSE
    pub cp: f64,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 30,
            min_samples_split: 20,
            min_samples_leaf: None,
            cp: 0.01,
            max_features: None,
            seed: 42,
        }
    }
}

impl TreeConfig {
    /// Leaf size actually enforced
    pub fn effective_min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
            .unwrap_or_else(|| (self.min_samples_split as f64 / 3.0).round() as usize)
            .max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cp < 0.0 || !self.cp.is_finite() {
            return Err(Error::Config(format!("cp must be >= 0, got {}", self.cp)));
        }
        if self.max_features == Some(0) {
            return Err(Error::Config("max_features must be positive".to_string()));
        }
        Ok(())
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
        /// Mean squared deviation of the targets in this node
        impurity: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        value: f64,
        n_samples: usize,
        impurity: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn value(&self) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } | TreeNode::Split { value, .. } => *value,
        }
    }

    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    sse_reduction: f64,
}

/// CART regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RegressionTree {
    /// Create a new regression tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Train on the rows of `dataset` selected by `indices`
    pub(crate) fn fit_indices(&mut self, dataset: &Dataset, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Err(Error::EmptyDataset);
        }
        self.config.validate()?;

        self.feature_names = dataset.feature_names.clone();
        self.feature_importances = vec![0.0; dataset.n_features()];

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let root_sse = sse(&targets_of(dataset, indices));
        let min_gain = self.config.cp * root_sse;

        let root = self.build_tree(dataset, indices, 0, min_gain, &mut rng);

        debug!(
            leaves = root.n_leaves(),
            depth = root.depth(),
            samples = indices.len(),
            "fitted regression tree"
        );
        self.root = Some(root);

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
        Ok(())
    }

    /// Build tree recursively
    fn build_tree(
        &mut self,
        dataset: &Dataset,
        indices: &[usize],
        depth: usize,
        min_gain: f64,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let targets = targets_of(dataset, indices);
        let value = mean(&targets);
        let node_sse = sse(&targets);
        let impurity = node_sse / n as f64;

        let leaf = TreeNode::Leaf {
            value,
            n_samples: n,
            impurity,
        };

        // Check stopping conditions
        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || impurity < 1e-10
        {
            return leaf;
        }

        let split = match self.find_best_split(dataset, indices, node_sse, rng) {
            Some(split) if split.sse_reduction >= min_gain && split.sse_reduction > 0.0 => split,
            _ => return leaf,
        };

        self.feature_importances[split.feature_idx] += split.sse_reduction;

        let left = self.build_tree(dataset, &split.left, depth + 1, min_gain, rng);
        let right = self.build_tree(dataset, &split.right, depth + 1, min_gain, rng);

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            value,
            n_samples: n,
            impurity,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Find the split with the largest SSE reduction.
    ///
    /// Rows are sorted on each candidate feature and swept once with running
    /// sums; thresholds sit at midpoints between distinct values.
    fn find_best_split(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        node_sse: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = dataset.n_features();
        let max_features = self.config.max_features.unwrap_or(n_features).min(n_features);
        let min_leaf = self.config.effective_min_samples_leaf();
        let n = indices.len();

        // Select features to consider
        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        if max_features < n_features {
            feature_indices.shuffle(rng);
            feature_indices.truncate(max_features);
        }

        let total_sum: f64 = indices.iter().map(|&i| dataset.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| dataset.targets[i].powi(2)).sum();

        let mut best: Option<(usize, f64, f64)> = None;

        for &feature_idx in &feature_indices {
            let mut order: Vec<usize> = indices.to_vec();
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
                if x_here == x_next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / n_left as f64;
                let right_sse = right_sq - right_sum * right_sum / n_right as f64;
                let reduction = node_sse - (left_sse + right_sse).max(0.0);

                if best.map_or(true, |(_, _, r)| reduction > r) {
                    best = Some((feature_idx, (x_here + x_next) / 2.0, reduction));
                }
            }
        }

        best.map(|(feature_idx, threshold, sse_reduction)| {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| dataset.features[i][feature_idx] <= threshold);
            BestSplit {
                feature_idx,
                threshold,
                left,
                right,
                sse_reduction,
            }
        })
    }

    fn traverse(node: &TreeNode, features: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if features[*feature_idx] <= *threshold {
                    Self::traverse(left, features)
                } else {
                    Self::traverse(right, features)
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Get feature names with importances
    pub fn feature_importance_map(&self) -> Vec<(&str, f64)> {
        self.feature_names
            .iter()
            .zip(self.feature_importances.iter())
            .map(|(n, &i)| (n.as_str(), i))
            .collect()
    }

    /// Render tree structure as indented text
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(ref root) = self.root {
            self.render_node(root, 0, &mut out);
        }
        out
    }

    fn render_node(&self, node: &TreeNode, indent: usize, out: &mut String) {
        let prefix = "  ".repeat(indent);

        match node {
            TreeNode::Leaf {
                value, n_samples, ..
            } => {
                let _ = writeln!(out, "{}Leaf: value={:.4}, samples={}", prefix, value, n_samples);
            }
            TreeNode::Split {
                feature_idx,
                threshold,
                n_samples,
                impurity,
                left,
                right,
                ..
            } => {
                let feature_name = self
                    .feature_names
                    .get(*feature_idx)
                    .map(|s| s.as_str())
                    .unwrap_or("?");

                let _ = writeln!(
                    out,
                    "{}Split: {} <= {:.4} (samples={}, impurity={:.4})",
                    prefix, feature_name, threshold, n_samples, impurity
                );
                let _ = writeln!(out, "{}Left:", prefix);
                self.render_node(left, indent + 1, out);
                let _ = writeln!(out, "{}Right:", prefix);
                self.render_node(right, indent + 1, out);
            }
        }
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        dataset.check_finite()?;
        let indices: Vec<usize> = (0..dataset.n_samples()).collect();
        self.fit_indices(dataset, &indices)
    }

    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        let root = self.root.as_ref().ok_or(Error::NotFitted)?;
        Error::check_len(self.feature_names.len(), features.len())?;
        Ok(Self::traverse(root, features))
    }
}

fn targets_of(dataset: &Dataset, indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| dataset.targets[i]).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sse(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::longley;
    use crate::metrics::mean_squared_error;

    fn step_data() -> Dataset {
        let mut dataset = Dataset::new(vec!["x".to_string()], "y");
        for i in 0..40 {
            let x = i as f64;
            let y = if x < 20.0 { 1.0 } else { 5.0 };
            dataset.add_sample(vec![x], y).unwrap();
        }
        dataset
    }

    #[test]
    fn test_step_function_is_learned_exactly() {
        let data = step_data();
        let mut tree = RegressionTree::new(TreeConfig::default());
        tree.fit(&data).unwrap();

        let root = tree.root().unwrap();
        match root {
            TreeNode::Split {
                feature_idx,
                threshold,
                ..
            } => {
                assert_eq!(*feature_idx, 0);
                assert_eq!(*threshold, 19.5);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(root.n_leaves(), 2);
        assert_eq!(tree.predict_one(&[3.0]).unwrap(), 1.0);
        assert_eq!(tree.predict_one(&[30.0]).unwrap(), 5.0);
        assert_eq!(tree.feature_importances(), &[1.0]);
    }

    #[test]
    fn test_min_samples_split_blocks_splitting() {
        let data = step_data();
        let mut tree = RegressionTree::new(TreeConfig {
            min_samples_split: 100,
            ..Default::default()
        });
        tree.fit(&data).unwrap();
        assert!(tree.root().unwrap().is_leaf());
        assert_eq!(tree.predict_one(&[0.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_min_leaf_is_respected() {
        let data = longley();
        let mut tree = RegressionTree::new(TreeConfig {
            min_samples_split: 5,
            cp: 0.0,
            ..Default::default()
        });
        tree.fit(&data).unwrap();

        fn check(node: &TreeNode, min_leaf: usize) {
            match node {
                TreeNode::Leaf { n_samples, .. } => assert!(*n_samples >= min_leaf),
                TreeNode::Split { left, right, .. } => {
                    check(left, min_leaf);
                    check(right, min_leaf);
                }
            }
        }
        check(tree.root().unwrap(), 2);
    }

    #[test]
    fn test_longley_cart_fit() {
        let data = longley();
        let mut tree = RegressionTree::new(TreeConfig {
            min_samples_split: 5,
            ..Default::default()
        });
        tree.fit(&data).unwrap();

        let preds = tree.predict(&data).unwrap();
        let mse = mean_squared_error(&data.targets, &preds).unwrap();
        let (lo, hi) = data.target_range().unwrap();

        assert!(mse >= 0.0);
        assert!(mse < 1.5, "mse = {}", mse);
        assert!(preds.iter().all(|p| *p >= lo && *p <= hi));
        assert!(tree.render().contains("Split:"));
    }

    #[test]
    fn test_predict_errors() {
        let tree = RegressionTree::new(TreeConfig::default());
        assert!(matches!(tree.predict_one(&[1.0]), Err(Error::NotFitted)));

        let mut tree = RegressionTree::new(TreeConfig::default());
        tree.fit(&step_data()).unwrap();
        assert!(matches!(
            tree.predict_one(&[1.0, 2.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let data = Dataset::new(vec!["x".to_string()], "y");
        let mut tree = RegressionTree::new(TreeConfig::default());
        assert!(matches!(tree.fit(&data), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_effective_min_leaf() {
        let config = TreeConfig {
            min_samples_split: 5,
            ..Default::default()
        };
        assert_eq!(config.effective_min_samples_leaf(), 2);
        assert_eq!(TreeConfig::default().effective_min_samples_leaf(), 7);
    }
}
