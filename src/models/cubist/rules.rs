//! Rules extracted from a pruned model tree

use super::tree::ModelNode;
use crate::data::Dataset;
use crate::models::linear::LinearModel;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    LessEq,
    Greater,
}

/// `x[feature_idx] <= threshold` or `x[feature_idx] > threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature_idx: usize,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl Condition {
    pub fn matches(&self, features: &[f64]) -> bool {
        let x = features[self.feature_idx];
        match self.comparison {
            Comparison::LessEq => x <= self.threshold,
            Comparison::Greater => x > self.threshold,
        }
    }
}

/// Conjunction of conditions with the linear model used when they all hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub model: LinearModel,
    /// Training rows covered by the rule
    pub coverage: usize,
    /// Mean target of the covered rows
    pub mean: f64,
    /// Mean absolute error of `model` on the covered rows
    pub error: f64,
}

impl Rule {
    pub fn covers(&self, features: &[f64]) -> bool {
        self.conditions.iter().all(|c| c.matches(features))
    }

    pub fn render(&self, feature_names: &[String], target_name: &str) -> String {
        let name = |idx: usize| feature_names.get(idx).map(|s| s.as_str()).unwrap_or("?");

        let mut lines = Vec::new();
        if self.conditions.is_empty() {
            lines.push("  (always)".to_string());
        }
        for c in &self.conditions {
            lines.push(format!("  {} {} {:.4}", name(c.feature_idx), c.comparison, c.threshold));
        }
        lines.push(format!("  then {}", self.model.render(feature_names, target_name)));
        lines.join("\n")
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::LessEq => write!(f, "<="),
            Comparison::Greater => write!(f, ">"),
        }
    }
}

/// Keep only the tightest bound per feature and direction
pub(crate) fn simplify(conditions: &[Condition]) -> Vec<Condition> {
    let mut out: Vec<Condition> = Vec::new();
    for c in conditions {
        match out
            .iter_mut()
            .find(|o| o.feature_idx == c.feature_idx && o.comparison == c.comparison)
        {
            Some(existing) => {
                existing.threshold = match c.comparison {
                    Comparison::LessEq => existing.threshold.min(c.threshold),
                    Comparison::Greater => existing.threshold.max(c.threshold),
                };
            }
            None => out.push(*c),
        }
    }
    out
}

/// One rule per leaf. Each rule's model is the leaf model smoothed towards
/// its ancestors: going up, `(n * child + k * parent) / (n + k)` where `n`
/// counts the rows of the node below.
pub(crate) fn extract_rules(root: &ModelNode, smoothing: f64, dataset: &Dataset) -> Vec<Rule> {
    let mut rules = Vec::new();
    let mut conditions = Vec::new();
    let mut path = Vec::new();
    collect(root, smoothing, &mut conditions, &mut path, &mut rules);

    for rule in &mut rules {
        let covered: Vec<usize> = (0..dataset.n_samples())
            .filter(|&i| rule.covers(&dataset.features[i]))
            .collect();
        rule.coverage = covered.len();
        if !covered.is_empty() {
            rule.mean = covered.iter().map(|&i| dataset.targets[i]).sum::<f64>()
                / covered.len() as f64;
            rule.error = rule.model.mean_absolute_error(dataset, &covered);
        }
    }

    rules
}

fn collect<'a>(
    node: &'a ModelNode,
    smoothing: f64,
    conditions: &mut Vec<Condition>,
    path: &mut Vec<(&'a LinearModel, usize)>,
    rules: &mut Vec<Rule>,
) {
    match node {
        ModelNode::Leaf {
            model, n_samples, ..
        } => {
            let mut smoothed = model.clone();
            let mut n_below = *n_samples;
            if smoothing > 0.0 {
                for &(ancestor, n_ancestor) in path.iter().rev() {
                    smoothed = smoothed.blend(ancestor, n_below as f64, smoothing);
                    n_below = n_ancestor;
                }
            }

            rules.push(Rule {
                conditions: simplify(conditions),
                model: smoothed,
                coverage: 0,
                mean: 0.0,
                error: 0.0,
            });
        }
        ModelNode::Split {
            feature_idx,
            threshold,
            model,
            n_samples,
            left,
            right,
            ..
        } => {
            path.push((model, *n_samples));

            conditions.push(Condition {
                feature_idx: *feature_idx,
                comparison: Comparison::LessEq,
                threshold: *threshold,
            });
            collect(left, smoothing, conditions, path, rules);
            conditions.pop();

            conditions.push(Condition {
                feature_idx: *feature_idx,
                comparison: Comparison::Greater,
                threshold: *threshold,
            });
            collect(right, smoothing, conditions, path, rules);
            conditions.pop();

            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_keeps_tightest_bounds() {
        let conditions = vec![
            Condition {
                feature_idx: 0,
                comparison: Comparison::LessEq,
                threshold: 10.0,
            },
            Condition {
                feature_idx: 0,
                comparison: Comparison::Greater,
                threshold: 2.0,
            },
            Condition {
                feature_idx: 0,
                comparison: Comparison::LessEq,
                threshold: 6.0,
            },
            Condition {
                feature_idx: 0,
                comparison: Comparison::Greater,
                threshold: 4.0,
            },
        ];
        let simplified = simplify(&conditions);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0].threshold, 6.0);
        assert_eq!(simplified[1].threshold, 4.0);

        let rule = Rule {
            conditions: simplified,
            model: LinearModel::constant(1.0),
            coverage: 0,
            mean: 0.0,
            error: 0.0,
        };
        assert!(rule.covers(&[5.0]));
        assert!(!rule.covers(&[7.0]));
        assert!(!rule.covers(&[4.0]));

        let text = rule.render(&["x".to_string()], "y");
        assert!(text.contains("x <= 6.0000"));
        assert!(text.contains("x > 4.0000"));
        assert!(text.contains("then y = 1.0000"));
    }

    #[test]
    fn test_smoothing_blends_towards_parent() {
        let tree = ModelNode::Split {
            feature_idx: 0,
            threshold: 0.0,
            model: LinearModel::constant(0.0),
            n_samples: 20,
            error: 0.0,
            left: Box::new(ModelNode::Leaf {
                model: LinearModel::constant(-15.0),
                n_samples: 15,
                error: 0.0,
            }),
            right: Box::new(ModelNode::Leaf {
                model: LinearModel::constant(10.0),
                n_samples: 5,
                error: 0.0,
            }),
        };

        let mut data = Dataset::new(vec!["x".to_string()], "y");
        data.add_sample(vec![-1.0], -15.0).unwrap();
        data.add_sample(vec![1.0], 10.0).unwrap();

        let rules = extract_rules(&tree, 15.0, &data);
        assert_eq!(rules.len(), 2);
        // (15 * -15 + 15 * 0) / 30
        assert_eq!(rules[0].model.intercept, -7.5);
        // (5 * 10 + 15 * 0) / 20
        assert_eq!(rules[1].model.intercept, 2.5);
        assert_eq!(rules[0].coverage, 1);

        let unsmoothed = extract_rules(&tree, 0.0, &data);
        assert_eq!(unsmoothed[1].model.intercept, 10.0);
    }
}
