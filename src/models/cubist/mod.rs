//! Cubist rule-based regression
//!
//! A pruned model tree is flattened into rules whose linear models are
//! smoothed towards their ancestors. Optional committees boost on the
//! previous member's residuals, and optional nearest-neighbour correction
//! adjusts each prediction by how the closest training rows were missed.

mod rules;
mod tree;

pub use rules::{Comparison, Condition, Rule};

use self::tree::TreeGrower;
use super::linear::LinearModel;
use super::Regressor;
use crate::data::Dataset;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Largest number of neighbours used for instance-based correction
pub const MAX_NEIGHBORS: usize = 9;

/// Cubist configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubistConfig {
    /// Number of boosted committee members
    pub committees: usize,
    /// Nearest training rows used to adjust predictions (0 disables)
    pub neighbors: usize,
    /// Minimum rows on each side of a split
    pub min_cases: usize,
    /// Smoothing constant k; 0 keeps leaf models unsmoothed
    pub smoothing: f64,
    /// Fraction of the target range predictions may extend beyond it
    pub extrapolation: f64,
    /// Stop splitting when a node's SD is below this fraction of the root SD
    pub sd_fraction: f64,
}

impl Default for CubistConfig {
    fn default() -> Self {
        Self {
            committees: 1,
            neighbors: 0,
            min_cases: 2,
            smoothing: 15.0,
            extrapolation: 0.05,
            sd_fraction: 0.05,
        }
    }
}

impl CubistConfig {
    pub fn validate(&self) -> Result<()> {
        if self.committees == 0 {
            return Err(Error::Config("committees must be at least 1".into()));
        }
        if self.neighbors > MAX_NEIGHBORS {
            return Err(Error::Config(format!(
                "neighbors must be between 0 and {}, got {}",
                MAX_NEIGHBORS, self.neighbors
            )));
        }
        if self.min_cases == 0 {
            return Err(Error::Config("min_cases must be at least 1".into()));
        }
        if !(self.smoothing >= 0.0 && self.smoothing.is_finite()) {
            return Err(Error::Config(format!(
                "smoothing must be a non-negative number, got {}",
                self.smoothing
            )));
        }
        if !(self.extrapolation >= 0.0 && self.extrapolation.is_finite()) {
            return Err(Error::Config(format!(
                "extrapolation must be a non-negative number, got {}",
                self.extrapolation
            )));
        }
        if !(0.0..1.0).contains(&self.sd_fraction) {
            return Err(Error::Config(format!(
                "sd_fraction must be in [0, 1), got {}",
                self.sd_fraction
            )));
        }
        Ok(())
    }
}

/// One committee member: a rule set plus the root model for rows no rule covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Committee {
    rules: Vec<Rule>,
    fallback: LinearModel,
}

impl Committee {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Unsmoothed root model
    pub fn fallback(&self) -> &LinearModel {
        &self.fallback
    }

    /// Average of the models of every rule covering the row
    fn predict(&self, features: &[f64]) -> f64 {
        let (sum, count) = self
            .rules
            .iter()
            .filter(|r| r.covers(features))
            .fold((0.0, 0usize), |(s, c), r| (s + r.model.predict(features), c + 1));

        if count == 0 {
            self.fallback.predict(features)
        } else {
            sum / count as f64
        }
    }
}

/// Training rows kept for neighbour correction, features scaled by range
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NeighborIndex {
    mins: Vec<f64>,
    ranges: Vec<f64>,
    scaled: Vec<Vec<f64>>,
    targets: Vec<f64>,
    base_predictions: Vec<f64>,
}

impl NeighborIndex {
    fn new(dataset: &Dataset, base_predictions: Vec<f64>) -> Self {
        let (mins, ranges): (Vec<f64>, Vec<f64>) = (0..dataset.n_features())
            .map(|j| {
                let column = dataset.column(j);
                let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let range = if max > min { max - min } else { 1.0 };
                (min, range)
            })
            .unzip();

        let mut index = Self {
            mins,
            ranges,
            scaled: Vec::with_capacity(dataset.n_samples()),
            targets: dataset.targets.clone(),
            base_predictions,
        };
        index.scaled = dataset.features.iter().map(|row| index.scale(row)).collect();
        index
    }

    fn scale(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mins.iter().zip(self.ranges.iter()))
            .map(|(x, (min, range))| (x - min) / range)
            .collect()
    }

    /// Weighted mean over the k nearest rows of `target + base - base_neighbor`
    fn adjust(&self, features: &[f64], base: f64, k: usize) -> f64 {
        let query = self.scale(features);
        let mut distances: Vec<(f64, usize)> = self
            .scaled
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let d = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (d, i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (weighted, total) = distances
            .iter()
            .take(k)
            .fold((0.0, 0.0), |(num, den), &(d, i)| {
                let w = 1.0 / (d + 0.5);
                let adjusted = self.targets[i] + base - self.base_predictions[i];
                (num + w * adjusted, den + w)
            });

        if total > 0.0 {
            weighted / total
        } else {
            base
        }
    }
}

/// Cubist model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cubist {
    config: CubistConfig,
    committees: Vec<Committee>,
    feature_names: Vec<String>,
    target_name: String,
    bounds: Option<(f64, f64)>,
    neighbors: Option<NeighborIndex>,
}

impl Cubist {
    pub fn new(config: CubistConfig) -> Self {
        Self {
            config,
            committees: Vec::new(),
            feature_names: Vec::new(),
            target_name: String::new(),
            bounds: None,
            neighbors: None,
        }
    }

    pub fn config(&self) -> &CubistConfig {
        &self.config
    }

    pub fn committees(&self) -> &[Committee] {
        &self.committees
    }

    /// Rules of every committee member, in order
    pub fn rules(&self) -> Vec<&Rule> {
        self.committees.iter().flat_map(|c| c.rules.iter()).collect()
    }

    /// Prediction range: training target range widened by the extrapolation fraction
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }

    /// Committee average before neighbour correction and clamping
    fn committee_prediction(&self, features: &[f64]) -> f64 {
        self.committees.iter().map(|c| c.predict(features)).sum::<f64>()
            / self.committees.len() as f64
    }

    fn clamp(&self, value: f64) -> f64 {
        match self.bounds {
            Some((lo, hi)) => value.clamp(lo, hi),
            None => value,
        }
    }

    /// Grow on `working` targets; rule statistics come from `original`
    fn fit_committee(&self, working: &Dataset, original: &Dataset) -> Result<Committee> {
        let rows: Vec<usize> = (0..working.n_samples()).collect();
        let grower = TreeGrower {
            min_cases: self.config.min_cases,
            sd_fraction: self.config.sd_fraction,
        };
        let root = grower.grow(working, &rows)?;
        let rules = rules::extract_rules(&root, self.config.smoothing, original);
        debug!(rules = rules.len(), "extracted committee rules");

        Ok(Committee {
            rules,
            fallback: root.model().clone(),
        })
    }
}

impl Regressor for Cubist {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.config.validate()?;
        dataset.check_finite()?;
        let (min, max) = dataset.target_range().ok_or(Error::EmptyDataset)?;

        self.feature_names = dataset.feature_names.clone();
        self.target_name = dataset.target_name.clone();
        let margin = self.config.extrapolation * (max - min);
        self.bounds = Some((min - margin, max + margin));
        self.committees.clear();
        self.neighbors = None;

        let mut working = dataset.clone();
        for member in 0..self.config.committees {
            let committee = self.fit_committee(&working, dataset)?;

            if member + 1 < self.config.committees {
                working = dataset.with_targets(committee_targets(dataset, &committee))?;
            }
            self.committees.push(committee);
        }

        if self.config.neighbors > 0 {
            let base = dataset
                .features
                .iter()
                .map(|row| self.committee_prediction(row))
                .collect();
            self.neighbors = Some(NeighborIndex::new(dataset, base));
        }

        info!(
            committees = self.committees.len(),
            rules = self.rules().len(),
            neighbors = self.config.neighbors,
            "fitted cubist model"
        );
        Ok(())
    }

    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if self.committees.is_empty() {
            return Err(Error::NotFitted);
        }
        Error::check_len(self.feature_names.len(), features.len())?;

        let base = self.committee_prediction(features);
        let value = match &self.neighbors {
            Some(index) => index.adjust(features, base, self.config.neighbors),
            None => base,
        };
        Ok(self.clamp(value))
    }
}

/// Targets for the next committee member: y - (prediction - y)
fn committee_targets(dataset: &Dataset, previous: &Committee) -> Vec<f64> {
    dataset
        .features
        .iter()
        .zip(dataset.targets.iter())
        .map(|(row, &y)| 2.0 * y - previous.predict(row))
        .collect()
}

impl fmt::Display for Cubist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cubist model: {} committee(s), {} rule(s)",
            self.committees.len(),
            self.rules().len()
        )?;
        for (m, committee) in self.committees.iter().enumerate() {
            if self.committees.len() > 1 {
                writeln!(f, "\nModel {}:", m + 1)?;
            }
            for (r, rule) in committee.rules.iter().enumerate() {
                writeln!(
                    f,
                    "\nRule {}: [{} cases, mean {:.4}, error {:.4}]",
                    r + 1,
                    rule.coverage,
                    rule.mean,
                    rule.error
                )?;
                writeln!(f, "{}", rule.render(&self.feature_names, &self.target_name))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::longley;
    use crate::metrics::mean_squared_error;

    fn vee() -> Dataset {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        for i in 0..80 {
            let x = i as f64 * 0.5;
            let y = if x < 10.0 { x } else { 30.0 - 2.0 * x };
            data.add_sample(vec![x], y).unwrap();
        }
        data
    }

    fn training_mse(model: &Cubist, data: &Dataset) -> f64 {
        let preds = model.predict(data).unwrap();
        mean_squared_error(&data.targets, &preds).unwrap()
    }

    #[test]
    fn test_cubist_on_longley() {
        let data = longley();
        let mut model = Cubist::new(CubistConfig::default());
        model.fit(&data).unwrap();

        assert!(!model.rules().is_empty());
        let mse = training_mse(&model, &data);
        assert!(mse < 0.5, "mse = {}", mse);
        assert!(model.to_string().contains("Rule 1"));
    }

    #[test]
    fn test_unsmoothed_rules_follow_the_kink() {
        let data = vee();
        let mut model = Cubist::new(CubistConfig {
            smoothing: 0.0,
            ..Default::default()
        });
        model.fit(&data).unwrap();

        assert!(model.rules().len() >= 2);
        let mse = training_mse(&model, &data);
        assert!(mse < 0.5, "mse = {}", mse);
    }

    #[test]
    fn test_rules_beat_a_single_linear_model() {
        let data = vee();
        let rows: Vec<usize> = (0..data.n_samples()).collect();
        let global = LinearModel::fit(&data, &rows, &[0]).unwrap();
        let global_preds: Vec<f64> = data.features.iter().map(|r| global.predict(r)).collect();
        let global_mse = mean_squared_error(&data.targets, &global_preds).unwrap();

        let mut model = Cubist::new(CubistConfig::default());
        model.fit(&data).unwrap();

        assert!(training_mse(&model, &data) < global_mse);
    }

    #[test]
    fn test_committees() {
        let data = longley();
        let mut model = Cubist::new(CubistConfig {
            committees: 3,
            ..Default::default()
        });
        model.fit(&data).unwrap();

        assert_eq!(model.committees().len(), 3);
        assert!(model.to_string().contains("Model 3:"));
        let mse = training_mse(&model, &data);
        assert!(mse < 1.0, "mse = {}", mse);
    }

    #[test]
    fn test_neighbor_correction() {
        let data = longley();
        let mut model = Cubist::new(CubistConfig {
            neighbors: 3,
            ..Default::default()
        });
        model.fit(&data).unwrap();

        let preds = model.predict(&data).unwrap();
        assert!(preds.iter().all(|p| p.is_finite()));
        let mse = mean_squared_error(&data.targets, &preds).unwrap();
        assert!(mse < 1.0, "mse = {}", mse);
    }

    #[test]
    fn test_predictions_are_clamped() {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        for i in 0..20 {
            data.add_sample(vec![i as f64], i as f64).unwrap();
        }
        let mut model = Cubist::new(CubistConfig::default());
        model.fit(&data).unwrap();

        let (lo, hi) = model.bounds().unwrap();
        assert!((hi - 19.95).abs() < 1e-9);
        assert!((lo + 0.95).abs() < 1e-9);
        assert!((model.predict_one(&[100.0]).unwrap() - hi).abs() < 1e-9);
        assert!((model.predict_one(&[-100.0]).unwrap() - lo).abs() < 1e-9);
        assert!((model.predict_one(&[7.0]).unwrap() - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_and_usage() {
        let data = longley();

        let mut model = Cubist::new(CubistConfig {
            neighbors: 10,
            ..Default::default()
        });
        assert!(matches!(model.fit(&data), Err(Error::Config(_))));

        let mut model = Cubist::new(CubistConfig {
            committees: 0,
            ..Default::default()
        });
        assert!(matches!(model.fit(&data), Err(Error::Config(_))));

        let model = Cubist::new(CubistConfig::default());
        assert!(matches!(model.predict_one(&[0.0; 6]), Err(Error::NotFitted)));

        let mut model = Cubist::new(CubistConfig::default());
        model.fit(&data).unwrap();
        assert!(matches!(
            model.predict_one(&[1.0, 2.0]),
            Err(Error::ShapeMismatch { .. })
        ));

        let empty = Dataset::new(vec!["x".to_string()], "y");
        let mut model = Cubist::new(CubistConfig::default());
        assert!(matches!(model.fit(&empty), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_non_finite_training_data() {
        let mut data = longley();
        data.targets[3] = f64::NAN;
        let mut model = Cubist::new(CubistConfig::default());
        assert!(matches!(
            model.fit(&data),
            Err(Error::NonFinite { row: 3, column: 6, .. })
        ));

        let mut data = longley();
        data.features[0][2] = f64::INFINITY;
        assert!(matches!(model.fit(&data), Err(Error::NonFinite { row: 0, column: 2, .. })));
    }

    #[test]
    fn test_committee_targets() {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        data.add_sample(vec![0.0], 1.0).unwrap();
        data.add_sample(vec![1.0], 2.0).unwrap();
        data.add_sample(vec![2.0], 3.0).unwrap();

        let previous = Committee {
            rules: Vec::new(),
            fallback: LinearModel::constant(2.0),
        };
        // 2y - 2
        assert_eq!(committee_targets(&data, &previous), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_second_member_fits_adjusted_targets() {
        let data = longley();
        let mut model = Cubist::new(CubistConfig {
            committees: 2,
            ..Default::default()
        });
        model.fit(&data).unwrap();

        let first = &model.committees()[0];
        let targets: Vec<f64> = data
            .features
            .iter()
            .zip(data.targets.iter())
            .map(|(row, &y)| 2.0 * y - first.predict(row))
            .collect();
        let working = data.with_targets(targets).unwrap();

        let rows: Vec<usize> = (0..data.n_samples()).collect();
        let all: Vec<usize> = (0..data.n_features()).collect();
        let expected = LinearModel::fit_simplified(&working, &rows, &all).unwrap();
        assert_eq!(model.committees()[1].fallback(), &expected);
    }

    #[test]
    fn test_rule_statistics_use_observed_targets() {
        let data = longley();
        let mut model = Cubist::new(CubistConfig {
            committees: 3,
            ..Default::default()
        });
        model.fit(&data).unwrap();

        for rule in model.rules() {
            let covered: Vec<f64> = data
                .features
                .iter()
                .zip(data.targets.iter())
                .filter(|(row, _)| rule.covers(row))
                .map(|(_, &y)| y)
                .collect();
            assert_eq!(rule.coverage, covered.len());
            let mean = covered.iter().sum::<f64>() / covered.len() as f64;
            assert!((rule.mean - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn test_neighbor_weights() {
        let mut data = Dataset::new(vec!["x".to_string()], "y");
        data.add_sample(vec![0.0], 1.0).unwrap();
        data.add_sample(vec![10.0], 5.0).unwrap();
        let index = NeighborIndex::new(&data, vec![2.0, 4.0]);

        // Query x = 2 scales to 0.2: distances 0.2 and 0.8.
        // Adjusted neighbours: 1 + 3 - 2 = 2 and 5 + 3 - 4 = 4.
        let (w1, w2) = (1.0 / 0.7, 1.0 / 1.3);
        let expected = (w1 * 2.0 + w2 * 4.0) / (w1 + w2);
        assert!((index.adjust(&[2.0], 3.0, 2) - expected).abs() < 1e-12);

        assert!((index.adjust(&[2.0], 3.0, 1) - 2.0).abs() < 1e-12);
        assert!((index.adjust(&[9.0], 3.0, 1) - 4.0).abs() < 1e-12);
    }
}
