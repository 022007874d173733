//! Least-squares linear models used at Cubist rule leaves

use crate::data::Dataset;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `intercept + Σ coefficient * x[attribute]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    /// (attribute index, coefficient)
    pub terms: Vec<(usize, f64)>,
}

impl LinearModel {
    /// Model that always predicts `value`
    pub fn constant(value: f64) -> Self {
        Self {
            intercept: value,
            terms: Vec::new(),
        }
    }

    /// Ordinary least squares on the selected rows and attributes.
    ///
    /// Columns are centred and solved through an SVD with a relative
    /// singular value cutoff, so collinear or constant attributes get a
    /// minimum-norm solution instead of failing.
    pub fn fit(dataset: &Dataset, indices: &[usize], attributes: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let n = indices.len();
        let y_mean = indices.iter().map(|&i| dataset.targets[i]).sum::<f64>() / n as f64;

        if attributes.is_empty() {
            return Ok(Self::constant(y_mean));
        }

        let x_means: Vec<f64> = attributes
            .iter()
            .map(|&a| indices.iter().map(|&i| dataset.features[i][a]).sum::<f64>() / n as f64)
            .collect();

        let x = DMatrix::from_fn(n, attributes.len(), |r, c| {
            dataset.features[indices[r]][attributes[c]] - x_means[c]
        });
        let y = DVector::from_fn(n, |r, _| dataset.targets[indices[r]] - y_mean);

        let svd = x.svd(true, true);
        let max_sv = svd.singular_values.max();
        if max_sv <= 0.0 {
            return Ok(Self::constant(y_mean));
        }

        let beta = svd
            .solve(&y, max_sv * 1e-10)
            .map_err(|e| Error::LinearModel(e.to_string()))?;

        let terms: Vec<(usize, f64)> = attributes
            .iter()
            .zip(beta.iter())
            .filter(|(_, b)| b.abs() > 0.0 && b.is_finite())
            .map(|(&a, &b)| (a, b))
            .collect();

        let intercept = y_mean
            - terms
                .iter()
                .map(|&(a, b)| {
                    let pos = attributes.iter().position(|&x| x == a).unwrap_or(0);
                    b * x_means[pos]
                })
                .sum::<f64>();

        Ok(Self { intercept, terms })
    }

    /// Fit on `candidates`, then drop terms one at a time while the adjusted
    /// error does not get worse.
    pub fn fit_simplified(
        dataset: &Dataset,
        indices: &[usize],
        candidates: &[usize],
    ) -> Result<Self> {
        let mut attributes = candidates.to_vec();
        let mut model = Self::fit(dataset, indices, &attributes)?;
        let mut best_error = model.adjusted_error(dataset, indices);

        while !attributes.is_empty() {
            let mut best_drop: Option<(usize, LinearModel, f64)> = None;

            for drop in 0..attributes.len() {
                let trial: Vec<usize> = attributes
                    .iter()
                    .enumerate()
                    .filter(|&(k, _)| k != drop)
                    .map(|(_, &a)| a)
                    .collect();
                let candidate = Self::fit(dataset, indices, &trial)?;
                let error = candidate.adjusted_error(dataset, indices);

                let beats_current = best_drop.as_ref().map_or(true, |(_, _, e)| error < *e);
                if no_worse(error, best_error) && beats_current {
                    best_drop = Some((drop, candidate, error));
                }
            }

            match best_drop {
                Some((drop, candidate, error)) => {
                    attributes.remove(drop);
                    model = candidate;
                    best_error = error;
                }
                None => break,
            }
        }

        Ok(model)
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .terms
                .iter()
                .map(|&(a, b)| b * features[a])
                .sum::<f64>()
    }

    /// Intercept plus terms
    pub fn n_parameters(&self) -> usize {
        self.terms.len() + 1
    }

    pub fn mean_absolute_error(&self, dataset: &Dataset, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices
            .iter()
            .map(|&i| (dataset.targets[i] - self.predict(&dataset.features[i])).abs())
            .sum::<f64>()
            / indices.len() as f64
    }

    /// MAE inflated by (n + v) / (n - v) for v parameters on n rows.
    /// Infinite when the model has at least as many parameters as rows.
    pub fn adjusted_error(&self, dataset: &Dataset, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let v = self.n_parameters() as f64;
        if n <= v {
            return f64::INFINITY;
        }
        (n + v) / (n - v) * self.mean_absolute_error(dataset, indices)
    }

    /// Weighted average of two models: (w * self + w_other * other) / (w + w_other)
    pub fn blend(&self, other: &LinearModel, weight: f64, other_weight: f64) -> LinearModel {
        let total = weight + other_weight;
        if total <= 0.0 {
            return self.clone();
        }

        let mut coefficients: BTreeMap<usize, f64> = BTreeMap::new();
        for &(a, b) in &self.terms {
            *coefficients.entry(a).or_insert(0.0) += weight * b / total;
        }
        for &(a, b) in &other.terms {
            *coefficients.entry(a).or_insert(0.0) += other_weight * b / total;
        }

        LinearModel {
            intercept: (weight * self.intercept + other_weight * other.intercept) / total,
            terms: coefficients.into_iter().filter(|&(_, b)| b != 0.0).collect(),
        }
    }

    /// `target = 1.23 + 0.5 GNP - 0.1 Year`
    pub fn render(&self, feature_names: &[String], target_name: &str) -> String {
        let mut out = format!("{} = {:.4}", target_name, self.intercept);
        for &(a, b) in &self.terms {
            let name = feature_names.get(a).map(|s| s.as_str()).unwrap_or("?");
            let sign = if b < 0.0 { '-' } else { '+' };
            out.push_str(&format!(" {} {:.6} {}", sign, b.abs(), name));
        }
        out
    }
}

/// Tolerant comparison so rounding noise on near-exact fits counts as a tie
fn no_worse(candidate: f64, current: f64) -> bool {
    candidate <= current + 1e-9 * (1.0 + current.abs())
}
