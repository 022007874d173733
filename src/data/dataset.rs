//! Dataset structure for regression

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Tabular dataset with numeric features and a numeric target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Feature matrix (n_samples x n_features)
    pub features: Vec<Vec<f64>>,
    /// Target values
    pub targets: Vec<f64>,
    /// Feature names
    pub feature_names: Vec<String>,
    /// Target column name
    pub target_name: String,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(feature_names: Vec<String>, target_name: impl Into<String>) -> Self {
        Self {
            features: Vec::new(),
            targets: Vec::new(),
            feature_names,
            target_name: target_name.into(),
        }
    }

    /// Create dataset from rows, checking that every row has one value per feature
    pub fn from_rows(
        features: Vec<Vec<f64>>,
        targets: Vec<f64>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Result<Self> {
        Error::check_len(features.len(), targets.len())?;
        for (i, (row, &target)) in features.iter().zip(targets.iter()).enumerate() {
            Error::check_len(feature_names.len(), row.len())?;
            check_row(i, row, target)?;
        }
        Ok(Self {
            features,
            targets,
            feature_names,
            target_name: target_name.into(),
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Add a sample
    pub fn add_sample(&mut self, features: Vec<f64>, target: f64) -> Result<()> {
        Error::check_len(self.n_features(), features.len())?;
        check_row(self.n_samples(), &features, target)?;
        self.features.push(features);
        self.targets.push(target);
        Ok(())
    }

    /// Fail on the first NaN or infinite feature or target
    pub fn check_finite(&self) -> Result<()> {
        for (i, (row, &target)) in self.features.iter().zip(self.targets.iter()).enumerate() {
            check_row(i, row, target)?;
        }
        Ok(())
    }

    /// Values of feature `j` for every sample
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.features.iter().map(|row| row[j]).collect()
    }

    /// Minimum and maximum target value
    pub fn target_range(&self) -> Option<(f64, f64)> {
        if self.targets.is_empty() {
            return None;
        }
        let min = self.targets.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    /// Get feature matrix as ndarray
    pub fn features_array(&self) -> Array2<f64> {
        let n_samples = self.n_samples();
        let n_features = self.n_features();

        if n_samples == 0 {
            return Array2::zeros((0, n_features));
        }

        Array2::from_shape_fn((n_samples, n_features), |(i, j)| self.features[i][j])
    }

    /// Get targets as ndarray
    pub fn targets_array(&self) -> Array1<f64> {
        Array1::from_vec(self.targets.clone())
    }

    /// Create a subset of the dataset by indices (repeats allowed)
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
        }
    }

    /// Row indices drawn with replacement, reproducible from `seed`
    pub fn bootstrap_indices(&self, seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = self.n_samples();
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    }

    /// Bootstrap sample (random sample with replacement)
    pub fn bootstrap_sample(&self, seed: u64) -> Dataset {
        self.subset(&self.bootstrap_indices(seed))
    }

    /// Replace the targets, keeping the features
    pub fn with_targets(&self, targets: Vec<f64>) -> Result<Dataset> {
        Error::check_len(self.n_samples(), targets.len())?;
        if let Some((row, &value)) = targets.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(Error::NonFinite {
                row,
                column: self.n_features(),
                value,
            });
        }
        Ok(Dataset {
            features: self.features.clone(),
            targets,
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
        })
    }

    /// Save dataset to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load dataset from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let dataset: Dataset = serde_json::from_reader(reader)?;
        Dataset::from_rows(
            dataset.features,
            dataset.targets,
            dataset.feature_names,
            dataset.target_name,
        )
    }

    /// Save to CSV file, target in the last column
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = self.feature_names.clone();
        header.push(self.target_name.clone());
        writer.write_record(&header)?;

        for (row, target) in self.features.iter().zip(self.targets.iter()) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(target.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load from CSV file; the last column is the target
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if headers.len() < 2 {
            return Err(Error::ShapeMismatch {
                expected: 2,
                actual: headers.len(),
            });
        }

        let n_features = headers.len() - 1;
        let feature_names = headers[..n_features].to_vec();
        let mut dataset = Dataset::new(feature_names, headers[n_features].clone());

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            Error::check_len(headers.len(), record.len())?;

            let values = record
                .iter()
                .enumerate()
                .map(|(column, s)| {
                    s.trim().parse::<f64>().map_err(|_| Error::Parse {
                        row: row_idx + 1,
                        column,
                        value: s.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            check_row(row_idx + 1, &values[..n_features], values[n_features])?;
            dataset.add_sample(values[..n_features].to_vec(), values[n_features])?;
        }

        Ok(dataset)
    }
}

/// Target is reported as the column after the last feature
fn check_row(row: usize, features: &[f64], target: f64) -> Result<()> {
    let bad = features
        .iter()
        .chain(std::iter::once(&target))
        .enumerate()
        .find(|(_, v)| !v.is_finite());

    match bad {
        Some((column, &value)) => Err(Error::NonFinite { row, column, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        let mut dataset = Dataset::new(vec!["f1".to_string(), "f2".to_string()], "y");
        dataset.add_sample(vec![1.0, 2.0], 0.5).unwrap();
        dataset.add_sample(vec![3.0, 4.0], -0.2).unwrap();
        dataset.add_sample(vec![5.0, 6.0], 0.3).unwrap();
        dataset
    }

    #[test]
    fn test_dataset_operations() {
        let dataset = small();
        assert_eq!(dataset.n_samples(), 3);
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(dataset.target_range(), Some((-0.2, 0.5)));

        let subset = dataset.subset(&[2, 2, 0]);
        assert_eq!(subset.targets, vec![0.3, 0.3, 0.5]);
    }

    #[test]
    fn test_ndarray_views() {
        let dataset = small();
        let x = dataset.features_array();
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x[[1, 0]], 3.0);
        assert!((dataset.targets_array().sum() - 0.6).abs() < 1e-12);

        let empty = Dataset::new(vec!["a".into()], "y");
        assert_eq!(empty.features_array().shape(), &[0, 1]);
    }

    #[test]
    fn test_add_sample_checks_width() {
        let mut dataset = small();
        assert!(dataset.add_sample(vec![1.0], 0.0).is_err());
        assert!(Dataset::from_rows(vec![vec![1.0]], vec![], vec!["a".into()], "y").is_err());
    }

    #[test]
    fn test_bootstrap_is_reproducible() {
        let dataset = small();
        let a = dataset.bootstrap_indices(7);
        let b = dataset.bootstrap_indices(7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(|&i| i < 3));

        let sample = dataset.bootstrap_sample(7);
        assert_eq!(sample.n_samples(), 3);
        assert_eq!(sample, dataset.subset(&a));
    }

    #[test]
    fn test_csv_round_trip() {
        let dataset = small();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.csv");

        dataset.save_csv(&path).unwrap();
        let loaded = Dataset::load_csv(&path).unwrap();

        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_csv_rejects_bad_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b,y\n1,2,3\n4,oops,6\n").unwrap();

        let err = Dataset::load_csv(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { row: 2, column: 1, .. }));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("nan.csv");
        std::fs::write(&path, "a,b,y\n1,2,3\n4,NaN,6\n").unwrap();
        let err = Dataset::load_csv(&path).unwrap_err();
        assert!(matches!(err, Error::NonFinite { row: 2, column: 1, .. }));

        let path = dir.path().join("inf.csv");
        std::fs::write(&path, "a,b,y\n1,2,inf\n").unwrap();
        let err = Dataset::load_csv(&path).unwrap_err();
        assert!(matches!(err, Error::NonFinite { row: 1, column: 2, .. }));

        let mut dataset = small();
        assert!(matches!(
            dataset.add_sample(vec![f64::NEG_INFINITY, 1.0], 0.0),
            Err(Error::NonFinite { column: 0, .. })
        ));
        assert!(dataset.add_sample(vec![1.0, 1.0], f64::NAN).is_err());
        assert_eq!(dataset.n_samples(), 3);

        let rows = vec![vec![f64::NAN]];
        assert!(Dataset::from_rows(rows, vec![1.0], vec!["a".into()], "y").is_err());
        assert!(dataset.with_targets(vec![0.0, f64::NAN, 0.0]).is_err());

        // Public fields can bypass the constructors
        dataset.targets[1] = f64::NAN;
        assert!(matches!(
            dataset.check_finite(),
            Err(Error::NonFinite { row: 1, column: 2, .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let dataset = small();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json");

        dataset.save(&path).unwrap();
        assert_eq!(Dataset::load(&path).unwrap(), dataset);
    }
}
