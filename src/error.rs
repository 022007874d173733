//! Error types for the stat_trees library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Probability outside [0, 1] or not finite
    #[error("Invalid probability: {0} (expected a value in [0, 1])")]
    InvalidProbability(f64),

    /// Significance level outside (0, 1)
    #[error("Invalid significance level: {0} (expected a value in (0, 1))")]
    InvalidSignificance(f64),

    /// Degrees of freedom must be a positive integer
    #[error("Invalid degrees of freedom: {0} (expected a positive integer)")]
    InvalidDegreesOfFreedom(u32),

    /// Test statistic is NaN
    #[error("Invalid test statistic: {0}")]
    InvalidStatistic(f64),

    /// The statistics backend refused the parameters
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Unknown name passed to a parser
    #[error("Unknown {kind}: {value}")]
    UnknownName { kind: &'static str, value: String },

    /// Rows, columns or prediction vectors disagree in length
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Fitting or scoring on zero rows
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Predict called before fit
    #[error("Model not fitted")]
    NotFitted,

    /// Invalid model configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Linear algebra failure while fitting a linear model
    #[error("Linear model failed: {0}")]
    LinearModel(String),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparseable numeric cell in an input file
    #[error("Failed to parse value {value:?} in row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    /// NaN or infinite value in a feature or target
    #[error("Non-finite value {value} in row {row}, column {column}")]
    NonFinite { row: usize, column: usize, value: f64 },
}

impl Error {
    /// Build an `UnknownName` error
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Error::UnknownName {
            kind,
            value: value.into(),
        }
    }

    /// Check that two lengths agree
    pub fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::ShapeMismatch { expected, actual })
        }
    }
}
