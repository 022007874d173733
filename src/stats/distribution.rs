//! Reference distributions for hypothesis testing.
//!
//! Gaussian, Student's t and Chi-squared, backed by `statrs`. The percent
//! point function (PPF) is the inverse of the CDF: it maps a probability to
//! the value at or below which that much of the distribution's mass lies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};
use std::fmt;
use std::str::FromStr;

/// Distribution of a test statistic under the null hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceDistribution {
    /// Standard normal N(0, 1)
    Gaussian,
    /// Standardised Student's t
    StudentT { df: u32 },
    /// Chi-squared
    ChiSquared { df: u32 },
}

/// Family name without parameters, used when parsing CLI input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Gaussian,
    StudentT,
    ChiSquared,
}

impl DistributionKind {
    /// Attach degrees of freedom. Ignored for the Gaussian.
    pub fn with_df(self, df: u32) -> Result<ReferenceDistribution> {
        match self {
            DistributionKind::Gaussian => Ok(ReferenceDistribution::Gaussian),
            DistributionKind::StudentT => ReferenceDistribution::student_t(df),
            DistributionKind::ChiSquared => ReferenceDistribution::chi_squared(df),
        }
    }
}

impl FromStr for DistributionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gaussian" | "normal" | "z" => Ok(DistributionKind::Gaussian),
            "t" | "student" | "student-t" | "students-t" => Ok(DistributionKind::StudentT),
            "chi2" | "chi-squared" | "chisquared" | "chi-square" => {
                Ok(DistributionKind::ChiSquared)
            }
            _ => Err(Error::unknown("distribution", s)),
        }
    }
}

enum Backend {
    Normal(Normal),
    StudentsT(StudentsT),
    ChiSquared(ChiSquared),
}

impl Backend {
    fn cdf(&self, x: f64) -> f64 {
        match self {
            Backend::Normal(d) => d.cdf(x),
            Backend::StudentsT(d) => d.cdf(x),
            Backend::ChiSquared(d) => d.cdf(x),
        }
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        match self {
            Backend::Normal(d) => d.inverse_cdf(p),
            Backend::StudentsT(d) => d.inverse_cdf(p),
            Backend::ChiSquared(d) => d.inverse_cdf(p),
        }
    }
}

impl ReferenceDistribution {
    /// Student's t with `df` degrees of freedom
    pub fn student_t(df: u32) -> Result<Self> {
        if df == 0 {
            return Err(Error::InvalidDegreesOfFreedom(df));
        }
        Ok(ReferenceDistribution::StudentT { df })
    }

    /// Chi-squared with `df` degrees of freedom
    pub fn chi_squared(df: u32) -> Result<Self> {
        if df == 0 {
            return Err(Error::InvalidDegreesOfFreedom(df));
        }
        Ok(ReferenceDistribution::ChiSquared { df })
    }

    /// Degrees of freedom, if the family has them
    pub fn df(&self) -> Option<u32> {
        match self {
            ReferenceDistribution::Gaussian => None,
            ReferenceDistribution::StudentT { df } | ReferenceDistribution::ChiSquared { df } => {
                Some(*df)
            }
        }
    }

    /// Family name
    pub fn name(&self) -> &'static str {
        match self {
            ReferenceDistribution::Gaussian => "Gaussian",
            ReferenceDistribution::StudentT { .. } => "Student's t",
            ReferenceDistribution::ChiSquared { .. } => "Chi-squared",
        }
    }

    /// Lower and upper bounds of the support
    pub fn support(&self) -> (f64, f64) {
        match self {
            ReferenceDistribution::ChiSquared { .. } => (0.0, f64::INFINITY),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    fn backend(&self) -> Result<Backend> {
        // The variants can be built directly, so df == 0 is checked here too
        if let Some(0) = self.df() {
            return Err(Error::InvalidDegreesOfFreedom(0));
        }
        let backend = match *self {
            ReferenceDistribution::Gaussian => Backend::Normal(
                Normal::new(0.0, 1.0).map_err(|e| Error::Distribution(e.to_string()))?,
            ),
            ReferenceDistribution::StudentT { df } => Backend::StudentsT(
                StudentsT::new(0.0, 1.0, f64::from(df))
                    .map_err(|e| Error::Distribution(e.to_string()))?,
            ),
            ReferenceDistribution::ChiSquared { df } => Backend::ChiSquared(
                ChiSquared::new(f64::from(df)).map_err(|e| Error::Distribution(e.to_string()))?,
            ),
        };
        Ok(backend)
    }

    /// Percent point function (inverse CDF)
    pub fn ppf(&self, p: f64) -> Result<f64> {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidProbability(p));
        }
        let backend = self.backend()?;
        let (low, high) = self.support();
        if p == 0.0 {
            return Ok(low);
        }
        if p == 1.0 {
            return Ok(high);
        }
        Ok(backend.inverse_cdf(p))
    }

    /// Cumulative distribution function P(X <= x)
    pub fn cdf(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Err(Error::InvalidStatistic(x));
        }
        let backend = self.backend()?;
        let (low, high) = self.support();
        if x <= low {
            return Ok(0.0);
        }
        if x >= high {
            return Ok(1.0);
        }
        Ok(backend.cdf(x))
    }

    /// Survival function P(X > x)
    pub fn sf(&self, x: f64) -> Result<f64> {
        Ok(1.0 - self.cdf(x)?)
    }
}

impl fmt::Display for ReferenceDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.df() {
            Some(df) => write!(f, "{} (df = {})", self.name(), df),
            None => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_ppf() {
        let z = ReferenceDistribution::Gaussian.ppf(0.95).unwrap();
        assert_abs_diff_eq!(z, 1.6449, epsilon = 1e-3);
    }

    #[test]
    fn test_student_t_ppf() {
        let t = ReferenceDistribution::student_t(10).unwrap();
        assert_abs_diff_eq!(t.ppf(0.95).unwrap(), 1.8125, epsilon = 1e-3);
    }

    #[test]
    fn test_chi_squared_ppf() {
        let chi2 = ReferenceDistribution::chi_squared(10).unwrap();
        assert_abs_diff_eq!(chi2.ppf(0.95).unwrap(), 18.307, epsilon = 1e-2);
    }

    #[test]
    fn test_ppf_cdf_round_trip() {
        let dists = [
            ReferenceDistribution::Gaussian,
            ReferenceDistribution::student_t(5).unwrap(),
            ReferenceDistribution::chi_squared(3).unwrap(),
        ];
        for dist in dists {
            for p in [0.025, 0.1, 0.5, 0.9, 0.975] {
                let x = dist.ppf(p).unwrap();
                assert_abs_diff_eq!(dist.cdf(x).unwrap(), p, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let gaussian = ReferenceDistribution::Gaussian;
        assert!(matches!(gaussian.ppf(1.5), Err(Error::InvalidProbability(_))));
        assert!(matches!(gaussian.ppf(-0.1), Err(Error::InvalidProbability(_))));
        assert!(matches!(gaussian.ppf(f64::NAN), Err(Error::InvalidProbability(_))));
        assert!(matches!(gaussian.cdf(f64::NAN), Err(Error::InvalidStatistic(_))));
        assert!(matches!(
            ReferenceDistribution::student_t(0),
            Err(Error::InvalidDegreesOfFreedom(0))
        ));
        assert!(ReferenceDistribution::ChiSquared { df: 0 }.cdf(1.0).is_err());
    }

    #[test]
    fn test_support_bounds() {
        let chi2 = ReferenceDistribution::chi_squared(4).unwrap();
        assert_eq!(chi2.ppf(0.0).unwrap(), 0.0);
        assert_eq!(chi2.ppf(1.0).unwrap(), f64::INFINITY);
        assert_eq!(chi2.cdf(-3.0).unwrap(), 0.0);
        assert_eq!(
            ReferenceDistribution::Gaussian.ppf(0.0).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_parse_and_display() {
        let kind: DistributionKind = "chi2".parse().unwrap();
        let dist = kind.with_df(10).unwrap();
        assert_eq!(dist.to_string(), "Chi-squared (df = 10)");
        assert_eq!(
            "normal".parse::<DistributionKind>().unwrap(),
            DistributionKind::Gaussian
        );
        assert!("poisson".parse::<DistributionKind>().is_err());
    }
}
