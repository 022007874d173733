//! Critical values and the threshold decision rule.
//!
//! H0 is rejected when the test statistic falls at or beyond a critical value
//! taken from the PPF of the statistic's reference distribution.

use super::distribution::ReferenceDistribution;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side(s) of the distribution form the rejection region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tail {
    Lower,
    Upper,
    TwoSided,
}

impl FromStr for Tail {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lower" | "left" => Ok(Tail::Lower),
            "upper" | "right" => Ok(Tail::Upper),
            "two" | "two-sided" | "both" => Ok(Tail::TwoSided),
            _ => Err(Error::unknown("tail", s)),
        }
    }
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tail::Lower => "lower",
            Tail::Upper => "upper",
            Tail::TwoSided => "two-sided",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of comparing a statistic against the critical region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    RejectNull,
    FailToReject,
}

impl Decision {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Decision::RejectNull)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::RejectNull => write!(f, "reject H0 (significant)"),
            Decision::FailToReject => write!(f, "fail to reject H0 (not significant)"),
        }
    }
}

/// Rejection region bounds for a significance level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalRegion {
    pub distribution: ReferenceDistribution,
    pub significance: f64,
    pub tail: Tail,
    /// Reject when statistic <= lower
    pub lower: Option<f64>,
    /// Reject when statistic >= upper
    pub upper: Option<f64>,
}

impl CriticalRegion {
    /// Apply the decision rule to a test statistic
    pub fn decide(&self, statistic: f64) -> Result<Decision> {
        if statistic.is_nan() {
            return Err(Error::InvalidStatistic(statistic));
        }
        let below = self.lower.map_or(false, |lower| statistic <= lower);
        let above = self.upper.map_or(false, |upper| statistic >= upper);

        Ok(if below || above {
            Decision::RejectNull
        } else {
            Decision::FailToReject
        })
    }
}

impl fmt::Display for CriticalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} test at alpha = {}:",
            self.distribution, self.tail, self.significance
        )?;
        if let Some(lower) = self.lower {
            write!(f, " lower = {:.4}", lower)?;
        }
        if let Some(upper) = self.upper {
            write!(f, " upper = {:.4}", upper)?;
        }
        Ok(())
    }
}

/// Critical value bounds for a significance level `alpha`
pub fn critical_region(
    distribution: ReferenceDistribution,
    significance: f64,
    tail: Tail,
) -> Result<CriticalRegion> {
    if !significance.is_finite() || significance <= 0.0 || significance >= 1.0 {
        return Err(Error::InvalidSignificance(significance));
    }

    let (lower, upper) = match tail {
        Tail::Lower => (Some(distribution.ppf(significance)?), None),
        Tail::Upper => (None, Some(distribution.ppf(1.0 - significance)?)),
        Tail::TwoSided => {
            let half = significance / 2.0;
            (
                Some(distribution.ppf(half)?),
                Some(distribution.ppf(1.0 - half)?),
            )
        }
    };

    Ok(CriticalRegion {
        distribution,
        significance,
        tail,
        lower,
        upper,
    })
}

/// Probability of a statistic at least as extreme as `statistic` under H0
pub fn p_value(distribution: ReferenceDistribution, statistic: f64, tail: Tail) -> Result<f64> {
    let p = match tail {
        Tail::Lower => distribution.cdf(statistic)?,
        Tail::Upper => distribution.sf(statistic)?,
        Tail::TwoSided => {
            let cdf = distribution.cdf(statistic)?;
            (2.0 * cdf.min(1.0 - cdf)).min(1.0)
        }
    };
    Ok(p)
}

/// A PPF lookup with its CDF confirmation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValue {
    pub distribution: ReferenceDistribution,
    pub probability: f64,
    pub value: f64,
    /// cdf(value), which should reproduce `probability`
    pub confirmation: f64,
}

impl fmt::Display for CriticalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} p={}: critical value {:.4}, cdf check {:.4}",
            self.distribution, self.probability, self.value, self.confirmation
        )
    }
}

/// Look up `ppf(probability)` and confirm it with the CDF
pub fn critical_value(
    distribution: ReferenceDistribution,
    probability: f64,
) -> Result<CriticalValue> {
    let value = distribution.ppf(probability)?;
    let confirmation = distribution.cdf(value)?;

    tracing::debug!(%distribution, probability, value, confirmation, "critical value");

    Ok(CriticalValue {
        distribution,
        probability,
        value,
        confirmation,
    })
}

/// The standard worked examples: one-tailed lookups at p = 0.95 for each
/// distribution (df = 10 where needed), then the two-sided Gaussian pair at
/// alpha = 0.05.
pub fn walkthrough() -> Result<Vec<CriticalValue>> {
    let p = 0.95;
    let mut values = vec![
        critical_value(ReferenceDistribution::Gaussian, p)?,
        critical_value(ReferenceDistribution::student_t(10)?, p)?,
        critical_value(ReferenceDistribution::chi_squared(10)?, p)?,
    ];

    let alpha = 0.05;
    values.push(critical_value(ReferenceDistribution::Gaussian, alpha / 2.0)?);
    values.push(critical_value(ReferenceDistribution::Gaussian, 1.0 - alpha / 2.0)?);

    Ok(values)
}
