//! Statistics module
//!
//! Reference distributions (via statrs) and critical values for hypothesis tests.

pub mod critical;
pub mod distribution;

pub use critical::{
    critical_region, critical_value, p_value, walkthrough, CriticalRegion, CriticalValue,
    Decision, Tail,
};
pub use distribution::{DistributionKind, ReferenceDistribution};
