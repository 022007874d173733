//! Critical values of the reference distributions
//!
//! Usage:
//!   cargo run --bin critical_values
//!   cargo run --bin critical_values -- --distribution t --df 10 --probability 0.95
//!   cargo run --bin critical_values -- --distribution chi2 --df 4 \
//!       --significance 0.05 --tail upper --statistic 11.2

use anyhow::{Context, Result};
use clap::Parser;
use stat_trees::stats::{
    critical_region, critical_value, p_value, walkthrough, DistributionKind, Tail,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Critical values for Gaussian, Student's t and Chi-squared tests"
)]
struct Args {
    /// Distribution (gaussian, t, chi2); runs the standard examples when omitted
    #[arg(short, long)]
    distribution: Option<String>,

    /// Degrees of freedom for t and Chi-squared
    #[arg(long, default_value = "10")]
    df: u32,

    /// Cumulative probability to invert
    #[arg(short, long, default_value = "0.95")]
    probability: f64,

    /// Significance level; prints the rejection region instead of a single value
    #[arg(short, long)]
    significance: Option<f64>,

    /// Tail of the test (lower, upper, two-sided)
    #[arg(short, long, default_value = "upper")]
    tail: String,

    /// Test statistic to decide on (needs --significance)
    #[arg(long, allow_hyphen_values = true)]
    statistic: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stat_trees=info")),
        )
        .init();

    let args = Args::parse();

    let Some(name) = args.distribution.as_deref() else {
        info!("Running the standard critical value examples");
        println!("=== Critical Values ===\n");
        for cv in walkthrough()? {
            println!("{}", cv.distribution);
            println!(
                "  p = {:<6} value = {:.4}  cdf(value) = {:.4}",
                cv.probability, cv.value, cv.confirmation
            );
        }
        return Ok(());
    };

    let distribution = name
        .parse::<DistributionKind>()?
        .with_df(args.df)
        .context("invalid degrees of freedom")?;

    match args.significance {
        None => {
            let cv = critical_value(distribution, args.probability)?;
            println!("{:.4}", cv.value);
            println!("{:.4}", cv.confirmation);
        }
        Some(alpha) => {
            let tail: Tail = args.tail.parse()?;
            let region = critical_region(distribution, alpha, tail)?;
            println!("{}", region);

            if let Some(statistic) = args.statistic {
                let decision = region.decide(statistic)?;
                let p = p_value(distribution, statistic, tail)?;
                println!("statistic = {:.4}, p-value = {:.4}: {}", statistic, p, decision);
            }
        }
    }

    Ok(())
}
