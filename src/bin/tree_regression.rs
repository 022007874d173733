//! Fit tree-based regressors and report their in-sample MSE
//!
//! Usage:
//!   cargo run --bin tree_regression
//!   cargo run --bin tree_regression -- --recipe cubist --committees 5 --neighbors 3
//!   cargo run --bin tree_regression -- --data data.csv --config models.json

use anyhow::{Context, Result};
use clap::Parser;
use stat_trees::data::{longley, Dataset};
use stat_trees::models::{Cubist, RandomForest, RegressionTree, Regressor};
use stat_trees::recipes::{evaluate, run_recipe, Recipe};
use stat_trees::RecipeConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "CART, bagging, random forest and Cubist regression")]
struct Args {
    /// Recipe to run (cart, bagging, random-forest, cubist, all)
    #[arg(short, long, default_value = "all")]
    recipe: String,

    /// CSV file with a header row; the last column is the target (default: Longley)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// JSON model settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for every randomised model
    #[arg(long)]
    seed: Option<u64>,

    /// Trees in the random forest
    #[arg(short, long)]
    trees: Option<usize>,

    /// Bootstrap replicates for bagging
    #[arg(long)]
    bags: Option<usize>,

    /// Cubist committees
    #[arg(long)]
    committees: Option<usize>,

    /// Cubist neighbours (0-9)
    #[arg(long)]
    neighbors: Option<usize>,

    /// Print the fitted tree, forest summary and Cubist rules
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stat_trees=info")),
        )
        .init();

    let args = Args::parse();

    let dataset = match &args.data {
        Some(path) => Dataset::load_csv(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => longley(),
    };

    let mut config = match &args.config {
        Some(path) => RecipeConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => RecipeConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(trees) = args.trees {
        config.forest.n_trees = trees;
    }
    if let Some(bags) = args.bags {
        config.bagging.n_estimators = bags;
    }
    if let Some(committees) = args.committees {
        config.cubist.committees = committees;
    }
    if let Some(neighbors) = args.neighbors {
        config.cubist.neighbors = neighbors;
    }
    config.validate()?;

    let recipes: Vec<Recipe> = if args.recipe.eq_ignore_ascii_case("all") {
        Recipe::ALL.to_vec()
    } else {
        vec![args.recipe.parse()?]
    };

    info!(
        "Dataset: {} samples, {} features, target {}",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.target_name
    );

    println!("=== In-sample MSE ===\n");
    for recipe in recipes {
        if !args.verbose {
            println!("{}", run_recipe(recipe, &dataset, &config)?);
            continue;
        }

        // Fit once, then score and describe the same model
        match recipe {
            Recipe::Cart => {
                let mut tree = RegressionTree::new(config.cart.clone());
                tree.fit(&dataset)?;
                println!("{}", evaluate(recipe, &tree, &dataset)?);
                println!("\n{}", tree.render());
                for (name, importance) in tree.feature_importance_map() {
                    println!("  {:20} {:.4}", name, importance);
                }
                println!();
            }
            Recipe::RandomForest => {
                let mut forest = RandomForest::new(config.forest.clone());
                forest.fit(&dataset)?;
                println!("{}", evaluate(recipe, &forest, &dataset)?);
                println!("\n{}\n", forest.summary());
            }
            Recipe::Cubist => {
                let mut cubist = Cubist::new(config.cubist.clone());
                cubist.fit(&dataset)?;
                println!("{}", evaluate(recipe, &cubist, &dataset)?);
                println!("\n{}", cubist);
            }
            Recipe::Bagging => {
                println!("{}", run_recipe(recipe, &dataset, &config)?);
            }
        }
    }

    Ok(())
}
