use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use reagent_tray_core_rs::{Catalog, OptimizerConfig, TrayOptimizer};
use std::path::PathBuf;
use tracing::debug;

mod render;

#[derive(Parser)]
#[command(
    name = "reagent-tray",
    about = "Reagent tray configurator: place reagents for the longest tray life",
    version,
    propagate_version = true
)]
struct Cli {
    /// Experiment catalog JSON (default: built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Optimizer settings JSON (strategy, max_expansions)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the experiments in the catalog
    List,
    /// Optimize the tray for a selection of experiments
    Optimize {
        /// Experiment ids, e.g. `1 16` or `1,16`
        #[arg(required = true, value_delimiter = ',')]
        experiments: Vec<u32>,
        /// Swap two locations after optimizing, as `A:B` (0-based, repeatable)
        #[arg(long = "swap", value_parser = parse_swap)]
        swaps: Vec<(usize, usize)>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn parse_swap(value: &str) -> Result<(usize, usize), String> {
    let (a, b) = value
        .split_once(':')
        .ok_or_else(|| format!("expected A:B, got '{}'", value))?;
    let a = a.trim().parse().map_err(|e| format!("bad location '{}': {}", a, e))?;
    let b = b.trim().parse().map_err(|e| format!("bad location '{}': {}", b, e))?;
    Ok((a, b))
}

fn load_optimizer(cli: &Cli) -> anyhow::Result<TrayOptimizer> {
    let catalog = match &cli.catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Catalog::from_json_str(&json)
                .with_context(|| format!("loading catalog {}", path.display()))?
        }
        None => Catalog::default_catalog(),
    };
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            OptimizerConfig::from_json_str(&json)?
        }
        None => OptimizerConfig::default(),
    };
    debug!(experiments = catalog.len(), ?config, "optimizer ready");
    Ok(TrayOptimizer::new(catalog, config))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reagent_tray=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let optimizer = load_optimizer(&cli)?;

    match &cli.command {
        Commands::List => {
            print!("{}", render::experiment_list(&optimizer.available_experiments()));
        }
        Commands::Optimize {
            experiments,
            swaps,
            format,
        } => {
            let mut configuration = optimizer.optimize(experiments)?;
            for (a, b) in swaps {
                configuration = optimizer.swap(&configuration, *a, *b)?;
            }

            match format {
                Format::Text => print!("{}", render::configuration(&configuration)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&configuration)?),
            }

            if !configuration.is_viable() {
                bail!("tray life is zero: at least one experiment cannot run a single test");
            }
        }
    }

    Ok(())
}
