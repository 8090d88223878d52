use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use food_waste_etl::config::{Config, ReferencePolicy};
use food_waste_etl::logging;
use food_waste_etl::pipeline::{Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "food_waste_etl")]
#[command(about = "Normalize the food donation datasets and rebuild the SQLite store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Destroy the store and rebuild it from the source files
    Build {
        /// Directory holding the four CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Store file to (re)create
        #[arg(long)]
        store: Option<PathBuf>,
        /// Load rows with dangling references instead of aborting
        #[arg(long)]
        permissive: bool,
        /// Write the run summary as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Normalize and validate the source files without writing the store
    Check {
        /// Directory holding the four CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Treat dangling references as warnings
        #[arg(long)]
        permissive: bool,
        /// Write the run summary as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn apply_overrides(config: &mut Config, data_dir: Option<PathBuf>, store: Option<PathBuf>, permissive: bool) {
    if let Some(dir) = data_dir {
        config.inputs.data_dir = dir;
    }
    if let Some(path) = store {
        config.store.path = path;
    }
    if permissive {
        config.validation.reference_policy = ReferencePolicy::Permissive;
    }
}

fn write_report(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("Failed to write report '{}'", path.display()))?;
    info!("Run report written to {}", path.display());
    Ok(())
}

fn print_issues(summary: &RunSummary, policy: ReferencePolicy) {
    if !summary.issue_counts.is_empty() {
        println!("\n⚠️  Field fallbacks:");
        for (label, count) in &summary.issue_counts {
            println!("   - {}: {}", label, count);
        }
    }
    if !summary.violations.is_empty() {
        println!("\n⚠️  Constraint violations:");
        for violation in &summary.violations {
            let level = if violation.is_fatal(policy) { "error" } else { "warning" };
            println!("   - [{}] {}", level, violation);
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            data_dir,
            store,
            permissive,
            report,
        } => {
            apply_overrides(&mut config, data_dir, store, permissive);
            let _guard = logging::init_logging(&config.logging.dir);
            let policy = config.validation.reference_policy;

            println!("🔄 Rebuilding store at {}...", config.store.path.display());
            let pipeline = Pipeline::new(config);
            let (_store, summary) = match pipeline.rebuild() {
                Ok(result) => result,
                Err(e) => {
                    error!("Rebuild failed: {}", e);
                    return Err(e.into());
                }
            };

            print_issues(&summary, policy);
            println!("\n📊 Loaded rows:");
            for count in &summary.loaded_rows {
                println!("   {}: {}", count.table, count.rows);
            }
            if let Some(path) = report {
                write_report(&path, &summary)?;
            }
            println!("✅ Database created & data inserted successfully");
        }
        Commands::Check {
            data_dir,
            permissive,
            report,
        } => {
            apply_overrides(&mut config, data_dir, None, permissive);
            let _guard = logging::init_logging(&config.logging.dir);
            let policy = config.validation.reference_policy;

            println!("🔍 Checking inputs in {}...", config.inputs.data_dir.display());
            let summary = Pipeline::new(config).check()?;

            print_issues(&summary, policy);
            if let Some(path) = report {
                write_report(&path, &summary)?;
            }

            let fatal = summary.violations.iter().filter(|v| v.is_fatal(policy)).count();
            if fatal > 0 {
                bail!("{} fatal violation(s); the store would not be rebuilt", fatal);
            }
            println!("✅ Inputs are loadable");
        }
    }

    Ok(())
}
