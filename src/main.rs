use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use remediplan::config::{LoggingConfig, PlannerConfig};
use remediplan::report::channels::Notifier;
use remediplan::report::{dashboard, PlanSummary};
use remediplan::{export, ingest, Plan, Policy};

#[derive(Parser)]
#[command(
    name = "remediplan",
    about = "Deterministic remediation planner for test-failure batches",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and rank a batch of failure records
    Plan {
        /// Policy file (YAML, TOML or JSON)
        #[arg(long)]
        policy: PathBuf,

        /// Failure records, one JSON object per line
        #[arg(long)]
        failures: PathBuf,

        /// Plan output; a `.csv` extension selects CSV, anything else JSON
        #[arg(long, default_value = "plan.json")]
        out: PathBuf,

        /// Also write an HTML dashboard
        #[arg(long)]
        dashboard: Option<PathBuf>,

        /// Planner configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write notification payloads for the enabled channels
        #[arg(long)]
        notify: bool,
    },

    /// Load a policy and print it with every default resolved
    CheckPolicy {
        /// Policy file (YAML, TOML or JSON)
        #[arg(long)]
        policy: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            policy,
            failures,
            out,
            dashboard,
            config,
            notify,
        } => {
            let mut cfg = match config.as_deref() {
                Some(path) => PlannerConfig::load(path)?,
                None => PlannerConfig::load_or_default(),
            };
            cfg.apply_env_overrides();
            init_tracing(&cfg.logging);

            run_plan(&policy, &failures, &out, dashboard.as_deref(), &cfg, notify)?;
        }
        Commands::CheckPolicy { policy, json } => {
            init_tracing(&LoggingConfig::default());
            let policy = Policy::load(&policy)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&policy)?);
            } else {
                println!("{policy:#?}");
            }
        }
    }

    Ok(())
}

fn run_plan(
    policy_path: &Path,
    failures_path: &Path,
    out: &Path,
    dashboard_path: Option<&Path>,
    cfg: &PlannerConfig,
    notify: bool,
) -> Result<()> {
    tracing::info!(policy = %policy_path.display(), failures = %failures_path.display(), "building plan");

    let policy = Policy::load(policy_path)?;
    let file = File::open(failures_path)
        .with_context(|| format!("failed to open failures file: {}", failures_path.display()))?;
    let ingested = ingest::ingest_reader(BufReader::new(file))
        .with_context(|| format!("failed to read failures file: {}", failures_path.display()))?;

    let plan = Plan::from_ingested(ingested, &policy);
    if !plan.skipped.is_empty() {
        tracing::warn!(skipped = plan.skipped.len(), "some failure records were skipped");
    }

    export::write_plan(out, &plan.incidents)?;
    println!("Plan saved to {}", out.display());

    if let Some(path) = dashboard_path {
        let html = dashboard::render(&plan.incidents).context("failed to render dashboard")?;
        std::fs::write(path, html)
            .with_context(|| format!("failed to write dashboard: {}", path.display()))?;
        println!("Dashboard saved to {}", path.display());
    }

    println!(
        "{} incidents, {} total minutes, {} lines skipped",
        plan.len(),
        plan.total_minutes(),
        plan.skipped.len()
    );

    if notify {
        let summary = PlanSummary::from_plan(&plan.incidents, cfg.report.top_n);
        Notifier::from_config(cfg).notify(&summary);
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
