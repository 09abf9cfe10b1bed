//! `ibn-run`: translate an intent (or pick a stored policy) and drive it
//! through resolution, activation and assurance.
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ibn_console::{ConsoleOptions, TcpConsoleConnector};
use ibn_core::{InventorySnapshot, Settings, StageContext, StageKind, TopologyContext};
use ibn_inventory::{load_inventory, load_topology, refresh_inventory, ControllerClient};
use ibn_policy::PolicyStore;
use ibn_stages::{Pipeline, PipelineOptions, PipelineReport};
use ibn_translate::{translate_intent, OpenAiClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ibn-run")]
#[command(about = "Run the intent-based networking pipeline")]
#[command(long_about = None)]
struct Cli {
    /// Natural language intent to translate
    #[arg(long, conflicts_with = "policy_id")]
    intent: Option<String>,

    /// Existing policy to operate on
    #[arg(long)]
    policy_id: Option<String>,

    /// Refresh inventory from the controller before running
    #[arg(long)]
    refresh_inventory: bool,

    /// Stop after resolution
    #[arg(long)]
    skip_activation: bool,

    /// Stop after activation
    #[arg(long)]
    skip_assurance: bool,

    /// Directory holding topology.yaml, policies/ and inventory/
    #[arg(long, env = "IBN_ROOT")]
    root: Option<PathBuf>,
}

impl Cli {
    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            skip_activation: self.skip_activation,
            skip_assurance: self.skip_assurance,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(root) = &cli.root {
        settings = settings.with_root(root);
    }
    info!(root = %settings.paths.root.display(), controller = %settings.controller.base_url(), "settings loaded");

    let topology = load_topology(&settings.paths.topology)?;
    let store = PolicyStore::open(&settings.paths.policy_store)?;
    let inventory = obtain_inventory(&settings, &topology, cli.refresh_inventory).await?;

    let policy_id = match (&cli.intent, &cli.policy_id) {
        (Some(intent), _) => {
            println!("{}", stage_banner(StageKind::Translation));
            let llm = OpenAiClient::from_env()?;
            let policy = translate_intent(&llm, intent, &topology, Some(&inventory), &store).await?;
            println!("[translate] policy stored as {}", policy.policy_id);
            policy.policy_id
        }
        (None, Some(policy_id)) => policy_id.clone(),
        (None, None) if cli.refresh_inventory => {
            println!("[run] inventory refreshed; no policy actions requested");
            return Ok(());
        }
        (None, None) => anyhow::bail!("Provide either --intent or --policy-id"),
    };

    let ctx = StageContext::new(inventory, settings.controller.host.clone()).with_topology(topology);
    let connector = Arc::new(TcpConsoleConnector::new(
        ConsoleOptions::default().with_timeout(settings.console_timeout),
    ));

    let report = Pipeline::standard(connector)
        .run_observed(&policy_id, &store, &ctx, cli.pipeline_options(), |stage| {
            println!("{}", stage_banner(stage));
        })
        .await?;
    print_report(&report);
    Ok(())
}

/// Refresh when asked or when no snapshot exists yet, else read the saved one.
async fn obtain_inventory(
    settings: &Settings,
    topology: &TopologyContext,
    refresh: bool,
) -> anyhow::Result<InventorySnapshot> {
    let path = &settings.paths.inventory;
    if !refresh && path.exists() {
        return Ok(load_inventory(path)?);
    }

    println!("[inventory] collecting data from the controller ...");
    let controller = ControllerClient::new(&settings.controller)?;
    let snapshot = refresh_inventory(&controller, topology, &settings.controller.host, path).await?;
    println!("[inventory] saved to {}", path.display());
    Ok(snapshot)
}

fn stage_banner(stage: StageKind) -> String {
    let action = match stage {
        StageKind::Translation => "creating policy from intent",
        StageKind::Resolution => "checking policy feasibility",
        StageKind::Activation => "applying policy commands",
        StageKind::Assurance => "running validation checks",
    };
    format!("[{}] {} ...", stage.verb(), action)
}

fn report_lines(report: &PipelineReport) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        let verb = outcome.stage.verb();
        lines.push(format!("[{}] status: {}", verb, outcome.state));
        if !outcome.state.is_completed() {
            if outcome.stage == StageKind::Resolution {
                lines.push(format!("[{}] issues:", verb));
            }
            lines.extend(outcome.details.iter().map(|d| format!("  - {}", d)));
        }
    }

    match report.skipped_at {
        Some(stage) => lines.push(format!("[skip] {} disabled by flag", stage)),
        None if report.succeeded() => lines.push("[assure] policy satisfied".to_string()),
        None => {}
    }
    lines
}

fn print_report(report: &PipelineReport) {
    for line in report_lines(report) {
        println!("{}", line);
    }
}
