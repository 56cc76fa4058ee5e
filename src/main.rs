//! routeprint CLI entrypoint
//! Parses command-line arguments and wires the adapters to the pipeline.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use routeprint::configuration::validate_configuration;
use routeprint::core::config::PipelineConfig;
use routeprint::fulfillment::{FulfillmentCoordinator, Order};
use routeprint::geometry::polyline;
use routeprint::infrastructure::{
    CommandRenderer, FileConfigurationStore, InMemorySessionStore, SqliteAuditSink, StravaClient,
    UnavailableSessionStore,
};
use routeprint::resolution::{ResolutionOrchestrator, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// External imports (alphabetized)
use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routeprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Resolve, render and record the map for one order line item
    Fulfill {
        /// Order JSON as exported by the storefront
        #[arg(long)]
        order: PathBuf,
        /// Line item to fulfill
        #[arg(long)]
        line_item: u64,
    },
    /// Validate a map configuration JSON file
    Validate {
        /// Path to the configuration
        file: PathBuf,
    },
    /// Decode an encoded polyline into [lng, lat] pairs
    #[command(name = "decode-polyline")]
    DecodePolyline {
        /// Encoded polyline string
        encoded: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, results to stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Fulfill { order, line_item } => {
            fulfill(cli.config.as_deref(), order, *line_item).await
        }
        Commands::Validate { file } => validate(file),
        Commands::DecodePolyline { encoded } => {
            let points = polyline::decode(encoded).context("Failed to decode polyline")?;
            println!("{}", serde_json::to_string_pretty(&points)?);
            Ok(())
        }
    }
}

async fn fulfill(
    config_path: Option<&Path>,
    order_path: &Path,
    line_item_id: u64,
) -> anyhow::Result<()> {
    let config =
        PipelineConfig::load(config_path).context("Failed to load pipeline configuration")?;

    let content = std::fs::read_to_string(order_path)
        .with_context(|| format!("Failed to read order file {}", order_path.display()))?;
    let order: Order = serde_json::from_str(&content).context("Failed to parse order JSON")?;
    let line_item = order
        .line_item(line_item_id)
        .ok_or_else(|| anyhow!("Order {} has no line item {line_item_id}", order.id))?;

    info!(order_id = order.id, line_item_id, "Starting routeprint fulfillment");

    let store = Arc::new(FileConfigurationStore::new(config.store.root.clone()));
    let sessions: Arc<dyn SessionStore> = if config.session.in_memory {
        Arc::new(InMemorySessionStore::new(config.session.ttl_secs))
    } else {
        Arc::new(UnavailableSessionStore)
    };
    let api = Arc::new(
        StravaClient::from_config(&config.strava).context("Failed to create Strava client")?,
    );
    let audit = Arc::new(
        SqliteAuditSink::open(&config.audit.database_path)
            .await
            .context("Failed to open audit database")?,
    );
    let renderer = Arc::new(CommandRenderer::from_config(&config.renderer));

    let orchestrator = Arc::new(ResolutionOrchestrator::standard(
        store.clone(),
        sessions,
        api,
        config.defaults.clone(),
    ));
    let coordinator = FulfillmentCoordinator::new(
        orchestrator,
        renderer,
        store,
        audit,
        config.generation_timeout(),
    );

    let result = coordinator
        .fulfill_order_line_item(&order, line_item)
        .await
        .context("Map generation failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let candidate: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

    let report = validate_configuration(&candidate);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}
