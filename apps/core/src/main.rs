// IntentCast V1 Entry Point
// Batch and HTTP intent classification over multi-turn conversations.

mod config;
mod engine;
mod error;
mod fs_manager;
mod models;
mod output;
mod preflight;
mod run_logger;
mod server;
mod service;
#[cfg(test)]
mod tests;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Settings;
use engine::{ClassificationEngine, ZeroShotScorer};
use fs_manager::PortablePathManager;
use run_logger::RunLogger;
use service::{BatchRunner, ConversationClassifier};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

#[derive(Parser)]
#[command(
    name = "intentcast",
    version,
    about = "Multi-turn conversation intent classifier"
)]
struct Cli {
    /// Path to a JSON settings file. Defaults and environment overrides
    /// apply either way.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a batch of conversations from a JSON file and write the
    /// JSON/CSV/zip result files.
    Classify {
        /// Input JSON file: an array of conversation objects.
        input: PathBuf,

        /// Directory for the result files.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Start the HTTP classification service.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new("intentcast".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;
    let cli = Cli::parse();

    if let Err(e) = PortablePathManager::init() {
        error!("Failed to initialize portable file system: {}", e);
    }
    RunLogger::init_global();

    let result = run(cli).await;
    match &result {
        Ok(()) => run_logger::global_complete(true),
        Err(e) => {
            run_logger::global_log_error(&e.to_string());
            run_logger::global_complete(false);
        }
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    let report = preflight::run_preflight_checks(&settings);
    if !report.ready_to_start {
        anyhow::bail!("Preflight failed: {}", report.summary);
    }

    let settings = Arc::new(settings);
    match cli.command {
        Command::Classify { input, output_dir } => {
            run_classify(settings, input, output_dir).await
        }
        Command::Serve { host, port } => run_serve(settings, &host, port).await,
    }
}

/// Loads the model set eagerly and assembles the batch runner. Nothing is
/// classified until this returns.
async fn load_classifier(settings: Arc<Settings>) -> anyhow::Result<Arc<BatchRunner>> {
    let model_ids = settings.models.clone();
    let prefer_cpu = settings.prefer_cpu;

    let scorer = tokio::task::spawn_blocking(move || ZeroShotScorer::load(&model_ids, prefer_cpu))
        .await
        .context("Model loading task panicked")??;

    let engine = Arc::new(ClassificationEngine::new(
        Box::new(scorer),
        Arc::clone(&settings),
    ));
    Ok(Arc::new(BatchRunner::new(engine)))
}

async fn run_classify(
    settings: Arc<Settings>,
    input: PathBuf,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let raw = std::fs::read(&input).with_context(|| format!("Cannot read input {:?}", input))?;
    let conversations = service::parse_batch(&raw)?;
    info!(
        count = conversations.len(),
        input = %input.display(),
        "Loaded conversations"
    );

    let classifier = load_classifier(Arc::clone(&settings)).await?;
    let outcome = classifier.classify_batch(conversations).await;

    run_logger::global_log_info(&format!(
        "Classified batch: {} results, {} failures",
        outcome.results.len(),
        outcome.failures.len()
    ));
    for failure in &outcome.failures {
        warn!(
            conversation_id = %failure.conversation_id,
            reason = %failure.reason,
            "Conversation not classified"
        );
        run_logger::global_log_error(&format!(
            "Conversation '{}' skipped: {}",
            failure.conversation_id, failure.reason
        ));
    }

    let out_dir = output_dir
        .or_else(|| settings.output_dir.clone())
        .unwrap_or_else(PortablePathManager::output_dir);
    let zip_path = output::write_outputs(&outcome.results, &out_dir)?;

    info!(
        results = outcome.results.len(),
        failures = outcome.failures.len(),
        archive = %zip_path.display(),
        "Batch classification finished"
    );
    Ok(())
}

async fn run_serve(settings: Arc<Settings>, host: &str, port: u16) -> anyhow::Result<()> {
    let classifier = load_classifier(Arc::clone(&settings)).await?;
    info!(
        models = classifier.model_ids().len(),
        "Models loaded; starting service"
    );

    let classifier: Arc<dyn ConversationClassifier> = classifier;
    server::serve(classifier, host, port)
        .await
        .context("HTTP service failed")?;
    Ok(())
}
