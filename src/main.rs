//! PatentWhisperer - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use patentwhisperer::{
    cli::{display, Args, Commands},
    config::Config,
    doctor::Doctor,
    embedding::{Embedder, EmbeddingEngine},
    generation,
    index::{self, IndexClient},
    ingest::IngestJob,
    rag::{PipelineConfig, RagPipeline},
    repl::ShellSession,
    telemetry,
    types::Query,
    RagError,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    telemetry::init_logging(args.verbosity());

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cause = e.downcast_ref::<RagError>();
            eprintln!(
                "{}",
                display::render_error(&display::label_error(cause, format!("{:#}", e)))
            );
            match cause {
                Some(err) if err.is_user_error() => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    debug!(backend = ?config.index.backend, index = %config.index.name, "Configuration loaded");

    match &args.command {
        Commands::Ingest { file } => run_ingest(args, &config, file).await,
        Commands::Query { text, top_k, json } => run_query(&config, text, *top_k, *json).await,
        Commands::Shell => run_shell(&config).await,
        Commands::Doctor => run_doctor(&config).await,
        Commands::Config => show_config(&config),
    }
}

/// Loading is CPU- and disk-bound; keep it off the runtime threads
async fn load_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedding_config = config.embedding.clone();
    let engine = tokio::task::spawn_blocking(move || EmbeddingEngine::load(&embedding_config))
        .await
        .context("Embedding model loader panicked")?
        .context("Failed to load embedding model")?;
    Ok(Arc::new(engine))
}

async fn connect_index(config: &Config) -> Result<Arc<dyn IndexClient>> {
    index::connect(&config.index)
        .await
        .context("Failed to create search index client")
}

async fn build_pipeline(config: &Config) -> Result<RagPipeline> {
    let embedder = load_embedder(config).await?;
    let index = connect_index(config).await?;
    let generator =
        generation::connect(&config.generation).context("Failed to create generation client")?;

    Ok(RagPipeline::new(
        embedder,
        index,
        generator,
        PipelineConfig::from_config(config),
    ))
}

async fn run_ingest(args: &Args, config: &Config, file: &Path) -> Result<()> {
    let embedder = load_embedder(config).await?;
    let index = connect_index(config).await?;

    let job = IngestJob::new(embedder, index, config.index.name.clone())
        .with_progress(args.verbosity().show_progress());
    let report = job
        .run(file)
        .await
        .with_context(|| format!("Ingestion of {} failed", file.display()))?;

    if args.verbosity().show_progress() {
        println!("{}", display::render_ingest_report(&report, &config.index.name));
    }
    Ok(())
}

async fn run_query(config: &Config, text: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let query = Query::new(text, top_k.unwrap_or(config.query.default_top_k));
    // Reject bad input before loading the model
    query.validate(config.query.max_top_k)?;

    let pipeline = build_pipeline(config).await?;
    let answer = pipeline
        .run_with_timeout(&query, Duration::from_secs(config.query.timeout_secs))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", display::render_answer(&answer));
    }
    Ok(())
}

async fn run_shell(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let mut shell = ShellSession::new(
        pipeline,
        config.query.default_top_k,
        Duration::from_secs(config.query.timeout_secs),
    )?;
    shell.run().await
}

async fn run_doctor(config: &Config) -> Result<()> {
    let index = connect_index(config).await?;
    let doctor = Doctor::new(config.clone(), index);
    let checks = doctor.run_diagnostics().await;

    println!("{}", display::render_health_checks(&checks));
    if !Doctor::overall_status(&checks) {
        anyhow::bail!("One or more health checks failed");
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("# default location: {}", path.display());
    }
    println!("{}", config.redacted().to_toml()?);
    Ok(())
}
