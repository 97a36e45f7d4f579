use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use tokio::sync::watch;

use replyr::browser::RemoteDriver;
use replyr::cli::{Cli, Commands};
use replyr::completion::OpenAiClient;
use replyr::composer::ReplyComposer;
use replyr::config::Config;
use replyr::domain::Outcome;
use replyr::ledger::DedupLedger;
use replyr::limiter::RateLimiter;
use replyr::orchestrator::ReplyOrchestrator;
use replyr::scheduler::ScanScheduler;
use replyr::storage::JsonlStore;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("replyr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("replyr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<JsonlStore>> {
    let dir = config.storage_dir();
    fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("Failed to create storage directory {}", dir.display()))?;
    let store = JsonlStore::open(&dir)
        .wrap_err_with(|| format!("Failed to open store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

async fn run_bot(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    let browser = Arc::new(RemoteDriver::new(config.browser_config())?);
    let client = Arc::new(OpenAiClient::new(config.openai_config())?);
    let composer = ReplyComposer::new(client, config.retry_policy(), config.composer_config());
    let ledger = DedupLedger::new(store.clone());
    let limiter = RateLimiter::new(store.clone(), config.rate_limit_config());
    let scheduler = ScanScheduler::new(config.scheduler_config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, requesting shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    if let Some(url) = &config.post_url {
        println!("{} {}", "Monitoring".cyan(), url);
    }

    let mut orchestrator = ReplyOrchestrator::new(
        browser,
        composer,
        ledger,
        limiter,
        scheduler,
        config.retry_policy(),
        store,
        config.orchestrator_config(),
        shutdown_rx,
    );

    let summary = orchestrator.run().await?;

    println!(
        "{} {} cycles, {} replied, {} skipped, {} failed",
        "Session complete:".green(),
        summary.cycles,
        summary.replied.to_string().green(),
        summary.skipped.to_string().yellow(),
        summary.failed.to_string().red()
    );
    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let ledger = DedupLedger::new(store);
    let stats = ledger.statistics()?;

    println!("{}", "Ledger status".bold());
    println!("  processed: {}", stats.total);
    println!("  replied:   {}", stats.replied.to_string().green());
    println!("  skipped:   {}", stats.skipped.to_string().yellow());
    println!("  failed:    {}", stats.failed.to_string().red());
    println!("  authors:   {}", stats.unique_authors);
    Ok(())
}

fn show_history(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let ledger = DedupLedger::new(store);
    let records = ledger.all()?;

    let replies: Vec<_> = records
        .iter()
        .filter(|r| r.outcome == Outcome::Replied)
        .collect();

    if replies.is_empty() {
        println!("{}", "No replies recorded yet".yellow());
        return Ok(());
    }

    let start = replies.len().saturating_sub(limit);
    for record in &replies[start..] {
        println!(
            "{} {} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            record.author_name.cyan(),
            record.comment_text
        );
        if let Some(reply) = &record.reply_text {
            println!("  {} {}", "->".green(), reply);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(&config).await,
        Commands::Status => show_status(&config),
        Commands::History { limit } => show_history(&config, limit),
    }
}
