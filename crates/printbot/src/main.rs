use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use printbot::cli::{Args, Commands};
use printbot::config::{load_settings, state_dir_from};
use printbot::db::{state_database_path, Database};
use printbot::pipeline::{self, Ingestor, PipelineConfig};
use printbot::telemetry::{self, LogFormat};
use printbot::{folders, inspect, GraphMailSource, LpPrinter, PdfRenderer, Settings, SqliteLedger};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(LogFormat::from_env_value(
        std::env::var("LOG_FORMAT").ok().as_deref(),
    ))?;

    match args.command() {
        Commands::Inspect { db, search } => run_inspect(db, search),
        Commands::Folders => runtime()?.block_on(run_folders()),
        Commands::Run { dry_run, once } => runtime()?.block_on(run_worker(dry_run, once)),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn run_inspect(db: Option<std::path::PathBuf>, search: Option<String>) -> anyhow::Result<()> {
    let path = db.unwrap_or_else(|| {
        state_database_path(&state_dir_from(|name| std::env::var(name).ok()))
    });
    let report = inspect::load_report(&path, search.as_deref())
        .with_context(|| format!("Cannot read ledger at {}", path.display()))?;

    let stdout = std::io::stdout();
    inspect::write_report(&report, &mut stdout.lock())?;
    Ok(())
}

async fn run_folders() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let source = GraphMailSource::new(settings.graph_settings())?;
    let report = folders::load_report(&source, &settings.mail_folder).await?;

    let stdout = std::io::stdout();
    folders::write_report(&report, &mut stdout.lock())?;
    Ok(())
}

async fn run_worker(force_dry_run: bool, once: bool) -> anyhow::Result<()> {
    let mut settings: Settings = load_settings()?;
    if force_dry_run {
        settings.dry_run = true;
    }

    let db_path = settings.state_db_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Cannot open ledger at {}", db_path.display()))?;
    let ledger = SqliteLedger::new(db);

    let source = GraphMailSource::new(settings.graph_settings())?;
    let printer = LpPrinter::new(
        settings.print_command.clone(),
        settings.print_timeout,
        settings.print_mode(),
    );
    if settings.dry_run {
        warn!("Dry-run mode: documents are logged, not printed");
    }

    let mut ingestor = Ingestor::new(
        Arc::new(PipelineConfig::from_settings(&settings)),
        Arc::new(source),
        Arc::new(PdfRenderer::new()),
        Arc::new(printer),
        Arc::new(ledger.clone()),
    );

    info!(
        mailbox = %settings.mailbox_upn,
        state_db = %db_path.display(),
        printed_so_far = ledger.len().unwrap_or(0),
        "printbot starting"
    );

    let (stop_tx, stop_rx) = pipeline::shutdown_channel();

    if once {
        let (outcome, report) = ingestor.run_cycle(&stop_rx).await;
        info!(?outcome, printed = report.printed, failed = report.failed, "Single cycle finished");
        if outcome.is_failure() {
            anyhow::bail!("Poll cycle failed, see log for details");
        }
        return Ok(());
    }

    ctrlc::set_handler(move || {
        info!("Stop requested");
        if stop_tx.send(true).is_err() {
            error!("Poll loop already gone");
        }
    })
    .context("Failed to install signal handler")?;

    pipeline::run(ingestor, stop_rx).await;
    Ok(())
}
