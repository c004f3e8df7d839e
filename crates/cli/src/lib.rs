use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use typeahead_indexer::{
    ConsolidationConfig, ConsolidationStats, ConsolidationUpdate, IndexSnapshot, PassOutcome,
    TypeaheadService,
};
use typeahead_ranked_store::{MemoryRankedStore, ScoredMember};

mod config;
mod http;
mod metrics;

use config::ConfigOverrides;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "typeahead")]
#[command(about = "Prefix suggestions learned from observed queries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML file with consolidation settings
    #[arg(long, global = true, env = "TYPEAHEAD_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the query/suggest HTTP API with a background consolidation worker
    Serve(ServeArgs),

    /// Replay a word list as queries and print the resulting suggestions as JSON
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:7070")]
    bind: String,

    /// Ranked store snapshot, loaded at start and written on shutdown
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Starter vocabulary (one word per line) used when the store is empty
    #[arg(long)]
    starter: Option<PathBuf>,
}

#[derive(Args)]
struct SimulateArgs {
    /// Query stream, one word per line; `-` reads stdin
    #[arg(long)]
    words: PathBuf,

    /// Starter vocabulary (one word per line) used when the store is empty
    #[arg(long)]
    starter: Option<PathBuf>,

    /// Run a timer tick after every N queries (0: only the final pass)
    #[arg(long, default_value_t = 0)]
    batch: usize,

    /// Prefixes to look up afterwards (default: first letter of every word)
    #[arg(long = "prefix")]
    prefixes: Vec<String>,

    /// Ranked store snapshot, loaded before and written after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Serialize)]
struct SimulationReport {
    queries: usize,
    rejected: usize,
    passes: Vec<ConsolidationStats>,
    index: IndexSnapshot,
    lookups: BTreeMap<String, Vec<ScoredMember>>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Simulation output is JSON on stdout.
    if matches!(cli.command, Commands::Simulate(_)) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = config::load_config(cli.config.as_deref(), &cli.overrides)?;
    log::debug!("Consolidation config: {config:?}");

    match cli.command {
        Commands::Serve(args) => serve(args, config).await?,
        Commands::Simulate(args) => simulate(args, config).await?,
    }
    Ok(())
}

async fn open_store(snapshot: Option<&Path>) -> Result<Arc<MemoryRankedStore>> {
    let store = match snapshot {
        Some(path) => MemoryRankedStore::open_snapshot(path)
            .await
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
        None => MemoryRankedStore::new(),
    };
    Ok(Arc::new(store))
}

async fn save_store(store: &MemoryRankedStore, snapshot: Option<&Path>) -> Result<()> {
    if let Some(path) = snapshot {
        store
            .save_snapshot(path)
            .await
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    }
    Ok(())
}

fn read_words(path: &Path) -> Result<Vec<String>> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read word list {}", path.display()))?
    };
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn load_starter(service: &TypeaheadService, starter: Option<&Path>) -> Result<()> {
    let Some(path) = starter else {
        return Ok(());
    };
    if service.config().starter_load_size == 0 {
        log::warn!(
            "Ignoring starter vocabulary {}: starter_load_size is 0",
            path.display()
        );
        return Ok(());
    }
    let words = read_words(path)?;
    if let Some(stats) = service.load_starter_words(&words).await? {
        log::info!(
            "Starter vocabulary: {} words over {} prefixes",
            stats.words_discovered,
            stats.prefixes_refreshed
        );
    }
    Ok(())
}

/// Persists the store after every successful pass.
fn spawn_snapshot_saver(
    store: Arc<MemoryRankedStore>,
    path: PathBuf,
    mut updates: broadcast::Receiver<ConsolidationUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) if !update.success => continue,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Snapshot saver missed {skipped} pass updates");
                }
                Err(RecvError::Closed) => break,
            }
            if let Err(err) = store.save_snapshot(&path).await {
                log::error!("Failed to write snapshot {}: {err}", path.display());
            }
        }
    })
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM. Handlers are installed before
/// this returns, so a signal arriving early is not lost.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

    Ok(async move {
        #[cfg(unix)]
        let terminate = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    log::error!("Failed to listen for Ctrl-C: {err}");
                    std::future::pending::<()>().await;
                }
            }
            _ = terminate => {}
        }
        log::info!("Shutdown signal received");
    })
}

async fn serve(args: ServeArgs, config: ConsolidationConfig) -> Result<()> {
    let store = open_store(args.snapshot.as_deref()).await?;
    let service = TypeaheadService::new(store.clone(), config)?;
    load_starter(&service, args.starter.as_deref()).await?;

    let worker = service.start_worker();
    let saver = args.snapshot.clone().map(|path| {
        spawn_snapshot_saver(store.clone(), path, worker.subscribe_updates())
    });
    let state = http::AppState {
        service,
        worker: worker.clone(),
        metrics: metrics::MetricsExporter::new()?,
    };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");
    let shutdown = shutdown_signal()?;

    print_stdout(&format!("Serving typeahead API: {base_url}"))?;
    print_stdout(&format!("Try: curl {base_url}/query/dog"))?;
    print_stdout(&format!("Try: curl {base_url}/suggest/do"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    // Let an in-flight pass finish before the final write.
    worker.shutdown().await;
    if let Some(saver) = saver {
        saver.abort();
        let _ = saver.await;
    }
    save_store(&store, args.snapshot.as_deref()).await?;
    log::info!("Typeahead server stopped");
    Ok(())
}

async fn simulate(args: SimulateArgs, config: ConsolidationConfig) -> Result<()> {
    let store = open_store(args.snapshot.as_deref()).await?;
    let service = TypeaheadService::new(store.clone(), config)?;
    load_starter(&service, args.starter.as_deref()).await?;

    let words = read_words(&args.words)?;
    let mut queries = 0;
    let mut rejected = 0;
    let mut passes = Vec::new();

    for (idx, word) in words.iter().enumerate() {
        match service.report_query(word).await {
            Ok(_) => queries += 1,
            Err(err) if err.is_transient() => rejected += 1,
            Err(err) => return Err(err.into()),
        }
        if args.batch > 0 && (idx + 1) % args.batch == 0 {
            if let PassOutcome::Completed(stats) = service.consolidate(false).await? {
                passes.push(stats);
            }
        }
    }
    if let PassOutcome::Completed(stats) = service.consolidate(true).await? {
        passes.push(stats);
    }

    let prefixes: BTreeSet<String> = if args.prefixes.is_empty() {
        words
            .iter()
            .filter_map(|word| word.chars().next())
            .map(String::from)
            .collect()
    } else {
        args.prefixes.iter().cloned().collect()
    };
    let mut lookups = BTreeMap::new();
    for prefix in prefixes {
        let ranked = service.lookup_scored(&prefix).await?;
        lookups.insert(prefix, ranked);
    }
    let report = SimulationReport {
        queries,
        rejected,
        passes,
        index: service.index_snapshot(),
        lookups,
    };

    save_store(&store, args.snapshot.as_deref()).await?;
    print_stdout(&serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
