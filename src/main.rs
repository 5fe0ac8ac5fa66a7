use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam::channel::{unbounded, Receiver};
use gps_cluster::{
    ClusterConfig, ClusterRequest, Event, NewPoint, Orchestrator, PointStore, SqliteStore,
    WorkerPool, parse_gps,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Cluster stored GPS markers into centroids
#[derive(Parser)]
#[command(name = "gps-cluster")]
#[command(version)]
#[command(about = "Clusters stored GPS markers into centroids and relays the result in pages")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// SQLite database holding points and results
    #[arg(long, global = true, default_value = "gps-cluster.sqlite")]
    db: String,

    /// JSON config file; defaults apply to missing keys
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store GPS markers as active points
    Ingest {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        group: Option<String>,
        /// Markers such as `GPS:Base:12.5:-3:7.25:`
        #[arg(required = true)]
        markers: Vec<String>,
    },
    /// Run one clustering request and print its responses
    Cluster {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        k: usize,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Read request JSON lines from stdin and answer them with the worker pool
    Serve,
    /// List stored results of a user
    Results {
        #[arg(long)]
        user: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // stdout carries outbound events only
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ClusterConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ClusterConfig::default(),
    };
    let store = Arc::new(
        SqliteStore::open(&cli.db).with_context(|| format!("Failed to open store {}", cli.db))?,
    );

    match cli.command {
        Commands::Ingest {
            user,
            group,
            markers,
        } => ingest(&store, &config, user, group, &markers),
        Commands::Cluster {
            user,
            k,
            group,
            channel,
        } => {
            let mut request = ClusterRequest::new(user, k, channel);
            request.group_name = group;
            cluster_once(store, config, &request)
        }
        Commands::Serve => serve(store, config),
        Commands::Results { user } => {
            let results = store
                .list_results(user)
                .with_context(|| format!("Failed to list results for user {}", user))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&results).context("Failed to serialize results")?
            );
            Ok(())
        }
    }
}

fn ingest(
    store: &SqliteStore,
    config: &ClusterConfig,
    user: i64,
    group: Option<String>,
    markers: &[String],
) -> Result<()> {
    let group = group.unwrap_or_else(|| config.default_group.clone());
    let mut stored = 0;

    for text in markers {
        let marker = match parse_gps(text) {
            Ok(marker) => marker,
            Err(e) => {
                warn!(marker = %text, error = %e, "skipping malformed marker");
                continue;
            }
        };
        store
            .persist_point(&NewPoint::active(user, group.as_str(), text.trim(), marker.coords))
            .with_context(|| format!("Failed to store marker {}", marker.name))?;
        stored += 1;
    }

    info!(user, group = %group, stored, skipped = markers.len() - stored, "markers ingested");
    Ok(())
}

fn cluster_once(store: Arc<SqliteStore>, config: ClusterConfig, request: &ClusterRequest) -> Result<()> {
    let start = Instant::now();
    let orchestrator = Orchestrator::new(store, config).context("Invalid configuration")?;
    let (tx, rx) = unbounded();

    let report = orchestrator.run(request, &tx);
    drop(tx);
    print_events(&rx)?;

    info!(
        state = ?report.state,
        result_id = ?report.result_id,
        messages = report.messages_sent,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "request finished"
    );
    Ok(())
}

fn serve(store: Arc<SqliteStore>, config: ClusterConfig) -> Result<()> {
    let workers = config.workers;
    let orchestrator =
        Arc::new(Orchestrator::new(store, config).context("Invalid configuration")?);
    let (tx, rx) = unbounded();

    let pool = WorkerPool::spawn(orchestrator, workers, tx).context("Failed to start workers")?;
    let printer = thread::Builder::new()
        .name("outbound".to_string())
        .spawn(move || print_events(&rx))
        .context("Failed to start outbound printer")?;

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClusterRequest>(&line) {
            Ok(request) => pool.submit(request).context("Failed to queue request")?,
            Err(e) => warn!(error = %e, "skipping malformed request"),
        }
    }

    let processed = pool.shutdown();
    info!(processed, "input closed, workers drained");

    match printer.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("Outbound printer panicked"),
    }
}

/// Write every event as one JSON line until all senders are gone
fn print_events(events: &Receiver<Event>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event in events.iter() {
        let json = serde_json::to_string(&event).context("Failed to serialize event")?;
        writeln!(out, "{}", json).context("Failed to write event")?;
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}
