use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{parse_hour_window, TrackerConfig};
use crate::fetch::HttpFetcher;
use crate::ingest::{ingest_once, IngestOutcome};
use crate::schedule::{self, Cadence, DailySchedule};
use crate::series::materialize;
use crate::server::HttpServer;
use crate::store::HistoryStore;

#[derive(Parser, Debug)]
#[command(
    name = "valuetrack",
    version,
    about = "Daily item value snapshots with a JSON API and a time-series chart",
    arg_required_else_help = true
)]
pub struct Cli {
    /// History JSON file (overrides VT_HISTORY_FILE)
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Page to scrape (overrides VT_SOURCE_URL)
    #[arg(long)]
    pub url: Option<String>,
    /// Fetch timeout in seconds (overrides VT_FETCH_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Ingest at startup, schedule daily ingests and serve chart + JSON API
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        /// Listen host (overrides VT_BIND_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// HTTP worker threads (overrides VT_HTTP_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
        /// Daily ingest hour window, e.g. "1-5" (overrides VT_SCHEDULE_HOURS)
        #[arg(long)]
        hours: Option<String>,
        /// Ingest every N seconds instead of once a day
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Skip the ingest at startup
        #[arg(long)]
        no_initial_ingest: bool,
    },
    /// Run one ingest cycle and exit (non-zero exit if nothing was appended)
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the full history as JSON
    History {
        /// Pretty-print
        #[arg(long)]
        pretty: bool,
    },
    /// Print the latest snapshot as JSON ({} when empty)
    Latest,
    /// Print the materialized per-item series as JSON
    Series {
        /// Pretty-print
        #[arg(long)]
        pretty: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = TrackerConfig::from_env();
    if let Some(h) = cli.history {
        cfg = cfg.with_history_file(h);
    }

    match cli.cmd {
        Cmd::Serve {
            source,
            host,
            port,
            workers,
            hours,
            interval_secs,
            no_initial_ingest,
        } => {
            cfg = apply_source(cfg, source);
            if let Some(h) = host {
                cfg = cfg.with_bind_host(h);
            }
            if let Some(p) = port {
                cfg = cfg.with_port(p);
            }
            if let Some(w) = workers {
                cfg = cfg.with_http_workers(w);
            }
            if let Some(h) = hours {
                let (lo, hi) = parse_hour_window(&h)
                    .ok_or_else(|| anyhow!("invalid --hours '{}': use H or H-H within 0..=23", h))?;
                cfg = cfg.with_schedule_hours(lo, hi);
            }
            if interval_secs.is_some() {
                cfg = cfg.with_interval_secs(interval_secs);
            }
            if no_initial_ingest {
                cfg = cfg.with_initial_ingest(false);
            }
            cmd_serve(cfg)
        }
        Cmd::Ingest { source } => cmd_ingest(apply_source(cfg, source)),
        Cmd::History { pretty } => {
            let store = open_ro(&cfg)?;
            print_json(&*store.all(), pretty)
        }
        Cmd::Latest => {
            let store = open_ro(&cfg)?;
            match store.latest() {
                Some(s) => print_json(&s, true),
                None => {
                    println!("{{}}");
                    Ok(())
                }
            }
        }
        Cmd::Series { pretty } => {
            let store = open_ro(&cfg)?;
            print_json(&materialize(&store.all()), pretty)
        }
    }
}

fn apply_source(mut cfg: TrackerConfig, source: SourceArgs) -> TrackerConfig {
    if let Some(u) = source.url {
        cfg = cfg.with_source_url(u);
    }
    if let Some(t) = source.timeout_secs {
        cfg = cfg.with_fetch_timeout_secs(t);
    }
    cfg
}

/// Cadence for the background ingest; the daily time is drawn once here.
pub fn cadence_for(cfg: &TrackerConfig) -> Cadence {
    match cfg.interval_secs {
        Some(s) => Cadence::Every(std::time::Duration::from_secs(s)),
        None => Cadence::Daily(DailySchedule::random(
            cfg.schedule_window(),
            &mut rand::thread_rng(),
        )),
    }
}

fn open_writer(cfg: &TrackerConfig) -> Result<HistoryStore> {
    HistoryStore::open_with_fsync(&cfg.history_file, cfg.data_fsync)
        .with_context(|| format!("open history {}", cfg.history_file.display()))
}

fn open_ro(cfg: &TrackerConfig) -> Result<HistoryStore> {
    HistoryStore::open_ro(&cfg.history_file)
        .with_context(|| format!("open history {}", cfg.history_file.display()))
}

fn cmd_serve(cfg: TrackerConfig) -> Result<()> {
    info!("{}", cfg);

    // A corrupt history stops startup here instead of serving an empty one.
    let store = Arc::new(open_writer(&cfg)?);
    let fetcher = Arc::new(
        HttpFetcher::new(cfg.source_url.clone(), cfg.fetch_timeout())
            .context("build page fetcher")?,
    );

    info!("source page: {}", fetcher.url());

    if cfg.initial_ingest {
        ingest_once(&store, fetcher.as_ref());
    }

    let scheduler = {
        let store = store.clone();
        let fetcher = fetcher.clone();
        schedule::spawn(cadence_for(&cfg), move || {
            ingest_once(&store, fetcher.as_ref());
        })
    };

    let server = HttpServer::bind(&cfg.addr())?;
    server.run(store, cfg.http_workers);

    scheduler.stop();
    Ok(())
}

fn cmd_ingest(cfg: TrackerConfig) -> Result<()> {
    let store = open_writer(&cfg)?;
    let fetcher = HttpFetcher::new(cfg.source_url.clone(), cfg.fetch_timeout())
        .context("build page fetcher")?;

    match ingest_once(&store, &fetcher) {
        IngestOutcome::Appended { keys, timestamp } => {
            println!("appended snapshot {} ({} items, {} total)", timestamp, keys, store.len());
            Ok(())
        }
        IngestOutcome::FetchFailed(e) => Err(anyhow!("fetch failed: {}", e)),
        IngestOutcome::PersistFailed(e) => Err(anyhow!("persist failed: {}", e)),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let s = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serialize json")?;
    println!("{}", s);
    Ok(())
}
