use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod features;
mod history;
mod models;
mod rate_limit;
mod sink;


use crate::client::SpotifyClient;
use crate::config::load_config;
use crate::features::{DEFAULT_PROGRESS_EVERY, Pipeline};
use crate::history::HistoryClient;

#[derive(Parser)]
#[command(name = "album-features")]
#[command(about = "Export Spotify audio features for a 1001 Albums Generator history")]
#[command(version)]
struct Args {
    /// Output CSV file path
    #[arg(short = 'o', long = "output", default_value = "data/spotify_data_1001.csv")]
    output: PathBuf,

    /// 1001 Albums Generator project id, overrides PROJECT_ID
    #[arg(short = 'p', long = "project-id")]
    project_id: Option<String>,

    /// Append logs to this file instead of writing them to stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Log progress every N albums (0 disables)
    #[arg(long = "progress-every", default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: usize,

    /// Only process the first N albums of the history
    #[arg(short = 'l', long = "limit")]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    if let Err(e) = run(args) {
        error!("Run aborted: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config()?;
    let project_id = args
        .project_id
        .or_else(|| config.project_id.clone())
        .ok_or_else(|| anyhow!("No project id given: pass --project-id or set PROJECT_ID"))?;

    let catalog = SpotifyClient::connect(&config).context("Catalog authentication failed")?;
    info!("Authenticated with catalog API");

    let history = HistoryClient::new(&config.history_url);
    let mut albums = history.fetch_albums(&project_id)?;
    info!("Fetched {} albums from project '{}'", albums.len(), project_id);

    if let Some(limit) = args.limit {
        albums.truncate(limit);
        info!("Limiting run to the first {} albums", albums.len());
    }

    let table = Pipeline::new(catalog)
        .with_progress_every(args.progress_every)
        .run(&albums);

    if table.is_empty() {
        warn!("No albums could be enriched; writing header only");
    }
    sink::write_csv(&args.output, &table)?;

    let stats = table.stats();
    info!(
        "Done: {} rows written ({} without features), {} albums skipped",
        table.len(),
        stats.degraded,
        stats.skipped
    );
    Ok(())
}

fn init_logging(log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
