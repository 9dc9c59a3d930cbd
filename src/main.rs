mod cli;
mod progress;

use anyhow::Result;
use cli::{Cli, Commands, FormatArg};
use collector::CollectorConfig;
use exporter::{ExportFormat, Exporter};
use extractor::PromoRecord;
use progress::ScrapeProgress;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let progress_enabled = !cli.quiet;
    let command = cli.command.unwrap_or_default();

    // The whole pipeline blocks on browser calls, so keep it off the runtime
    // workers.
    tokio::task::spawn_blocking(move || dispatch(command, progress_enabled)).await?
}

fn dispatch(command: Commands, progress_enabled: bool) -> Result<()> {
    match command {
        Commands::Run {
            listing_url,
            base_url,
            pause,
            max_stalls,
            headed,
            limit,
            output,
            format,
            preview,
        } => {
            let config = collector_config(&listing_url, &base_url, pause, max_stalls, headed)?;
            let mut links = collector::collect_links(&config)?;
            println!("Links found: {}", links.len());
            if let Some(limit) = limit {
                links.truncate(limit);
            }

            let records = scrape_batch(&links, !headed, progress_enabled)?;
            finish_batch(&records, preview, output, format)
        }

        Commands::Links {
            listing_url,
            base_url,
            pause,
            max_stalls,
            headed,
            json,
        } => {
            let config = collector_config(&listing_url, &base_url, pause, max_stalls, headed)?;
            let links = collector::collect_links(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else {
                for link in &links {
                    println!("{link}");
                }
            }
            Ok(())
        }

        Commands::Scrape {
            urls,
            headed,
            output,
            format,
            preview,
        } => {
            let records = scrape_batch(&urls, !headed, progress_enabled)?;
            finish_batch(&records, preview, output, format)
        }
    }
}

fn collector_config(
    listing_url: &str,
    base_url: &str,
    pause: u64,
    max_stalls: u32,
    headed: bool,
) -> Result<CollectorConfig> {
    let mut config = CollectorConfig::new(listing_url, base_url)?;
    config.pause = Duration::from_secs(pause);
    config.max_stalls = max_stalls;
    config.headless = !headed;
    Ok(config)
}

fn scrape_batch(
    urls: &[String],
    headless: bool,
    progress_enabled: bool,
) -> Result<Vec<PromoRecord>> {
    let mut progress = ScrapeProgress::new(progress_enabled);
    let records = extractor::build_batch(urls, headless, &mut progress)?;
    Ok(records)
}

fn finish_batch(
    records: &[PromoRecord],
    preview: usize,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
) -> Result<()> {
    print!("{}", exporter::render_preview(records, preview));
    export_records(records, output, format)
}

fn export_records(
    records: &[PromoRecord],
    output: Option<PathBuf>,
    format: Option<FormatArg>,
) -> Result<()> {
    let explicit = format.map(ExportFormat::from);
    let path = match (output, explicit) {
        (Some(path), _) => path,
        (None, Some(format)) => default_output_path(format),
        (None, None) => return Ok(()),
    };

    let format = exporter::resolve_format(&path, explicit)?;
    Exporter::new().export(records, &path, format)?;
    info!("Table exported to {}", path.display());
    Ok(())
}

fn default_output_path(format: ExportFormat) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let ext = match format {
        ExportFormat::Csv => "csv",
        ExportFormat::Json => "json",
    };
    PathBuf::from(format!("promos_{stamp}.{ext}"))
}
