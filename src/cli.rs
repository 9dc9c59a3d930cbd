use clap::{Parser, Subcommand, ValueEnum};
use exporter::ExportFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "promo-scraper")]
#[command(version)]
#[command(about = "Scrape MODO promotion pages into a table", long_about = None)]
pub struct Cli {
    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect every promo link, scrape each page and preview the table
    Run {
        /// Listing page holding the promo cards
        #[arg(long, env = "PROMO_LISTING_URL", default_value = collector::LISTING_URL)]
        listing_url: String,

        /// Origin that relative promo links resolve against
        #[arg(long, env = "PROMO_BASE_URL", default_value = collector::BASE_URL)]
        base_url: String,

        /// Seconds to pause before each collection attempt
        #[arg(short, long, default_value = "1")]
        pause: u64,

        /// Consecutive no-growth collection rounds tolerated before stopping
        #[arg(long, default_value = "2")]
        max_stalls: u32,

        /// Run with a visible browser window
        #[arg(long)]
        headed: bool,

        /// Scrape only the first N collected links
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Write the table to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format; inferred from the file extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Rows shown in the terminal preview
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Collect and print the promo links without scraping them
    Links {
        /// Listing page holding the promo cards
        #[arg(long, env = "PROMO_LISTING_URL", default_value = collector::LISTING_URL)]
        listing_url: String,

        /// Origin that relative promo links resolve against
        #[arg(long, env = "PROMO_BASE_URL", default_value = collector::BASE_URL)]
        base_url: String,

        /// Seconds to pause before each collection attempt
        #[arg(short, long, default_value = "1")]
        pause: u64,

        /// Consecutive no-growth collection rounds tolerated before stopping
        #[arg(long, default_value = "2")]
        max_stalls: u32,

        /// Run with a visible browser window
        #[arg(long)]
        headed: bool,

        /// Print links as a JSON array instead of one per line
        #[arg(long)]
        json: bool,
    },

    /// Scrape the given promo URLs directly, in the given order
    Scrape {
        /// Promo detail-page URLs
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Run with a visible browser window
        #[arg(long)]
        headed: bool,

        /// Write the table to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format; inferred from the file extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Rows shown in the terminal preview
        #[arg(long, default_value = "5")]
        preview: usize,
    },
}

impl Default for Commands {
    /// The bare invocation: canonical collect-then-scrape run.
    fn default() -> Self {
        Commands::Run {
            listing_url: collector::LISTING_URL.to_string(),
            base_url: collector::BASE_URL.to_string(),
            pause: 1,
            max_stalls: 2,
            headed: false,
            limit: None,
            output: None,
            format: None,
            preview: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
