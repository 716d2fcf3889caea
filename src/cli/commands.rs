//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use crate::models::SourceType;

#[derive(Parser)]
#[command(name = "content-research")]
#[command(about = "Content Research Pipeline - research a topic and generate an analysis report")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: configured level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Research a topic and generate a comprehensive analysis
    Research {
        /// The topic or question to research
        query: String,
        /// Output directory for results (default: results/<query>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: OutputFormat,
        /// Maximum number of search results per source
        #[arg(short, long)]
        max_results: Option<usize>,
        /// Skip image search
        #[arg(long)]
        no_images: bool,
        /// Skip video search
        #[arg(long)]
        no_videos: bool,
        /// Skip news search
        #[arg(long)]
        no_news: bool,
    },
    /// Perform a quick search without analysis
    Search {
        /// The search query
        query: String,
        /// Number of results to return
        #[arg(short = 'n', long, default_value = "5")]
        num_results: usize,
        /// Type of search to perform
        #[arg(short = 't', long = "type", value_enum, default_value = "web")]
        search_type: SearchKind,
    },
    /// Manage the result cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,
        /// Clear the cache
        #[arg(long)]
        clear: bool,
    },
    /// Show current configuration
    Config,
    /// Start the web API server
    Serve {
        /// Host to bind to (default: api.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (default: api.port)
        #[arg(long)]
        port: Option<u16>,
        /// Enable CORS regardless of api.enable_cors
        #[arg(long)]
        cors: bool,
    },
    /// Validate the configuration and dependencies
    Validate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Html,
    Json,
    Both,
}

impl OutputFormat {
    pub fn writes_html(&self) -> bool {
        matches!(self, OutputFormat::Html | OutputFormat::Both)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchKind {
    Web,
    News,
    Images,
    Videos,
}

impl From<SearchKind> for SourceType {
    fn from(kind: SearchKind) -> Self {
        match kind {
            SearchKind::Web => SourceType::Web,
            SearchKind::News => SourceType::News,
            SearchKind::Images => SourceType::Image,
            SearchKind::Videos => SourceType::Video,
        }
    }
}
