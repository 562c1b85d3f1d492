use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paper_harvest::ai::ChatSummarizer;
use paper_harvest::config::{default_config_path, load_config, write_default_config, Config};
use paper_harvest::models::{ApiSource, Outcome, Paper, RecentWindow, SearchQuery};
use paper_harvest::pipeline::{Pipeline, SearchOptions};
use paper_harvest::store::StoredPaper;
use paper_harvest::utils::papers_table;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Harvest - search scholarly APIs, acquire full texts and keep a local library
#[derive(Parser, Debug)]
#[command(name = "paper-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search Crossref, PubMed and PMC, download papers and keep notes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the download directory
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON
    Json,
}

/// Search targets
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    #[value(name = "crossref")]
    Crossref,
    #[value(name = "pubmed")]
    Pubmed,
    /// PubMed restricted to recent publications, newest first
    #[value(name = "pubmed-recent")]
    PubmedRecent,
    #[value(name = "pmc")]
    Pmc,
}

impl Source {
    fn api_source(self) -> ApiSource {
        match self {
            Source::Crossref => ApiSource::Crossref,
            Source::Pubmed | Source::PubmedRecent => ApiSource::PubMed,
            Source::Pmc => ApiSource::Pmc,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Recent {
    Week,
    Month,
}

impl From<Recent> for RecentWindow {
    fn from(recent: Recent) -> Self {
        match recent {
            Recent::Week => RecentWindow::PastWeek,
            Recent::Month => RecentWindow::PastMonth,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search one API for papers
    #[command(alias = "s")]
    Search {
        /// Keywords
        keywords: String,

        #[arg(long, short, value_enum, default_value_t = Source::Crossref)]
        source: Source,

        /// First publication year (inclusive, requires --to)
        #[arg(long)]
        from: Option<i32>,

        /// Last publication year (inclusive, requires --from)
        #[arg(long)]
        to: Option<i32>,

        /// Window for pubmed-recent
        #[arg(long, value_enum, default_value_t = Recent::Week)]
        recent: Recent,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 10)]
        max: usize,

        /// Save results to the local library
        #[arg(long)]
        save: bool,

        /// Collapse near-duplicate records
        #[arg(long)]
        dedup: bool,
    },

    /// Acquire a PDF or abstract for saved papers
    #[command(alias = "dl")]
    Download {
        /// Paper identifier
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        /// Every saved paper not yet downloaded
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// List saved papers
    List {
        /// crossref, pubmed or pmc
        #[arg(long, short)]
        source: Option<ApiSource>,
    },

    /// Search saved papers by title, abstract, authors and notes
    Find { query: String },

    /// Set the notes of a saved paper
    Notes { id: String, text: String },

    /// Summarize downloaded papers with the configured AI model
    Analyze {
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with the default values
    Init {
        /// Target file (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_harvest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.download_dir {
        config.downloads.directory = dir.clone();
    }

    match cli.command {
        Commands::Config { action } => run_config(action, &config),
        command => run(command, &config, cli.output).await,
    }
}

async fn run(command: Commands, config: &Config, output: OutputFormat) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;

    match command {
        Commands::Search {
            keywords,
            source,
            from,
            to,
            recent,
            max,
            save,
            dedup,
        } => {
            let mut query = SearchQuery::new(keywords).max_results(max);
            query.start_year = from;
            query.end_year = to;
            if source == Source::PubmedRecent {
                query = query.recent(recent.into());
            }

            let papers = pipeline
                .search(source.api_source(), &query, SearchOptions { dedup, save })
                .await?;
            print_papers(&papers, output)?;
            if save {
                eprintln!("Saved {} papers", papers.len());
            }
        }

        Commands::Download { id, all } => {
            let results = if all {
                pipeline.download_pending().await?
            } else {
                let Some(id) = id else {
                    bail!("a paper id or --all is required");
                };
                let outcome = pipeline.download(&id).await?;
                vec![(id, outcome)]
            };
            for (id, outcome) in &results {
                println!("{}: {}", id, describe(outcome.as_ref()));
            }
        }

        Commands::List { source } => {
            let stored = match source {
                Some(source) => pipeline.store()?.get_papers_by_source(source)?,
                None => pipeline.store()?.get_all_papers()?,
            };
            print_stored(stored, output)?;
        }

        Commands::Find { query } => {
            print_stored(pipeline.store()?.search(&query)?, output)?;
        }

        Commands::Notes { id, text } => {
            pipeline.store()?.update_notes(&id, &text)?;
            println!("Notes updated for {}", id);
        }

        Commands::Analyze { id, all } => {
            let summarizer = ChatSummarizer::from_config(&config.ai, &config.http)?;
            if all {
                for (id, analysis) in pipeline.analyze_all(&summarizer).await? {
                    println!("== {} ==\n{}\n", id, analysis);
                }
            } else if let Some(id) = id {
                println!("{}", pipeline.analyze(&summarizer, &id).await?);
            }
        }

        Commands::Config { action } => run_config(action, config)?,
    }
    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Init { path, force } => {
            let Some(path) = path.or_else(default_config_path) else {
                bail!("no config directory on this platform; pass --path");
            };
            write_default_config(&Config::default(), &path, force)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }
    Ok(())
}

fn describe(outcome: Option<&Outcome>) -> String {
    match outcome {
        Some(outcome) => outcome.to_string(),
        None => "nothing acquired".to_string(),
    }
}

fn print_papers(papers: &[Paper], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(papers)?),
        OutputFormat::Table if papers.is_empty() => println!("No papers found"),
        OutputFormat::Table => println!("{}", papers_table(papers)),
    }
    Ok(())
}

fn print_stored(stored: Vec<StoredPaper>, output: OutputFormat) -> Result<()> {
    let papers: Vec<Paper> = stored.into_iter().map(|s| s.paper).collect();
    print_papers(&papers, output)
}
