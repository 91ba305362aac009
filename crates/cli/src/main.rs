mod echo;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use shelfmark_core::{ArticleRecord, Extractor, ExtractorConfig, FetchConfig, fetch_file, fetch_stdin};
use tracing_subscriber::EnvFilter;
use url::Url;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stand-in page URL for HTML read from stdin without `--url`.
const STDIN_URL: &str = "about:blank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Labelled fields followed by the body text
    Text,
    /// The record as pretty-printed JSON
    Json,
}

/// Preview the article Shelfmark would save for a page
#[derive(Parser, Debug)]
#[command(name = "shelfmark", version, long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Page URL for file or stdin input, used for relative links and as the fallback title
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Primary fetch timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Fallback fetch timeout in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    fallback_timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Skip the readability pass and only scrape
    #[arg(long)]
    fallback_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

enum Input {
    Url(String),
    File(PathBuf),
    Stdin,
}

impl Input {
    fn classify(raw: &str) -> Self {
        if raw == "-" {
            Self::Stdin
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

fn extractor_config(args: &Args) -> ExtractorConfig {
    let fetch = |timeout: u64| {
        let mut config = FetchConfig::with_timeout(timeout);
        if let Some(user_agent) = &args.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    };

    ExtractorConfig {
        primary: fetch(args.timeout),
        fallback: fetch(args.fallback_timeout),
        fallback_only: args.fallback_only,
        ..Default::default()
    }
}

fn file_url(path: &Path) -> anyhow::Result<String> {
    let absolute = std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| anyhow!("Cannot express {} as a file URL", absolute.display()))
}

async fn run(args: &Args) -> anyhow::Result<ArticleRecord> {
    let extractor = Extractor::new(extractor_config(args));

    let (html, page_url) = match Input::classify(&args.input) {
        Input::Url(url) => {
            if args.verbose {
                echo::print_step(1, 2, &format!("Fetching {}", url.bright_white().underline()));
            }
            return extractor.extract(&url).await.context("Failed to extract article");
        }
        Input::File(path) => {
            if args.verbose {
                echo::print_step(1, 2, &format!("Reading file {}", path.display().bright_white()));
            }
            let html = fetch_file(&args.input).context("Failed to read input file")?;
            let page_url = match &args.url {
                Some(url) => url.clone(),
                None => file_url(&path)?,
            };
            (html, page_url)
        }
        Input::Stdin => {
            if args.verbose {
                echo::print_step(1, 2, "Reading from stdin");
            }
            let html = fetch_stdin().context("Failed to read from stdin")?;
            (html, args.url.clone().unwrap_or_else(|| STDIN_URL.to_string()))
        }
    };

    tracing::debug!(input = %args.input, page_url = %page_url, bytes = html.len(), "extracting local html");
    if args.verbose {
        eprintln!("  {} {}\n", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
        echo::print_step(2, 2, "Extracting article");
    }

    extractor.extract_html(&html, &page_url).context("Failed to extract article")
}

fn render_text(record: &ArticleRecord) -> String {
    let mut header = vec![format!("Title: {}", record.title)];
    if let Some(author) = &record.author {
        header.push(format!("Author: {author}"));
    }
    if let Some(date) = &record.published_date {
        header.push(format!("Published: {date}"));
    }
    if let Some(image) = &record.top_image {
        header.push(format!("Image: {image}"));
    }

    format!("{}\n\n{}\n", header.join("\n"), record.content)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "shelfmark_core=debug,shelfmark=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        if args.fallback_only {
            echo::print_warning("Readability pass disabled, scraping only");
        }
        eprintln!();
    }

    let record = run(&args).await?;

    if args.verbose {
        echo::print_record_summary(&record);
    }

    let output = match args.format {
        OutputFormat::Text => render_text(&record),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;
            json.push('\n');
            json
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", output),
    }

    Ok(())
}
