use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{Detection, ExtractionOutcome, TimeRange, TIMESTAMP_FORMAT};
use crate::infra::ConfigManager;
use crate::llm::{DetectionExtractor, LlmClient, Provider, ProviderConfig};
use crate::logs;
use crate::prompts;

#[derive(Parser)]
#[command(name = "sigscout")]
#[command(about = "Extract malware detections from antivirus logs with a local LLM", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a log file or glob pattern (e.g. "*.log")
    #[arg(long)]
    pub log: String,

    /// Start of the time window (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub start: String,

    /// End of the time window (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub end: String,

    /// LLM provider to query (default from config, else ollama)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model name (default from config, else qwen:8b)
    #[arg(long)]
    pub model: Option<String>,

    /// Send all matched files in a single request
    #[arg(long)]
    pub batch: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum ProviderArg {
    Ollama,
    Lmstudio,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Ollama => Provider::Ollama,
            ProviderArg::Lmstudio => Provider::LmStudio,
        }
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}

async fn execute(cli: Cli) -> Result<()> {
    let range = parse_range(&cli.start, &cli.end)?;

    let user = ConfigManager::load()?.get();
    let provider = cli.provider.map(Provider::from).unwrap_or(user.provider);
    let config = ProviderConfig {
        provider,
        base_url: user.base_url_for(provider).to_string(),
        model: cli.model.unwrap_or_else(|| user.model.clone()),
        timeout: Duration::from_secs(user.timeout_secs),
        temperature: user.temperature,
    };

    let files = logs::expand_log_pattern(&cli.log)?;

    if range.is_empty() {
        eprintln!(
            "{} start is after end; the window matches nothing",
            "⚠️".yellow()
        );
    }

    let extractor = DetectionExtractor::new(LlmClient::new(config));

    if cli.batch {
        match run_batch(&extractor, &files, &range).await? {
            ExtractionOutcome::Parsed(detections) => print_detections(&detections)?,
            ExtractionOutcome::Unparsed(raw) => report_unparsed_to_stdout(&raw),
        }
    } else {
        let detections = run_per_file(&extractor, &files, &range).await?;
        print_detections(&detections)?;
    }

    Ok(())
}

fn parse_range(start: &str, end: &str) -> Result<TimeRange> {
    let start = NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid --start '{start}', expected YYYY-MM-DD HH:MM:SS"))?;
    let end = NaiveDateTime::parse_from_str(end, TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid --end '{end}', expected YYYY-MM-DD HH:MM:SS"))?;
    Ok(TimeRange::new(start, end))
}

/// One LLM request per file; detections are tagged with their source
/// file and aggregated into a single JSON array.
async fn run_per_file(
    extractor: &DetectionExtractor,
    files: &[PathBuf],
    range: &TimeRange,
) -> Result<Vec<Detection>> {
    let debug = std::env::var("SIGSCOUT_DEBUG").is_ok();
    let mut all_detections = Vec::new();

    for path in files {
        eprintln!("{} {}", "Processing".bold(), path.display());

        let lines = logs::filter_log_lines(path, range)?;
        if lines.is_empty() {
            eprintln!("  no log lines in the requested window");
            continue;
        }
        if debug {
            eprintln!("  {} line(s) in window", lines.len());
        }

        eprintln!(
            "  querying {} ({})...",
            extractor.client().provider().name(),
            extractor.client().model()
        );

        match extractor.extract(&lines.join("\n")).await? {
            ExtractionOutcome::Parsed(detections) => {
                eprintln!("  {} {} detection(s)", "✓".green(), detections.len());
                let source = path.display().to_string();
                all_detections
                    .extend(detections.into_iter().map(|d| d.with_source(source.clone())));
            }
            ExtractionOutcome::Unparsed(raw) => {
                eprintln!(
                    "{} model reply for {} was not valid JSON; raw reply follows",
                    "⚠️".yellow(),
                    path.display()
                );
                eprintln!("{raw}");
            }
        }
    }

    Ok(all_detections)
}

/// All files folded into one request, separated by file headers when
/// more than one file matched.
async fn run_batch(
    extractor: &DetectionExtractor,
    files: &[PathBuf],
    range: &TimeRange,
) -> Result<ExtractionOutcome> {
    let mut sections = Vec::new();

    for path in files {
        eprintln!("{} {}", "Processing".bold(), path.display());

        let lines = logs::filter_log_lines(path, range)?;
        if lines.is_empty() {
            eprintln!("  no log lines in the requested window");
            continue;
        }

        if files.len() > 1 {
            sections.push(prompts::file_header(path));
        }
        sections.extend(lines);
    }

    if sections.is_empty() {
        // Nothing in the window: don't contact the provider at all
        return Ok(ExtractionOutcome::Parsed(Vec::new()));
    }

    eprintln!(
        "querying {} ({})...",
        extractor.client().provider().name(),
        extractor.client().model()
    );
    extractor.extract(&sections.join("\n")).await
}

fn print_detections(detections: &[Detection]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(detections)?);
    Ok(())
}

fn report_unparsed_to_stdout(raw: &str) {
    eprintln!(
        "{} model reply was not valid JSON; printing it as-is",
        "⚠️".yellow()
    );
    println!("{raw}");
}
