//! researchgap - Research Literature Gap Analysis Pipeline
//!
//! Fetches PubMed-format abstract dumps from S3-style object storage, parses
//! them into structured records, extracts topics, and writes CSV exports
//! plus interactive HTML visualizations.
//!
//! ## Usage
//!
//! ```bash
//! researchgap run my-bucket abstracts.txt --output ./data
//! researchgap parse ./local-dump.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use researchgap::config::{AwsCredentials, PipelineConfig};
use researchgap::parser;
use researchgap::pipeline::Pipeline;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Research Literature Gap Analysis Pipeline
#[derive(Parser)]
#[command(name = "researchgap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline against an object store corpus
    Run {
        /// Bucket holding the corpus object
        bucket: String,

        /// Object key of the citation dump
        key: String,

        /// AWS region of the bucket
        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Custom S3-compatible endpoint (switches to path-style addressing)
        #[arg(long)]
        endpoint: Option<String>,

        /// Output directory for CSVs and visualizations
        #[arg(short, long, default_value = "./data")]
        output: PathBuf,

        /// Number of topics to fit (default: chosen from corpus size)
        #[arg(long)]
        num_topics: Option<usize>,

        /// Smallest cluster kept as a topic; smaller ones become outliers
        #[arg(long, default_value_t = 2)]
        min_topic_size: usize,

        /// Extra stop words, comma-separated
        #[arg(long)]
        stop_words: Option<String>,
    },

    /// Parse a local citation dump and print a summary (no network)
    Parse {
        /// Path to a local PubMed-format text file
        file: PathBuf,

        /// Characters of abstract text to preview per record
        #[arg(long, default_value_t = 120)]
        preview_chars: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Run {
            bucket,
            key,
            region,
            endpoint,
            output,
            num_topics,
            min_topic_size,
            stop_words,
        } => {
            run_pipeline(
                bucket,
                key,
                region,
                endpoint,
                output,
                num_topics,
                min_topic_size,
                stop_words,
            )
            .await
        }
        Commands::Parse {
            file,
            preview_chars,
        } => parse_local(&file, preview_chars),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    bucket: String,
    key: String,
    region: String,
    endpoint: Option<String>,
    output: PathBuf,
    num_topics: Option<usize>,
    min_topic_size: usize,
    stop_words: Option<String>,
) -> Result<()> {
    let mut config = PipelineConfig::new(bucket, key);
    config.region = region;
    config.endpoint = endpoint;
    config.output_dir = output;
    config.topics.num_topics = num_topics;
    config.topics.min_topic_size = min_topic_size;
    if let Some(words) = stop_words {
        config.topics.extra_stop_words = words
            .split(',')
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
    }
    config.credentials = AwsCredentials::from_env();
    if config.credentials.is_none() {
        info!("No AWS credentials in environment, sending unsigned requests");
    }

    let output_dir = config.output_dir.clone();
    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;
    let summary = pipeline.run().await;

    println!("\nPipeline stages:");
    for report in &summary.stages {
        println!("  {:<16} {}", report.stage.to_string(), report.status);
    }
    if summary.succeeded() {
        println!(
            "\nParsed {} records ({} segments skipped), {} topics ({} outliers)",
            summary.records_parsed,
            summary.segments_skipped,
            summary.topics_found,
            summary.outlier_count
        );
        println!("Results saved to {}", output_dir.display());
        Ok(())
    } else {
        let (stage, reason) = summary
            .failed_stage()
            .unwrap_or((researchgap::pipeline::Stage::Fetch, "unknown failure"));
        anyhow::bail!("Pipeline failed at {} stage: {}", stage, reason)
    }
}

fn parse_local(file: &Path, preview_chars: usize) -> Result<()> {
    let raw_text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let outcome = parser::parse_corpus(&raw_text);
    println!(
        "Parsed {} records from {} segments ({} skipped)\n",
        outcome.records.len(),
        outcome.segments_detected(),
        outcome.skipped.len()
    );

    for record in &outcome.records {
        println!("[{}] {}", record.ordinal, record.title);
        if !record.authors.is_empty() {
            println!("     Authors: {}", record.authors.join(", "));
        }
        if let Some(year) = record.year {
            match &record.journal {
                Some(journal) => println!("     {} ({})", journal, year),
                None => println!("     ({})", year),
            }
        }
        for (kind, value) in &record.identifiers {
            println!("     {}: {}", kind.as_str(), value);
        }
        let preview: String = record.free_text.chars().take(preview_chars).collect();
        let ellipsis = if record.free_text.chars().count() > preview_chars {
            "..."
        } else {
            ""
        };
        println!("     {}{}\n", preview, ellipsis);
    }

    for skip in &outcome.skipped {
        println!("Skipped segment {}: {}", skip.ordinal, skip.reason);
    }
    Ok(())
}
