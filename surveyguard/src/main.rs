//! Survey anonymization and dashboard analytics tool.
//!
//! This binary loads facility survey files, runs the anonymization pipeline
//! and prints or saves the figures the operator dashboard shows.
//!
//! # Privacy Guarantees
//! - Every category and numeric range shown covers at least `--min-k`
//!   respondents
//! - Feedback is censored before it is counted, scored or written
//! - Logs carry ids and counts only

mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use surveyguard_core::{
    Capabilities, CsvSurveySource, FacilityPipeline, PipelineConfig, ReportOptions,
    SentimentDimension, SurveyCache, logging::init_logging, settings::DEFAULT_MIN_K,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "surveyguard")]
#[command(about = "Survey anonymization and dashboard analytics tool")]
#[command(version)]
#[command(long_about = "
SurveyGuard - k-anonymized survey analytics

Survey files are read from a data directory, one `<STATE>.csv` per facility
group, `;` separated, with three header rows (column ids, question texts,
categories).

PRIVACY FEATURES:
- Rare demographic answers are merged into \"Other\"
- Numeric answers are published as ranges covering at least k respondents
- Names, e-mail addresses and phone numbers are censored in feedback

EXAMPLES:
  surveyguard groups --data-dir ./data
  surveyguard facilities --data-dir ./data --group CA
  surveyguard report --data-dir ./data --group CA --facility allfacilities -o ca.json
  surveyguard question --data-dir ./data --group CA --facility allfacilities --id Q12
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List groups with survey data
    Groups(DataArgs),
    /// List the facilities of a group
    Facilities(GroupArgs),
    /// Run the pipeline and write the facility report
    Report(ReportArgs),
    /// Show the answer tally of one question
    Question(QuestionArgs),
}

#[derive(Args)]
pub struct DataArgs {
    /// Directory holding the group survey files
    #[arg(long, env = "SURVEYGUARD_DATA_DIR", help = "Directory with <STATE>.csv survey files")]
    pub data_dir: PathBuf,
}

#[derive(Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Facility group code
    #[arg(short, long, help = "Two-letter state code of the facility group")]
    pub group: String,
}

#[derive(Args)]
pub struct FacilityArgs {
    #[command(flatten)]
    pub group: GroupArgs,

    /// Facility slug
    #[arg(short, long, help = "Facility slug, as listed by the facilities command")]
    pub facility: String,

    /// Anonymity threshold
    #[arg(long, default_value_t = DEFAULT_MIN_K, help = "Minimum respondents per published category")]
    pub min_k: usize,

    /// Capability timeout (ms)
    #[arg(long, default_value = "10000", help = "Timeout in milliseconds for each censoring or scoring call")]
    pub timeout: u64,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub facility: FacilityArgs,

    /// Output file path
    #[arg(short, long, help = "Output file path (.json or .json.zst); prints to stdout if omitted")]
    pub output: Option<PathBuf>,

    /// Enable compression
    #[arg(long, help = "Compress output using Zstandard (.json.zst)")]
    pub compress: bool,

    /// Number of top feedback words
    #[arg(long, default_value = "20", help = "Number of most frequent feedback words to include")]
    pub top_words: usize,

    /// Sentiment dimension
    #[arg(long, help = "Include feedback ordered by sentiment (positive, neutral, negative)")]
    pub sentiment: Option<SentimentDimension>,
}

#[derive(Args)]
pub struct QuestionArgs {
    #[command(flatten)]
    pub facility: FacilityArgs,

    /// Question id
    #[arg(long, help = "Column id of the question")]
    pub id: String,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Groups(args) => list_groups(args).await,
        Command::Facilities(args) => list_facilities(args).await,
        Command::Report(args) => write_report(args).await,
        Command::Question(args) => show_question(args).await,
    }
}

fn open_cache(data_dir: &Path, config: &PipelineConfig) -> SurveyCache {
    SurveyCache::new(Arc::new(CsvSurveySource::new(data_dir)), config.cache_ttl)
}

fn pipeline_config(args: &FacilityArgs) -> PipelineConfig {
    PipelineConfig::new()
        .with_min_k(args.min_k)
        .with_capability_timeout(Duration::from_millis(args.timeout))
}

async fn build_pipeline(args: &FacilityArgs) -> Result<FacilityPipeline> {
    let config = pipeline_config(args);
    let cache = open_cache(&args.group.data.data_dir, &config);
    let pipeline = FacilityPipeline::build(
        &cache,
        &args.group.group,
        &args.facility,
        Capabilities::default(),
        config,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to process facility '{}' in group {}",
            args.facility, args.group.group
        )
    })?;

    for warning in pipeline.warnings() {
        tracing::warn!("{}", warning);
    }
    for error in pipeline.errors() {
        tracing::error!("{}", error);
    }
    Ok(pipeline)
}

/// Lists groups that have a survey file
async fn list_groups(args: &DataArgs) -> Result<()> {
    let config = PipelineConfig::default();
    let cache = open_cache(&args.data_dir, &config);
    let groups = cache
        .groups_with_data()
        .await
        .context("Failed to read survey files")?;

    info!("Found {} groups with data", groups.len());
    for group in groups {
        println!("{}\t{}", group, group.group_name());
    }
    Ok(())
}

/// Lists the facilities of one group with their slugs
async fn list_facilities(args: &GroupArgs) -> Result<()> {
    let config = PipelineConfig::default();
    let cache = open_cache(&args.data.data_dir, &config);
    let facilities = cache
        .facilities(&args.group, &config.all_facilities_label)
        .await?;

    for facility in facilities {
        println!("{}\t{}", facility.slug, facility.display_name);
    }
    Ok(())
}

/// Runs the pipeline and writes the facility report
async fn write_report(args: &ReportArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.facility).await?;
    let options = ReportOptions {
        top_words: args.top_words,
        sentiment: args.sentiment,
    };
    let report = pipeline.report(&options).await;

    match &args.output {
        Some(path) => {
            output::save_report(&report, path, args.compress).await?;
            info!("✓ Report written to {}", path.display());
        }
        None => println!("{}", output::to_json(&report)?),
    }
    Ok(())
}

/// Prints the answer tally of one question
async fn show_question(args: &QuestionArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.facility).await?;
    let analytics = pipeline.analytics();
    let Some(answers) = analytics.multiple_choice(&args.id) else {
        anyhow::bail!(
            "Question {} is not a multiple-choice question of this facility",
            args.id
        );
    };

    if let Some(text) = analytics.question_text(&args.id) {
        println!("{}", text);
    }
    for answer in answers {
        println!("{}\t{}", answer.count, answer.answer);
    }
    Ok(())
}
