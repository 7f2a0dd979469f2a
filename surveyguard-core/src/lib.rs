//! Core data structures and processing for SurveyGuard.
//!
//! This crate turns one facility's raw survey responses into a dataset that
//! is safe to show on an operator dashboard, and answers the dashboard's
//! analytics queries over it.
//!
//! # Privacy Guarantees
//! - No published category or numeric range covers fewer than `min_k`
//!   respondents
//! - Feedback is censored before it is stored, counted or scored
//! - Logs and errors carry ids and counts only, never respondent values
//!
//! # Architecture
//! The core library follows these patterns:
//! - Ownership-passing stages returning their dataset plus diagnostics
//! - Ports for entity detection, stemming and sentiment scoring, each called
//!   under a timeout
//! - An explicit, injected survey cache instead of process-wide state
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use surveyguard_core::{
//!     Capabilities, CsvSurveySource, FacilityPipeline, PipelineConfig, SurveyCache,
//! };
//!
//! # async fn run() -> surveyguard_core::Result<()> {
//! let config = PipelineConfig::default();
//! let cache = SurveyCache::new(Arc::new(CsvSurveySource::new("data")), config.cache_ttl);
//! let pipeline =
//!     FacilityPipeline::build(&cache, "CA", "allfacilities", Capabilities::default(), config)
//!         .await?;
//! println!("{} surveys", pipeline.analytics().total_surveys());
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod anonymize;
pub mod capabilities;
pub mod catalog;
pub mod configuration;
pub mod error;
pub mod feedback;
pub mod loader;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod settings;
pub mod standardize;

// Re-export commonly used types
pub use analytics::{Analytics, AnswerCount, HuddleSumup, Overview};
pub use capabilities::{
    Capabilities, EntityDetector, EntitySpan, LexiconSentimentScorer, PatternEntityDetector,
    SentimentDimension, SentimentScorer, SentimentScores, SnowballStemmer, Stemmer,
};
pub use configuration::{Column, Configuration, RawColumn};
pub use error::{Result, SurveyError};
pub use feedback::{FeedbackCorpus, FeedbackItem, WordCount};
pub use loader::{CsvSurveySource, Facility, GroupCode, RawSurvey, SurveyCache, SurveySource};
pub use models::{CellValue, ColumnKinds, DataColumn, Dataset, Diagnostics, StageOutput};
pub use pipeline::{FacilityPipeline, FacilityReport, ReportOptions};
pub use settings::{ConfigValidationError, PipelineConfig};
