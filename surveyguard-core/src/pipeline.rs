//! Facility pipeline orchestration.
//!
//! A [`FacilityPipeline`] is built once per facility request. Building runs
//! every preprocessing stage in order; afterwards the pipeline is a read-only
//! view over the finalized dataset with analytics, feedback queries and a
//! serializable report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::Instrument;
use uuid::Uuid;

use crate::analytics::{Analytics, AnswerCount, Overview};
use crate::anonymize::{anonymize, assign_standard_lists};
use crate::capabilities::{Capabilities, SentimentDimension};
use crate::configuration::{Configuration, category};
use crate::error::{Result, SurveyError};
use crate::feedback::{FeedbackCorpus, FeedbackItem, SentimentRun, WordCount, censor_feedback};
use crate::loader::{Facility, GroupCode, SurveyCache};
use crate::models::{Dataset, Diagnostics};
use crate::reconcile::reconcile;
use crate::settings::PipelineConfig;
use crate::standardize::{finalize, preprocess_dates, standardize_answers};

/// Feedback in sentiment order plus the items that could not be scored.
#[derive(Debug, Clone)]
pub struct SentimentOrdered<'a> {
    pub items: Vec<&'a FeedbackItem>,
    pub errors: &'a [String],
}

/// A finalized facility dataset with its read API.
pub struct FacilityPipeline {
    run_id: Uuid,
    group: GroupCode,
    facility: Facility,
    dataset: Dataset,
    configuration: Configuration,
    diagnostics: Diagnostics,
    feedback: FeedbackCorpus,
    capabilities: Capabilities,
    config: PipelineConfig,
    sentiment: OnceCell<SentimentRun>,
}

impl FacilityPipeline {
    /// Resolves the facility through the cache and runs every stage.
    ///
    /// # Errors
    /// Returns `Configuration` for invalid settings, `InvalidGroup` or
    /// `FacilityNotFound` when the facility cannot be resolved, and any error
    /// the survey source reports. Data problems never fail the build; they
    /// are collected as diagnostics.
    pub async fn build(
        cache: &SurveyCache,
        group: &str,
        facility: &str,
        capabilities: Capabilities,
        config: PipelineConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SurveyError::configuration(e.to_string()))?;

        let (group, facility, dataset, configuration) = cache
            .resolve(group, facility, &config.all_facilities_label)
            .await?;
        Ok(Self::from_parts(group, facility, dataset, configuration, capabilities, config).await)
    }

    /// Runs every stage over an already resolved facility dataset.
    pub async fn from_parts(
        group: GroupCode,
        facility: Facility,
        dataset: Dataset,
        configuration: Configuration,
        capabilities: Capabilities,
        config: PipelineConfig,
    ) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "facility_pipeline",
            %run_id,
            group = %group,
            facility = %facility.slug
        );

        async move {
            let rows = dataset.row_count();
            let mut diagnostics = Diagnostics::new();

            let stage = reconcile(dataset, configuration);
            diagnostics.extend(stage.diagnostics);

            let stage = preprocess_dates(stage.dataset, stage.configuration);
            diagnostics.extend(stage.diagnostics);

            let (dataset, kinds) = standardize_answers(stage.dataset);
            let configuration = assign_standard_lists(&dataset, &kinds, stage.configuration);

            let stage = anonymize(dataset, configuration, &kinds, config.min_k);
            diagnostics.extend(stage.diagnostics);

            let stage = censor_feedback(
                stage.dataset,
                stage.configuration,
                capabilities.entities.as_ref(),
                config.capability_timeout,
            )
            .await;
            diagnostics.extend(stage.diagnostics);

            let configuration = stage.configuration;
            let dataset = finalize(stage.dataset, &configuration);
            let feedback =
                FeedbackCorpus::collect(&dataset, &configuration, Arc::clone(&capabilities.stemmer));

            tracing::info!(
                "Pipeline finished: {} rows, {} columns, {} feedback responses, {} errors, {} warnings",
                rows,
                dataset.columns().len(),
                feedback.len(),
                diagnostics.errors.len(),
                diagnostics.warnings.len()
            );

            Self {
                run_id,
                group,
                facility,
                dataset,
                configuration,
                diagnostics,
                feedback,
                capabilities,
                config,
                sentiment: OnceCell::new(),
            }
        }
        .instrument(span)
        .await
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn group(&self) -> &GroupCode {
        &self.group
    }

    pub fn facility(&self) -> &Facility {
        &self.facility
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn errors(&self) -> &[String] {
        &self.diagnostics.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.diagnostics.warnings
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(&self.dataset, &self.configuration)
    }

    pub fn feedback(&self) -> &FeedbackCorpus {
        &self.feedback
    }

    /// Feedback ordered by a sentiment dimension, highest first.
    ///
    /// Scores are computed on first use and reused for every dimension.
    pub async fn sentiment_ordered(&self, dimension: SentimentDimension) -> SentimentOrdered<'_> {
        let run = self
            .sentiment
            .get_or_init(|| {
                SentimentRun::score_all(
                    self.feedback.items(),
                    self.capabilities.sentiment.as_ref(),
                    self.config.capability_timeout,
                    self.config.sentiment_max_chars,
                )
            })
            .await;
        SentimentOrdered {
            items: run.ordered(self.feedback.items(), dimension),
            errors: run.errors(),
        }
    }

    /// Builds the serializable facility report.
    pub async fn report(&self, options: &ReportOptions) -> FacilityReport {
        let analytics = self.analytics();
        let questions = self
            .configuration
            .columns()
            .iter()
            .filter_map(|column| {
                let answers = analytics.multiple_choice(&column.id)?;
                Some(QuestionReport {
                    id: column.id.clone(),
                    text: column.text.clone(),
                    category: column.category.clone(),
                    answers,
                })
            })
            .collect();

        let sentiment = match options.sentiment {
            Some(dimension) => {
                let ordered = self.sentiment_ordered(dimension).await;
                Some(SentimentReport {
                    dimension,
                    feedback: ordered.items.into_iter().cloned().collect(),
                    errors: ordered.errors.to_vec(),
                })
            }
            None => None,
        };

        FacilityReport {
            run_id: self.run_id,
            group: self.group.clone(),
            group_name: self.group.group_name().to_string(),
            facility: self.facility.clone(),
            generated_at: Utc::now(),
            overview: analytics.overview(),
            errors: self.diagnostics.errors.clone(),
            warnings: self.diagnostics.warnings.clone(),
            questions,
            feedback_responses: self.feedback.len(),
            top_words: self
                .feedback
                .word_counts()
                .iter()
                .take(options.top_words)
                .cloned()
                .collect(),
            sentiment,
        }
    }

    /// Ids of the multiple-choice questions, in configuration order.
    pub fn question_ids(&self) -> Vec<&str> {
        self.configuration
            .columns()
            .iter()
            .filter(|c| c.category != category::OPEN_FEEDBACK && c.category != category::INFO)
            .map(|c| c.id.as_str())
            .collect()
    }
}

impl std::fmt::Debug for FacilityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityPipeline")
            .field("run_id", &self.run_id)
            .field("group", &self.group)
            .field("facility", &self.facility.slug)
            .field("rows", &self.dataset.row_count())
            .finish_non_exhaustive()
    }
}

/// What to include in a [`FacilityReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Number of most frequent feedback words to list
    pub top_words: usize,
    /// Include feedback ordered by this sentiment dimension
    pub sentiment: Option<SentimentDimension>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_words: 20,
            sentiment: None,
        }
    }
}

/// Answer tally for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub id: String,
    pub text: String,
    pub category: String,
    pub answers: Vec<AnswerCount>,
}

/// Feedback ordered by one sentiment dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub dimension: SentimentDimension,
    pub feedback: Vec<FeedbackItem>,
    pub errors: Vec<String>,
}

/// Everything the dashboard shows for a facility, safe to publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityReport {
    pub run_id: Uuid,
    pub group: GroupCode,
    pub group_name: String,
    pub facility: Facility,
    pub generated_at: DateTime<Utc>,
    pub overview: Overview,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub questions: Vec<QuestionReport>,
    pub feedback_responses: usize,
    pub top_words: Vec<WordCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentReport>,
}
