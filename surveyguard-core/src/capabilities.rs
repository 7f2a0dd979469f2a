//! Capability ports for the text models the pipeline depends on.
//!
//! Entity detection and sentiment scoring are potentially slow external
//! services, so their traits are async and every call goes through a
//! timeout. Stemming is a pure function and stays synchronous. Each port has
//! a lightweight reference implementation so the crate works out of the box;
//! deployments inject model-backed implementations instead.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer as SnowballAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

/// A tagged byte range of an input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Start byte offset, inclusive
    pub start: usize,
    /// End byte offset, exclusive
    pub end: usize,
    /// Whether the range names an entity that must be censored
    pub is_entity: bool,
}

impl EntitySpan {
    /// Creates a span tagged as an entity.
    pub fn entity(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            is_entity: true,
        }
    }

    /// Returns true if the span shares at least one byte with `start..end`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Sentiment probabilities for one text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

/// The sentiment dimension feedback is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SentimentDimension {
    #[default]
    Positive,
    Neutral,
    Negative,
}

impl SentimentDimension {
    pub fn of(self, scores: &SentimentScores) -> f64 {
        match self {
            Self::Positive => scores.positive,
            Self::Neutral => scores.neutral,
            Self::Negative => scores.negative,
        }
    }
}

impl std::str::FromStr for SentimentDimension {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(SurveyError::configuration(format!(
                "Unknown sentiment dimension '{}'. Expected Positive, Neutral or Negative",
                s
            ))),
        }
    }
}

/// Detects named entities in free text.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    /// Returns tagged spans of `text`. Untagged text is not an entity.
    ///
    /// # Errors
    /// Returns a capability error if the detector is unavailable.
    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Reduces a word to its stem. Must be deterministic.
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Scores the sentiment of free text.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// # Errors
    /// Returns a capability error if the scorer is unavailable.
    async fn score(&self, text: &str) -> Result<SentimentScores>;

    /// Longest input, in characters, the scorer accepts.
    fn max_input_chars(&self) -> Option<usize> {
        None
    }
}

/// The set of capabilities injected into a pipeline.
#[derive(Clone)]
pub struct Capabilities {
    pub entities: Arc<dyn EntityDetector>,
    pub stemmer: Arc<dyn Stemmer>,
    pub sentiment: Arc<dyn SentimentScorer>,
}

impl Capabilities {
    pub fn new(
        entities: Arc<dyn EntityDetector>,
        stemmer: Arc<dyn Stemmer>,
        sentiment: Arc<dyn SentimentScorer>,
    ) -> Self {
        Self {
            entities,
            stemmer,
            sentiment,
        }
    }
}

impl Default for Capabilities {
    /// The built-in pattern, Snowball and lexicon implementations.
    fn default() -> Self {
        Self::new(
            Arc::new(PatternEntityDetector::new()),
            Arc::new(SnowballStemmer::new()),
            Arc::new(LexiconSentimentScorer::new()),
        )
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Runs entity detection under a timeout.
///
/// # Errors
/// Returns a capability error on detector failure or timeout.
pub async fn detect_with_timeout(
    detector: &dyn EntityDetector,
    text: &str,
    timeout: Duration,
) -> Result<Vec<EntitySpan>> {
    tokio::time::timeout(timeout, detector.detect(text))
        .await
        .map_err(|_| SurveyError::capability_timeout("entity detection", timeout))?
}

/// Runs sentiment scoring under a timeout.
///
/// # Errors
/// Returns a capability error on scorer failure or timeout.
pub async fn score_with_timeout(
    scorer: &dyn SentimentScorer,
    text: &str,
    timeout: Duration,
) -> Result<SentimentScores> {
    tokio::time::timeout(timeout, scorer.score(text))
        .await
        .map_err(|_| SurveyError::capability_timeout("sentiment scoring", timeout))?
}

/// Pre-compiled entity patterns.
///
/// Uses `OnceLock` for thread-safe lazy initialization.
struct EntityPatterns {
    /// Whole-match patterns
    direct: Vec<Regex>,
    /// Honorific-prefixed names; only the `name` group is an entity
    titled_name: Regex,
}

impl EntityPatterns {
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<EntityPatterns> = OnceLock::new();
        PATTERNS.get_or_init(Self::compile)
    }

    fn compile() -> Self {
        let direct = vec![
            Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("Invalid email pattern"),
            Regex::new(r"\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]\d{4}\b").expect("Invalid phone pattern"),
            Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").expect("Invalid name pattern"),
        ];
        let titled_name = Regex::new(
            r"\b(?:Dr|Mr|Mrs|Ms|Miss|Nurse|Doctor)\.?\s+(?P<name>[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        )
        .expect("Invalid titled name pattern");

        Self {
            direct,
            titled_name,
        }
    }
}

/// Rule-based entity detector for e-mail addresses, phone numbers and
/// person names.
///
/// Names are recognized as runs of two or more capitalized words, or a
/// capitalized word following an honorific such as "Dr." or "Nurse".
#[derive(Debug, Clone, Default)]
pub struct PatternEntityDetector;

impl PatternEntityDetector {
    pub fn new() -> Self {
        Self
    }

    fn spans(text: &str) -> Vec<EntitySpan> {
        let patterns = EntityPatterns::instance();
        let mut spans: Vec<EntitySpan> = patterns
            .direct
            .iter()
            .flat_map(|pattern| pattern.find_iter(text))
            .map(|m| EntitySpan::entity(m.start(), m.end()))
            .collect();
        spans.extend(
            patterns
                .titled_name
                .captures_iter(text)
                .filter_map(|c| c.name("name"))
                .map(|m| EntitySpan::entity(m.start(), m.end())),
        );
        spans.sort_by_key(|span| (span.start, span.end));
        spans
    }
}

#[async_trait]
impl EntityDetector for PatternEntityDetector {
    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(Self::spans(text))
    }
}

/// Snowball English stemmer.
pub struct SnowballStemmer {
    inner: SnowballAlgorithm,
}

impl SnowballStemmer {
    pub fn new() -> Self {
        Self {
            inner: SnowballAlgorithm::create(Algorithm::English),
        }
    }
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for SnowballStemmer {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(word).into_owned()
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "attentive", "best", "caring", "clean", "comfortable", "compassionate",
    "excellent", "friendly", "good", "great", "happy", "helpful", "kind", "love", "nice",
    "pleasant", "polite", "professional", "quick", "respectful", "thank", "thanks",
    "thorough", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "angry", "awful", "bad", "careless", "confusing", "dirty", "disappointed", "dismissive",
    "horrible", "ignored", "long", "poor", "rude", "slow", "terrible", "uncomfortable",
    "unhappy", "unprofessional", "upset", "wait", "waited", "waiting", "worse", "worst",
    "wrong",
];

/// Polarity-lexicon sentiment scorer.
///
/// Counts lexicon hits and smooths them with one neutral pseudo-count, so
/// text without any known word scores as fully neutral.
#[derive(Debug, Clone)]
pub struct LexiconSentimentScorer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    max_input_chars: Option<usize>,
}

impl LexiconSentimentScorer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            max_input_chars: None,
        }
    }

    /// Builder method to cap the accepted input length.
    pub fn with_max_input_chars(mut self, max_chars: usize) -> Self {
        self.max_input_chars = Some(max_chars);
        self
    }

    fn score_text(&self, text: &str) -> SentimentScores {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|w| !w.is_empty());

        let (mut positive, mut negative) = (0usize, 0usize);
        for word in words {
            if self.positive.contains(word) {
                positive += 1;
            } else if self.negative.contains(word) {
                negative += 1;
            }
        }

        let total = (positive + negative + 1) as f64;
        SentimentScores {
            negative: negative as f64 / total,
            neutral: 1.0 / total,
            positive: positive as f64 / total,
        }
    }
}

impl Default for LexiconSentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentScorer for LexiconSentimentScorer {
    async fn score(&self, text: &str) -> Result<SentimentScores> {
        Ok(self.score_text(text))
    }

    fn max_input_chars(&self) -> Option<usize> {
        self.max_input_chars
    }
}
