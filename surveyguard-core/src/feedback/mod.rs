//! Free-text feedback processing.
//!
//! Feedback is censored once while the pipeline runs (see [`censor`]); the
//! read API here only ever sees censored text. Word statistics use stemming,
//! so "waited" and "waiting" count as one word.

pub mod censor;
pub mod sentiment;
pub mod stopwords;
pub mod words;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use censor::{censor_feedback, censor_with_spans};
pub use sentiment::SentimentRun;
pub use words::{WordCount, WordIndex};

use crate::capabilities::Stemmer;
use crate::configuration::{Configuration, category};
use crate::models::Dataset;

/// One censored feedback response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// Question the response answers
    pub column_id: String,
    /// Zero-based respondent row
    pub row: usize,
    pub censored: String,
}

/// Every censored response of a facility plus its word statistics.
pub struct FeedbackCorpus {
    items: Vec<FeedbackItem>,
    words: WordIndex,
    stemmer: Arc<dyn Stemmer>,
}

impl FeedbackCorpus {
    /// Collects the responses of every feedback column.
    ///
    /// Columns are taken in configuration order and rows top to bottom;
    /// empty responses are skipped.
    pub fn collect(
        dataset: &Dataset,
        configuration: &Configuration,
        stemmer: Arc<dyn Stemmer>,
    ) -> Self {
        let mut items = Vec::new();
        for id in configuration.columns_of_category(category::OPEN_FEEDBACK) {
            let Some(column) = dataset.column(id) else {
                continue;
            };
            items.extend(column.cells.iter().enumerate().filter_map(|(row, cell)| {
                cell.render().map(|censored| FeedbackItem {
                    column_id: id.to_string(),
                    row,
                    censored,
                })
            }));
        }

        let words = WordIndex::build(items.iter().map(|i| i.censored.as_str()), stemmer.as_ref());
        Self {
            items,
            words,
            stemmer,
        }
    }

    pub fn items(&self) -> &[FeedbackItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Representative words with the number of responses using them.
    pub fn word_counts(&self) -> &[WordCount] {
        self.words.word_counts()
    }

    pub fn top_words(&self, n: usize) -> Vec<&str> {
        self.words.top_words(n)
    }

    pub fn word_count(&self, word: &str) -> usize {
        self.words.word_count(word)
    }

    /// Responses containing any word with the same stem as `word`.
    pub fn feedbacks_with_word(&self, word: &str) -> Vec<&FeedbackItem> {
        self.words
            .rows_with_word(word, self.stemmer.as_ref())
            .into_iter()
            .filter_map(|index| self.items.get(index))
            .collect()
    }
}

impl std::fmt::Debug for FeedbackCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackCorpus")
            .field("items", &self.items.len())
            .field("words", &self.words.word_counts().len())
            .finish_non_exhaustive()
    }
}
