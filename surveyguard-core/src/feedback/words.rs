//! Stemmed word statistics over feedback.
//!
//! Words sharing a stem are counted together under the surface form seen
//! first. A row counts towards a word when its stemmed text contains the
//! stem anywhere, so a short stem also matches longer words that start with
//! it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::stopwords::is_stopword;
use crate::capabilities::Stemmer;

/// A representative word and the number of responses mentioning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Lowercases, strips everything but `a-z`, and drops stopwords.
pub fn preprocess(text: &str) -> String {
    let letters: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
        .collect();
    letters
        .split_whitespace()
        .filter(|word| !is_stopword(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word statistics over a fixed set of responses.
#[derive(Debug, Clone, Default)]
pub struct WordIndex {
    stemmed_rows: Vec<String>,
    counts: Vec<WordCount>,
}

impl WordIndex {
    /// Builds the index. Row order is the order of `texts`.
    pub fn build<'a, I>(texts: I, stemmer: &dyn Stemmer) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut stemmed_rows = Vec::new();
        let mut stems: Vec<(String, String)> = Vec::new();
        let mut known: HashSet<String> = HashSet::new();

        for text in texts {
            let cleaned = preprocess(text);
            let mut stemmed = Vec::new();
            for word in cleaned.split_whitespace() {
                let stem = stemmer.stem(word);
                if known.insert(stem.clone()) {
                    stems.push((stem.clone(), word.to_string()));
                }
                stemmed.push(stem);
            }
            stemmed_rows.push(stemmed.join(" "));
        }

        let mut counts: Vec<WordCount> = stems
            .into_iter()
            .map(|(stem, word)| WordCount {
                count: stemmed_rows.iter().filter(|row| row.contains(&stem)).count(),
                word,
            })
            .collect();
        // Stable: ties keep first-seen order
        counts.sort_by(|a, b| b.count.cmp(&a.count));

        tracing::debug!(
            "Indexed {} responses into {} distinct stems",
            stemmed_rows.len(),
            counts.len()
        );

        Self {
            stemmed_rows,
            counts,
        }
    }

    /// Every representative word with its count, most frequent first.
    pub fn word_counts(&self) -> &[WordCount] {
        &self.counts
    }

    pub fn top_words(&self, n: usize) -> Vec<&str> {
        self.counts.iter().take(n).map(|c| c.word.as_str()).collect()
    }

    /// Count for a representative word, 0 if it is not one.
    pub fn word_count(&self, word: &str) -> usize {
        self.counts
            .iter()
            .find(|c| c.word == word)
            .map_or(0, |c| c.count)
    }

    /// Row positions whose stemmed text contains the stem of `word`.
    pub fn rows_with_word(&self, word: &str, stemmer: &dyn Stemmer) -> Vec<usize> {
        let stem = stemmer.stem(&word.to_lowercase());
        self.stemmed_rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains(&stem))
            .map(|(i, _)| i)
            .collect()
    }
}
