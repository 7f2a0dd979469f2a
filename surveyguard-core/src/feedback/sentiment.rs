//! Sentiment ordering of feedback.

use std::time::Duration;

use super::FeedbackItem;
use crate::capabilities::{SentimentDimension, SentimentScorer, SentimentScores, score_with_timeout};

/// Returns at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

/// Sentiment scores for a list of feedback items.
///
/// Items are referenced by their position in the scored list. Items whose
/// scoring failed keep their position in `failed` and an error message.
#[derive(Debug, Clone, Default)]
pub struct SentimentRun {
    scored: Vec<(usize, SentimentScores)>,
    failed: Vec<usize>,
    errors: Vec<String>,
}

impl SentimentRun {
    /// Scores every item, one capability call each.
    ///
    /// Input longer than `max_chars` (or the scorer's own limit, if lower)
    /// is truncated first.
    pub async fn score_all(
        items: &[FeedbackItem],
        scorer: &dyn SentimentScorer,
        timeout: Duration,
        max_chars: usize,
    ) -> Self {
        let limit = scorer
            .max_input_chars()
            .map_or(max_chars, |own| own.min(max_chars));

        let mut run = Self::default();
        for (index, item) in items.iter().enumerate() {
            let text = truncate_chars(&item.censored, limit);
            match score_with_timeout(scorer, text, timeout).await {
                Ok(scores) => run.scored.push((index, scores)),
                Err(e) => {
                    tracing::warn!(
                        "Sentiment scoring failed for question {} row {}: {}",
                        item.column_id,
                        item.row,
                        e
                    );
                    run.failed.push(index);
                    run.errors.push(format!(
                        "Sentiment of feedback to question {} in row {} could not be scored.",
                        item.column_id,
                        item.row + 1
                    ));
                }
            }
        }

        tracing::info!(
            "Scored sentiment of {} feedback responses ({} failed)",
            run.scored.len(),
            run.failed.len()
        );
        run
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Scores of the item at `index`, if it was scored.
    pub fn scores_for(&self, index: usize) -> Option<SentimentScores> {
        self.scored
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, scores)| *scores)
    }

    /// Items sorted by the given dimension, highest first.
    ///
    /// The sort is stable. Items that could not be scored follow the scored
    /// ones in their original order.
    pub fn ordered<'a>(
        &self,
        items: &'a [FeedbackItem],
        dimension: SentimentDimension,
    ) -> Vec<&'a FeedbackItem> {
        let mut scored = self.scored.clone();
        scored.sort_by(|(_, a), (_, b)| dimension.of(b).total_cmp(&dimension.of(a)));
        scored
            .iter()
            .map(|(index, _)| *index)
            .chain(self.failed.iter().copied())
            .filter_map(|index| items.get(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SurveyError};
    use async_trait::async_trait;

    /// Scores text by a leading digit, failing on text starting with "!".
    struct DigitScorer;

    #[async_trait]
    impl SentimentScorer for DigitScorer {
        async fn score(&self, text: &str) -> Result<SentimentScores> {
            if text.starts_with('!') {
                return Err(SurveyError::capability("sentiment scoring", "rejected"));
            }
            let positive = text
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .map_or(0.0, |d| f64::from(d) / 10.0);
            Ok(SentimentScores {
                negative: 1.0 - positive,
                neutral: 0.0,
                positive,
            })
        }

        fn max_input_chars(&self) -> Option<usize> {
            Some(4)
        }
    }

    fn item(row: usize, text: &str) -> FeedbackItem {
        FeedbackItem {
            column_id: "Q9".to_string(),
            row,
            censored: text.to_string(),
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn test_ordering_is_stable_and_failures_trail() {
        let items = vec![
            item(0, "2 fine"),
            item(1, "! broken"),
            item(2, "9 great"),
            item(3, "2 also fine"),
        ];
        let run = SentimentRun::score_all(&items, &DigitScorer, Duration::from_secs(1), 100).await;

        let rows: Vec<usize> = run
            .ordered(&items, SentimentDimension::Positive)
            .iter()
            .map(|i| i.row)
            .collect();
        assert_eq!(rows, vec![2, 0, 3, 1]);

        let rows: Vec<usize> = run
            .ordered(&items, SentimentDimension::Negative)
            .iter()
            .map(|i| i.row)
            .collect();
        assert_eq!(rows, vec![0, 3, 2, 1]);

        assert_eq!(
            run.errors(),
            ["Sentiment of feedback to question Q9 in row 2 could not be scored."]
        );
        assert!(run.scores_for(1).is_none());
        assert_eq!(run.scores_for(2).map(|s| s.positive), Some(0.9));
    }
}
