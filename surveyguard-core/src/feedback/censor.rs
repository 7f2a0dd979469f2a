//! Entity censoring of free-text feedback.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::capabilities::{EntityDetector, EntitySpan, detect_with_timeout};
use crate::configuration::{Configuration, category};
use crate::error::Result;
use crate::models::{CellValue, Dataset, Diagnostics, StageOutput};

/// Replacement for every token that belongs to an entity.
pub const CENSORED_TOKEN: &str = "_";

struct CensorPatterns {
    token: Regex,
    space_before_closing: Regex,
    space_after_opening: Regex,
}

impl CensorPatterns {
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<CensorPatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| Self {
            token: Regex::new(r"\w+(?:['’]\w+)*|[^\w\s]").expect("Invalid token pattern"),
            space_before_closing: Regex::new(r#"\s([.,?!:;)\]}'"])"#)
                .expect("Invalid closing punctuation pattern"),
            space_after_opening: Regex::new(r#"([(\[{'"]) "#)
                .expect("Invalid opening punctuation pattern"),
        })
    }
}

/// Byte ranges of the words and punctuation marks of `text`.
pub fn tokenize(text: &str) -> Vec<(usize, usize)> {
    CensorPatterns::instance()
        .token
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Censors `text` given the detector's spans.
///
/// Every token overlapping an entity span becomes `_`. Tokens are rejoined
/// with single spaces, then spaces before closing punctuation and after
/// opening brackets and quotes are removed.
pub fn censor_with_spans(text: &str, spans: &[EntitySpan]) -> String {
    let entities: Vec<&EntitySpan> = spans.iter().filter(|s| s.is_entity).collect();
    let joined = tokenize(text)
        .into_iter()
        .map(|(start, end)| {
            if entities.iter().any(|span| span.overlaps(start, end)) {
                CENSORED_TOKEN
            } else {
                &text[start..end]
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let patterns = CensorPatterns::instance();
    let tightened = patterns.space_before_closing.replace_all(&joined, "$1");
    patterns
        .space_after_opening
        .replace_all(&tightened, "$1")
        .into_owned()
}

/// Censors one text through the entity detector.
///
/// # Errors
/// Returns a capability error if detection fails or times out.
pub async fn censor(
    text: &str,
    detector: &dyn EntityDetector,
    timeout: Duration,
) -> Result<String> {
    let spans = detect_with_timeout(detector, text, timeout).await?;
    Ok(censor_with_spans(text, &spans))
}

/// Censors every feedback column of the dataset.
///
/// A response the detector cannot process is withheld: the cell is set to
/// null and an error is recorded for it. The stage itself never fails.
pub async fn censor_feedback(
    mut dataset: Dataset,
    configuration: Configuration,
    detector: &dyn EntityDetector,
    timeout: Duration,
) -> StageOutput {
    let mut diagnostics = Diagnostics::new();
    let mut censored = 0usize;

    for id in configuration.columns_of_category(category::OPEN_FEEDBACK) {
        let Some(column) = dataset.column_mut(id) else {
            continue;
        };
        for (row, cell) in column.cells.iter_mut().enumerate() {
            let Some(text) = cell.render() else {
                continue;
            };
            match censor(&text, detector, timeout).await {
                Ok(clean) => {
                    *cell = CellValue::Text(clean);
                    censored += 1;
                }
                Err(e) => {
                    tracing::warn!("Censoring failed for question {} row {}: {}", id, row, e);
                    *cell = CellValue::Null;
                    diagnostics.error(format!(
                        "Feedback to question {} in row {} could not be censored and was withheld.",
                        id,
                        row + 1
                    ));
                }
            }
        }
    }

    tracing::info!(
        "Censored {} feedback responses ({} withheld)",
        censored,
        diagnostics.errors.len()
    );

    StageOutput {
        dataset,
        configuration,
        diagnostics,
    }
}
