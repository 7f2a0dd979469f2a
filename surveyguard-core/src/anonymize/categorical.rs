//! Categorical suppression.

use std::collections::HashMap;

use crate::models::{CellValue, DataColumn, OTHER, PREFER_NOT_TO_ANSWER};

/// Rewrites every rare answer of a text column to "Other".
///
/// An answer is rare when it occurs fewer than `min_k` times. Null and
/// "Prefer not to answer" are never merged. The merged "Other" group is not
/// re-checked against the threshold. Returns the distinct answers merged,
/// in first-seen order.
pub fn suppress_rare_values(column: &mut DataColumn, min_k: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in column.cells.iter().filter_map(CellValue::as_text) {
        *counts.entry(value).or_insert(0) += 1;
    }

    let rare: Vec<String> = column
        .distinct_texts()
        .into_iter()
        .filter(|value| *value != PREFER_NOT_TO_ANSWER && *value != OTHER)
        .filter(|value| counts.get(value).copied().unwrap_or(0) < min_k)
        .map(str::to_string)
        .collect();

    if rare.is_empty() {
        return rare;
    }
    for cell in &mut column.cells {
        if cell.as_text().is_some_and(|value| rare.iter().any(|r| r == value)) {
            *cell = CellValue::text(OTHER);
        }
    }
    rare
}
