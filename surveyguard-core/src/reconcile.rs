//! Structural reconciliation of a dataset against its configuration.
//!
//! The configuration is the source of truth for what a column means; the
//! dataset is the source of truth for which columns exist. Reconciliation
//! cleans both in a fixed order and reports what it changed. It never fails:
//! callers judge data quality from the returned diagnostics.

use std::collections::HashMap;

use crate::configuration::{Configuration, category};
use crate::models::{Dataset, Diagnostics, StageOutput};

/// Suffix of the free-text companions survey tools add to choice questions.
const TEXT_SUFFIX: &str = "_TEXT";

/// Output of [`reconcile`].
pub type Reconciled = StageOutput;

/// Reconciles a raw dataset with its group configuration.
///
/// Steps, in order:
/// 1. drop `info` columns
/// 2. keep only the first column of each one-column category
/// 3. drop every occurrence of ids repeated in the dataset header or the
///    configuration
/// 4. drop `_TEXT` companions unless they are feedback or one-column
/// 5. drop dataset columns the configuration does not describe
/// 6. report one-column categories that are missing
pub fn reconcile(mut dataset: Dataset, mut configuration: Configuration) -> Reconciled {
    let mut diagnostics = Diagnostics::new();

    drop_info_columns(&mut dataset, &mut configuration);
    collapse_one_column_categories(&mut dataset, &mut configuration, &mut diagnostics);
    drop_duplicate_ids(&mut dataset, &mut configuration, &mut diagnostics);
    drop_text_companions(&mut dataset, &mut configuration);
    drop_unconfigured_columns(&mut dataset, &configuration, &mut diagnostics);
    check_required_categories(&configuration, &mut diagnostics);

    tracing::info!(
        "Reconciled group {}: {} columns kept, {} errors, {} warnings",
        configuration.group(),
        dataset.columns().len(),
        diagnostics.errors.len(),
        diagnostics.warnings.len()
    );

    Reconciled {
        dataset,
        configuration,
        diagnostics,
    }
}

fn drop_info_columns(dataset: &mut Dataset, configuration: &mut Configuration) {
    let info: Vec<String> = owned(configuration.columns_of_category(category::INFO));
    if info.is_empty() {
        return;
    }
    dataset.drop_columns(&info);
    configuration.remove_columns(&info);
    tracing::debug!("Dropped {} info columns", info.len());
}

fn collapse_one_column_categories(
    dataset: &mut Dataset,
    configuration: &mut Configuration,
    diagnostics: &mut Diagnostics,
) {
    for category in category::ONE_COLUMN {
        let columns = owned(configuration.columns_of_category(category));
        if columns.len() <= 1 {
            continue;
        }
        diagnostics.warning(format!(
            "{} columns for category {}. Only the first column will be kept.",
            columns.len(),
            category
        ));
        let extra = &columns[1..];
        dataset.drop_columns(extra);
        configuration.remove_columns(extra);
    }
}

fn drop_duplicate_ids(
    dataset: &mut Dataset,
    configuration: &mut Configuration,
    diagnostics: &mut Diagnostics,
) {
    let mut duplicates: Vec<String> = repeated(dataset.column_ids())
        .into_iter()
        .map(str::to_string)
        .collect();
    for id in repeated(configuration.ids()) {
        if !duplicates.iter().any(|known| known == id) {
            duplicates.push(id.to_string());
        }
    }

    for id in &duplicates {
        diagnostics.warning(format!(
            "Duplicate question ID: {}. The question will be deleted.",
            id
        ));
    }
    if !duplicates.is_empty() {
        dataset.drop_columns(&duplicates);
        configuration.remove_columns(&duplicates);
    }
}

/// Ids occurring more than once, in first-seen order.
fn repeated<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for id in ids {
        let count = occurrences.entry(id).or_insert(0);
        if *count == 0 {
            order.push(id);
        }
        *count = count.saturating_add(1);
    }
    order
        .into_iter()
        .filter(|id| occurrences.get(id).copied().unwrap_or(0) > 1)
        .collect()
}

fn drop_text_companions(dataset: &mut Dataset, configuration: &mut Configuration) {
    let companions: Vec<String> = dataset
        .column_ids()
        .filter(|id| id.ends_with(TEXT_SUFFIX))
        // Ids unknown to the configuration are reported by the next step
        .filter(|id| {
            configuration.category_of(id).is_some_and(|category| {
                category != category::OPEN_FEEDBACK && !category::is_one_column(category)
            })
        })
        .map(str::to_string)
        .collect();

    if !companions.is_empty() {
        dataset.drop_columns(&companions);
        configuration.remove_columns(&companions);
        tracing::debug!("Dropped {} _TEXT companion columns", companions.len());
    }
}

fn drop_unconfigured_columns(
    dataset: &mut Dataset,
    configuration: &Configuration,
    diagnostics: &mut Diagnostics,
) {
    let orphans: Vec<String> = dataset
        .column_ids()
        .filter(|id| !configuration.contains(id))
        .map(str::to_string)
        .collect();

    for id in &orphans {
        diagnostics.error(format!(
            "An error occurred with question {}. The column will be deleted.",
            id
        ));
    }
    if !orphans.is_empty() {
        dataset.drop_columns(&orphans);
    }
}

fn check_required_categories(configuration: &Configuration, diagnostics: &mut Diagnostics) {
    for category in category::ONE_COLUMN {
        if !configuration.has_category(category) {
            diagnostics.error(format!("Missing question category: {}.", category));
        }
    }
}

fn owned(ids: Vec<&str>) -> Vec<String> {
    ids.into_iter().map(str::to_string).collect()
}
