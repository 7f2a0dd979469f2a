//! k-anonymity enforcement.
//!
//! Two techniques keep small groups of respondents from standing out:
//! - `categorical`: rare text answers of demographic questions merge into "Other"
//! - `numeric`: numeric answers are published as ranges sized by [`BucketPlan`]
//!
//! Canonical answer lists are assigned here as well, since they must be
//! computed from the answers before suppression rewrites any of them.

pub mod categorical;
pub mod numeric;

pub use categorical::suppress_rare_values;
pub use numeric::BucketPlan;

use crate::catalog;
use crate::configuration::{Configuration, category};
use crate::models::{CellValue, ColumnKind, ColumnKinds, Dataset, Diagnostics, StageOutput};

/// Assigns canonical answer lists to multiple-choice columns.
///
/// Applies to text columns outside the one-column categories and free-text
/// feedback that hold more than one distinct value, null counting as a value
/// of its own. The first canonical list containing every observed answer
/// becomes the column's answer list.
pub fn assign_standard_lists(
    dataset: &Dataset,
    kinds: &ColumnKinds,
    mut configuration: Configuration,
) -> Configuration {
    for column in dataset.columns() {
        let Some(column_category) = configuration.category_of(&column.id) else {
            continue;
        };
        if category::is_one_column(column_category) || column_category == category::OPEN_FEEDBACK
        {
            continue;
        }
        if matches!(kinds.get(&column.id), ColumnKind::Numeric | ColumnKind::Empty) {
            continue;
        }

        let answers = column.distinct_texts();
        let has_null = column.cells.iter().any(CellValue::is_null);
        if answers.len() + usize::from(has_null) <= 1 {
            continue;
        }

        if let Some(list) = catalog::standard_list_for(&answers) {
            let list = list.iter().map(|a| a.to_string()).collect();
            configuration.set_answer_list(&column.id, list);
            tracing::debug!("Assigned canonical answer list to {}", column.id);
        }
    }
    configuration
}

/// Enforces the anonymity threshold on every eligible column.
///
/// Text columns of the demographic categories have rare answers merged into
/// "Other". Every numeric column, demographic or not, is rewritten to range
/// labels and receives the ranges as its answer list.
///
/// `kinds` must describe `dataset` as passed in.
pub fn anonymize(
    mut dataset: Dataset,
    mut configuration: Configuration,
    kinds: &ColumnKinds,
    min_k: usize,
) -> StageOutput {
    let mut diagnostics = Diagnostics::new();

    let demographic: Vec<String> = configuration
        .columns_of_categories(&category::ANONYMIZED)
        .into_iter()
        .map(str::to_string)
        .collect();
    for id in &demographic {
        let Some(column) = dataset.column_mut(id) else {
            continue;
        };
        if kinds.get(id) != ColumnKind::Text {
            continue;
        }
        let merged = suppress_rare_values(column, min_k);
        if !merged.is_empty() {
            diagnostics.warning(format!(
                "{} rare answers to question {} were merged into Other.",
                merged.len(),
                id
            ));
        }
    }

    let mut bucketed = 0usize;
    for column in dataset.columns_mut() {
        if kinds.get(&column.id) != ColumnKind::Numeric {
            continue;
        }
        let values: Vec<f64> = column.cells.iter().filter_map(CellValue::as_number).collect();
        let Some(plan) = BucketPlan::compute(&values, min_k) else {
            continue;
        };
        if !plan.meets_threshold() {
            diagnostics.warning(format!(
                "Answers to question {} are too sparse to group safely. A single range is used.",
                column.id
            ));
        }

        for cell in &mut column.cells {
            let label = match cell.as_number() {
                Some(value) => plan.label_for(value),
                None => plan.label_for_missing().to_string(),
            };
            *cell = CellValue::Text(label);
        }
        tracing::debug!(
            "Bucketed {} with width {} and cutoff {:?}",
            column.id,
            plan.width,
            plan.cutoff
        );
        configuration.set_answer_list(&column.id, plan.labels);
        bucketed = bucketed.saturating_add(1);
    }

    tracing::info!(
        "Anonymized {} demographic columns and {} numeric columns (min_k = {})",
        demographic.len(),
        bucketed,
        min_k
    );

    StageOutput {
        dataset,
        configuration,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::RawColumn;
    use crate::models::{DataColumn, OTHER, PREFER_NOT_TO_ANSWER};

    fn repeat(value: &str, n: usize) -> Vec<CellValue> {
        vec![CellValue::text(value); n]
    }

    #[test]
    fn test_anonymize_race_scenario() {
        let mut cells = repeat("White", 10);
        cells.extend(repeat("Asian", 3));
        cells.extend(repeat("Other", 2));
        let dataset = Dataset::from_columns(vec![DataColumn::new("race", cells)]);
        let configuration =
            Configuration::new("CA", vec![RawColumn::new("race", "Race", category::RACE)]);

        let kinds = ColumnKinds::of(&dataset);
        let output = anonymize(dataset, configuration, &kinds, 5);
        let race = output.dataset.column("race").unwrap();
        assert_eq!(race.count_text("White"), 10);
        assert_eq!(race.count_text(OTHER), 5);
        assert_eq!(race.distinct_texts(), vec!["White", "Other"]);
        assert_eq!(output.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn test_numeric_columns_become_ranges() {
        let mut cells: Vec<CellValue> = [5.0, 5.0, 5.0, 5.0, 5.0, 12.0, 12.0, 12.0, 12.0, 12.0, 40.0]
            .into_iter()
            .map(CellValue::from)
            .collect();
        cells.push(CellValue::Null);
        let dataset = Dataset::from_columns(vec![DataColumn::new("age", cells)]);
        let configuration =
            Configuration::new("CA", vec![RawColumn::new("age", "Age", category::AGE)]);

        let kinds = ColumnKinds::of(&dataset);
        let output = anonymize(dataset, configuration, &kinds, 5);
        let age = output.dataset.column("age").unwrap();
        assert_eq!(age.count_text("5-6"), 5);
        assert_eq!(age.count_text("6+"), 6);
        assert_eq!(age.count_text(PREFER_NOT_TO_ANSWER), 1);

        let answers = output.configuration.answer_list("age");
        assert_eq!(answers.last().map(String::as_str), Some(PREFER_NOT_TO_ANSWER));
        assert!(answers.iter().any(|a| a == "6+"));
        assert!(output.diagnostics.is_clean());
    }

    #[test]
    fn test_column_kinds_are_taken_as_given() {
        let cells: Vec<CellValue> = (0..6).map(|i| CellValue::from(f64::from(i))).collect();
        let dataset = Dataset::from_columns(vec![DataColumn::new("age", cells)]);
        let configuration =
            Configuration::new("CA", vec![RawColumn::new("age", "Age", category::AGE)]);

        // A column absent from the kinds is treated as empty and left alone
        let output = anonymize(dataset.clone(), configuration.clone(), &ColumnKinds::default(), 2);
        assert_eq!(output.dataset, dataset);
        assert!(output.configuration.answer_list("age").is_empty());

        let output = anonymize(dataset.clone(), configuration, &ColumnKinds::of(&dataset), 2);
        assert_eq!(output.dataset.column("age").unwrap().count_text("0-2"), 2);
    }

    #[test]
    fn test_non_demographic_text_is_untouched() {
        let mut cells = repeat("Yes", 10);
        cells.extend(repeat("No", 1));
        let dataset = Dataset::from_columns(vec![DataColumn::new("Q1", cells)]);
        let configuration = Configuration::new("CA", vec![RawColumn::new("Q1", "Q", "likert")]);

        let kinds = ColumnKinds::of(&dataset);
        let output = anonymize(dataset, configuration, &kinds, 5);
        assert_eq!(output.dataset.column("Q1").unwrap().count_text("No"), 1);
    }

    #[test]
    fn test_assign_standard_lists() {
        let dataset = Dataset::from_columns(vec![
            DataColumn::new("Q1", vec!["Yes".into(), "No".into()]),
            DataColumn::new("Q2", vec!["Yes".into(), CellValue::Null]),
            DataColumn::new("Q3", vec!["Yes".into(), "Yes".into()]),
            DataColumn::new("Q4", vec!["Yes".into(), "Maybe".into()]),
            DataColumn::new("huddle", vec!["Yes".into(), "No".into()]),
            DataColumn::new("Q5", vec![1.0.into(), 2.0.into()]),
        ]);
        let configuration = Configuration::new(
            "CA",
            vec![
                RawColumn::new("Q1", "Q1", "likert"),
                RawColumn::new("Q2", "Q2", "likert"),
                RawColumn::new("Q3", "Q3", "likert"),
                RawColumn::new("Q4", "Q4", "likert"),
                RawColumn::new("huddle", "Huddle", category::HUDDLE),
                RawColumn::new("Q5", "Q5", "likert"),
            ],
        );

        let kinds = ColumnKinds::of(&dataset);
        let configuration = assign_standard_lists(&dataset, &kinds, configuration);
        let yes_no = ["Yes", "No", "Not sure", "Prefer not to answer"];
        assert_eq!(configuration.answer_list("Q1"), yes_no);
        // Null counts as a second value
        assert_eq!(configuration.answer_list("Q2"), yes_no);
        assert!(configuration.answer_list("Q3").is_empty());
        assert!(configuration.answer_list("Q4").is_empty());
        assert!(configuration.answer_list("huddle").is_empty());
        assert!(configuration.answer_list("Q5").is_empty());
    }
}
