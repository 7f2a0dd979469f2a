//! Value standardization stages.
//!
//! These run around anonymization: dates are normalized before anything
//! else looks at them, common answer spellings are unified before counting,
//! and the final coercion renders every remaining cell as display text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::configuration::{Configuration, RawColumn, category};
use crate::models::{
    CellValue, ColumnKind, ColumnKinds, DataColumn, Dataset, Diagnostics, OTHER, PREFER_NOT_TO_ANSWER,
    StageOutput, format_number,
};

/// Id and question text of the derived month column.
pub const YEAR_MONTH: &str = "Year-Month";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a survey timestamp into its calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        })
}

/// Normalizes the date column and derives the `Year-Month` column.
///
/// Dates are rewritten as `YYYY-MM-DD` text. Values that cannot be parsed
/// become null and are reported once per column. Without a configured date
/// column the stage does nothing; reconciliation has already reported it.
pub fn preprocess_dates(mut dataset: Dataset, mut configuration: Configuration) -> StageOutput {
    let mut diagnostics = Diagnostics::new();

    let Some(date_id) = configuration
        .first_of_category(category::DATE)
        .map(str::to_string)
    else {
        return StageOutput::clean(dataset, configuration);
    };
    let Some(column) = dataset.column_mut(&date_id) else {
        return StageOutput::clean(dataset, configuration);
    };

    let mut unparseable = 0usize;
    let mut months = Vec::with_capacity(column.cells.len());
    for cell in &mut column.cells {
        let parsed = match &*cell {
            CellValue::Null => None,
            other => {
                let raw = other.render().unwrap_or_default();
                let parsed = parse_date(&raw);
                if parsed.is_none() {
                    unparseable += 1;
                }
                parsed
            }
        };
        *cell = parsed.map_or(CellValue::Null, |date| {
            CellValue::text(date.format("%Y-%m-%d").to_string())
        });
        months.push(parsed.map_or(CellValue::Null, |date| {
            CellValue::text(date.format("%Y-%m").to_string())
        }));
    }

    if unparseable > 0 {
        diagnostics.warning(format!(
            "{} dates in column {} could not be read and were left empty.",
            unparseable, date_id
        ));
    }

    dataset.drop_columns(&[YEAR_MONTH]);
    dataset.push_column(DataColumn::new(YEAR_MONTH, months));
    configuration.remove_columns(&[YEAR_MONTH]);
    configuration.add_column(RawColumn::new(YEAR_MONTH, YEAR_MONTH, category::YEAR_MONTH));

    tracing::debug!("Normalized date column {}", date_id);

    StageOutput {
        dataset,
        configuration,
        diagnostics,
    }
}

/// Unifies answer spellings and coerces mixed columns to text.
///
/// Returns the column kinds after coercion alongside the dataset, so later
/// stages need not infer them again.
pub fn standardize_answers(mut dataset: Dataset) -> (Dataset, ColumnKinds) {
    let mut kinds = ColumnKinds::default();
    for column in dataset.columns_mut() {
        let mut kind = column.kind();
        let mixed = kind == ColumnKind::Mixed;
        if mixed {
            tracing::debug!("Column {} mixes numbers and text; coercing to text", column.id);
            kind = ColumnKind::Text;
        }
        kinds.insert(column.id.clone(), kind);
        for cell in &mut column.cells {
            let replacement = match &*cell {
                CellValue::Text(value) if value == "Prefers not to answer" => {
                    CellValue::text(PREFER_NOT_TO_ANSWER)
                }
                CellValue::Text(value) if value == "other" => CellValue::text(OTHER),
                CellValue::Number(n) if mixed => CellValue::Text(format_number(*n)),
                _ => continue,
            };
            *cell = replacement;
        }
    }
    (dataset, kinds)
}

/// Renders every cell as display text.
///
/// Numbers become text and missing answers become "Prefer not to answer",
/// except in feedback and date columns where null keeps meaning "nothing
/// was written".
pub fn finalize(mut dataset: Dataset, configuration: &Configuration) -> Dataset {
    for column in dataset.columns_mut() {
        let keeps_null = configuration.category_of(&column.id).is_some_and(|c| {
            c == category::OPEN_FEEDBACK || c == category::DATE || c == category::YEAR_MONTH
        });
        for cell in &mut column.cells {
            let replacement = match &*cell {
                CellValue::Number(n) => CellValue::Text(format_number(*n)),
                CellValue::Null if !keeps_null => CellValue::text(PREFER_NOT_TO_ANSWER),
                _ => continue,
            };
            *cell = replacement;
        }
    }
    dataset
}
