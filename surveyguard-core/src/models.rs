//! Core data models for survey tables.
//!
//! Survey responses are held column-wise: every [`DataColumn`] owns one
//! cell per respondent row. The header may repeat an id until the
//! reconciler has run, which is why columns are kept in an ordered vector
//! rather than a map.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;

/// The placeholder answer for skipped or declined questions.
pub const PREFER_NOT_TO_ANSWER: &str = "Prefer not to answer";

/// The merged answer for suppressed categorical values.
pub const OTHER: &str = "Other";

/// A single survey cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing answer
    #[default]
    Null,
    /// Numeric answer
    Number(f64),
    /// Free text or categorical answer
    Text(String),
}

impl CellValue {
    /// Builds a cell from raw file text.
    ///
    /// Empty or whitespace-only text is null, finite numbers become
    /// [`CellValue::Number`], everything else is kept as text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Creates a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Renders the cell as text, or `None` for null.
    ///
    /// Whole numbers render without a fractional part (`12`, not `12.0`).
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Formats a number the way survey exports show it.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// The value kind of a whole column, inferred once from its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every cell is null
    Empty,
    /// Every non-null cell is a number
    Numeric,
    /// Every non-null cell is text
    Text,
    /// Numbers and text mixed
    Mixed,
}

/// One survey column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataColumn {
    pub id: String,
    pub cells: Vec<CellValue>,
}

impl DataColumn {
    pub fn new(id: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    /// Infers the column kind from its cells.
    pub fn kind(&self) -> ColumnKind {
        let mut has_number = false;
        let mut has_text = false;
        for cell in &self.cells {
            match cell {
                CellValue::Null => {}
                CellValue::Number(_) => has_number = true,
                CellValue::Text(_) => has_text = true,
            }
            if has_number && has_text {
                break;
            }
        }
        match (has_number, has_text) {
            (false, false) => ColumnKind::Empty,
            (true, false) => ColumnKind::Numeric,
            (false, true) => ColumnKind::Text,
            (true, true) => ColumnKind::Mixed,
        }
    }

    /// Distinct non-null text values in first-seen order.
    pub fn distinct_texts(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.cells
            .iter()
            .filter_map(CellValue::as_text)
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Counts cells equal to the given text.
    pub fn count_text(&self, value: &str) -> usize {
        self.cells
            .iter()
            .filter(|c| c.as_text() == Some(value))
            .count()
    }
}

/// Column kinds of a dataset, looked up by id.
///
/// Stages that branch on kinds share one of these instead of walking the
/// cells again per decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnKinds(HashMap<String, ColumnKind>);

impl ColumnKinds {
    /// Infers the kind of every column.
    pub fn of(dataset: &Dataset) -> Self {
        dataset
            .columns()
            .iter()
            .map(|column| (column.id.clone(), column.kind()))
            .collect()
    }

    /// Kind of the column, `Empty` for unknown ids.
    pub fn get(&self, id: &str) -> ColumnKind {
        self.0.get(id).copied().unwrap_or(ColumnKind::Empty)
    }

    pub fn insert(&mut self, id: impl Into<String>, kind: ColumnKind) {
        self.0.insert(id.into(), kind);
    }
}

impl FromIterator<(String, ColumnKind)> for ColumnKinds {
    fn from_iter<I: IntoIterator<Item = (String, ColumnKind)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A facility's survey table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<DataColumn>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from a header and row-major cells.
    ///
    /// Short rows are padded with nulls; extra trailing cells are ignored.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let row_count = rows.len();
        let mut columns: Vec<DataColumn> = header
            .into_iter()
            .map(|id| DataColumn::new(id, Vec::with_capacity(row_count)))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in &mut columns {
                column.cells.push(cells.next().unwrap_or_default());
            }
        }

        Self { columns, row_count }
    }

    /// Builds a dataset from whole columns.
    ///
    /// Columns shorter than the longest one are padded with nulls.
    pub fn from_columns(mut columns: Vec<DataColumn>) -> Self {
        let row_count = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.cells.resize(row_count, CellValue::Null);
        }
        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [DataColumn] {
        &mut self.columns
    }

    /// Column ids in header order, repeats included.
    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c.id == id)
    }

    /// Returns the first column with the given id.
    pub fn column(&self, id: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub(crate) fn column_mut(&mut self, id: &str) -> Option<&mut DataColumn> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// Appends a column, padding or truncating it to the row count.
    pub fn push_column(&mut self, mut column: DataColumn) {
        if self.columns.is_empty() && self.row_count == 0 {
            self.row_count = column.cells.len();
        }
        column.cells.resize(self.row_count, CellValue::Null);
        self.columns.push(column);
    }

    /// Removes every column whose id is listed. Returns how many were removed.
    pub fn drop_columns<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let before = self.columns.len();
        self.columns
            .retain(|c| !ids.iter().any(|id| id.as_ref() == c.id));
        before - self.columns.len()
    }

    /// Returns one respondent row as `(id, value)` pairs.
    pub fn row(&self, index: usize) -> Option<Vec<(&str, &CellValue)>> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.id.as_str(), &c.cells[index]))
                .collect(),
        )
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.row_count).filter(|&i| keep(i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| {
                DataColumn::new(
                    c.id.clone(),
                    indices.iter().map(|&i| c.cells[i].clone()).collect(),
                )
            })
            .collect();
        Self {
            columns,
            row_count: indices.len(),
        }
    }
}

/// Errors and warnings accumulated by a pipeline run.
///
/// Both lists are append-only and are returned to the caller for display.
/// Nothing recorded here aborts a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Data is structurally wrong or unusable in places
    pub errors: Vec<String>,
    /// Data is usable but degraded
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Pipeline error recorded: {}", message);
        self.errors.push(message);
    }

    /// Records a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Pipeline warning recorded: {}", message);
        self.warnings.push(message);
    }

    /// Appends another run's diagnostics, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// What every pipeline stage hands to the next one.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub dataset: Dataset,
    pub configuration: Configuration,
    pub diagnostics: Diagnostics,
}

impl StageOutput {
    /// Wraps the inputs of a stage that recorded nothing.
    pub fn clean(dataset: Dataset, configuration: Configuration) -> Self {
        Self {
            dataset,
            configuration,
            diagnostics: Diagnostics::new(),
        }
    }
}
