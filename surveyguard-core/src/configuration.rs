//! Column metadata for a facility group.
//!
//! A [`Configuration`] describes every survey column of a group: its
//! question text, its category and, once the pipeline has run, the ordered
//! list of answers the column may take. The raw form comes from the survey
//! file's header rows and is shared by every facility in the group.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Well-known column categories.
pub mod category {
    /// Identification and bookkeeping columns, never analyzed
    pub const INFO: &str = "info";
    /// Whether the respondent took part in a huddle
    pub const HUDDLE: &str = "huddle";
    pub const AGE: &str = "age";
    pub const INSURANCE: &str = "insurance";
    pub const RACE: &str = "race";
    pub const EDUCATION: &str = "education";
    /// Survey completion date
    pub const DATE: &str = "date";
    /// Facility name
    pub const SITE_NAME: &str = "site_name";
    /// Generic demographic questions
    pub const DEMOGRAPHICS: &str = "demographics";
    /// Free-text answers
    pub const OPEN_FEEDBACK: &str = "open_feedback";
    /// Derived `YYYY-MM` column added during date preprocessing
    pub const YEAR_MONTH: &str = "Year-Month";

    /// Categories expected exactly once per facility group.
    pub const ONE_COLUMN: [&str; 7] = [HUDDLE, AGE, INSURANCE, RACE, EDUCATION, DATE, SITE_NAME];

    /// Categories subject to categorical suppression.
    pub const ANONYMIZED: [&str; 5] = [DEMOGRAPHICS, AGE, RACE, INSURANCE, EDUCATION];

    /// Returns true for categories expected exactly once per group.
    pub fn is_one_column(category: &str) -> bool {
        ONE_COLUMN.contains(&category)
    }
}

/// Raw column metadata as read from a survey file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub id: String,
    pub text: String,
    pub category: String,
}

impl RawColumn {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
        }
    }
}

/// Column metadata with its derived answer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub text: String,
    pub category: String,
    /// Ordered answers the column may take; empty until derived
    pub answer_list: Vec<String>,
}

impl From<RawColumn> for Column {
    fn from(raw: RawColumn) -> Self {
        Self {
            id: raw.id,
            text: raw.text,
            category: raw.category,
            answer_list: Vec::new(),
        }
    }
}

/// Column metadata for one facility group.
///
/// Lookups by id return the first matching column. Ids are only guaranteed
/// unique after reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    group: String,
    columns: Vec<Column>,
}

impl Configuration {
    /// Builds a configuration from raw header metadata.
    pub fn new(group: impl Into<String>, raw: Vec<RawColumn>) -> Self {
        Self {
            group: group.into(),
            columns: raw.into_iter().map(Column::from).collect(),
        }
    }

    /// The facility group this configuration belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.column(id).is_some()
    }

    /// Ids of every column in the given category, in configuration order.
    pub fn columns_of_category(&self, category: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.category == category)
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Ids of every column in any of the given categories, grouped by
    /// category in the order the categories are listed.
    pub fn columns_of_categories(&self, categories: &[&str]) -> Vec<&str> {
        categories
            .iter()
            .flat_map(|category| self.columns_of_category(category))
            .collect()
    }

    /// The first column of a category, for one-column categories.
    pub fn first_of_category(&self, category: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.id.as_str())
    }

    pub fn category_of(&self, id: &str) -> Option<&str> {
        self.column(id).map(|c| c.category.as_str())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.id.as_str()).collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .map(|c| c.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.columns.iter().any(|c| c.category == category)
    }

    pub fn question_text(&self, id: &str) -> Option<&str> {
        self.column(id).map(|c| c.text.as_str())
    }

    /// The derived answer list, empty if none was assigned.
    pub fn answer_list(&self, id: &str) -> &[String] {
        self.column(id).map_or(&[], |c| c.answer_list.as_slice())
    }

    /// Removes every column whose id is listed, including repeats.
    pub fn remove_columns<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let before = self.columns.len();
        self.columns
            .retain(|c| !ids.iter().any(|id| id.as_ref() == c.id));
        before - self.columns.len()
    }

    /// Sets the answer list of a column. Returns false for unknown ids.
    pub fn set_answer_list(&mut self, id: &str, answers: Vec<String>) -> bool {
        match self.columns.iter_mut().find(|c| c.id == id) {
            Some(column) => {
                column.answer_list = answers;
                true
            }
            None => false,
        }
    }

    /// Appends a column unless one with the same id exists.
    pub fn add_column(&mut self, raw: RawColumn) -> bool {
        if self.contains(&raw.id) {
            return false;
        }
        self.columns.push(raw.into());
        true
    }
}
