//! Read-only statistics over a finalized facility dataset.
//!
//! These are the figures the dashboard shows: survey counts and trends,
//! the collection period, the huddle participation rate and per-question
//! answer tallies.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::configuration::{Configuration, category};
use crate::models::{CellValue, Dataset, OTHER, PREFER_NOT_TO_ANSWER};
use crate::standardize::{YEAR_MONTH, parse_date};

/// Share of respondents who took part in a huddle, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuddleSumup {
    #[serde(rename = "Huddle Yes")]
    pub yes: f64,
    #[serde(rename = "Huddle No")]
    pub no: f64,
}

/// Count of one answer to a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCount {
    pub answer: String,
    pub count: usize,
}

/// The dashboard's summary figures for a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_surveys: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub huddle: Option<HuddleSumup>,
    pub trend_by_month: BTreeMap<String, usize>,
}

/// Truncates (not rounds) a percentage to two decimal places.
fn truncate_percent(value: f64) -> f64 {
    (value * 100.0).trunc() / 100.0
}

/// Formats a date as `M/D/YYYY` without zero padding.
fn us_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

fn parse_year_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Query view over a finalized dataset and its configuration.
#[derive(Debug, Clone, Copy)]
pub struct Analytics<'a> {
    dataset: &'a Dataset,
    configuration: &'a Configuration,
}

impl<'a> Analytics<'a> {
    pub fn new(dataset: &'a Dataset, configuration: &'a Configuration) -> Self {
        Self {
            dataset,
            configuration,
        }
    }

    pub fn total_surveys(&self) -> usize {
        self.dataset.row_count()
    }

    /// Surveys per `YYYY-MM` month.
    ///
    /// Every month between the earliest and the latest survey is present,
    /// with 0 for months without responses. Empty without dated surveys.
    pub fn survey_trend_by_month(&self) -> BTreeMap<String, usize> {
        let mut observed: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        if let Some(column) = self.dataset.column(YEAR_MONTH) {
            for month in column.cells.iter().filter_map(CellValue::as_text) {
                if let Some(key) = parse_year_month(month) {
                    *observed.entry(key).or_insert(0) += 1;
                }
            }
        }

        let (Some(&first), Some(&last)) = (observed.keys().next(), observed.keys().next_back())
        else {
            return BTreeMap::new();
        };

        let mut trend = BTreeMap::new();
        let (mut year, mut month) = first;
        while (year, month) <= last {
            let count = observed.get(&(year, month)).copied().unwrap_or(0);
            trend.insert(format!("{:04}-{:02}", year, month), count);
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        trend
    }

    fn survey_dates(&self) -> Vec<NaiveDate> {
        self.configuration
            .first_of_category(category::DATE)
            .and_then(|id| self.dataset.column(id))
            .map(|column| {
                column
                    .cells
                    .iter()
                    .filter_map(CellValue::as_text)
                    .filter_map(parse_date)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Earliest survey date as `M/D/YYYY`.
    pub fn start_date(&self) -> Option<String> {
        self.survey_dates().into_iter().min().map(us_date)
    }

    /// Latest survey date as `M/D/YYYY`.
    pub fn end_date(&self) -> Option<String> {
        self.survey_dates().into_iter().max().map(us_date)
    }

    /// Percentages of exact "Yes" answers to the huddle question and of
    /// every other answer, each truncated to two decimals.
    ///
    /// `None` without a huddle column or without surveys.
    pub fn huddle_sumup(&self) -> Option<HuddleSumup> {
        let id = self.configuration.first_of_category(category::HUDDLE)?;
        let column = self.dataset.column(id)?;
        let total = self.dataset.row_count();
        if total == 0 {
            return None;
        }

        let yes = column.count_text("Yes");
        let no = total - yes;
        Some(HuddleSumup {
            yes: truncate_percent(yes as f64 / total as f64 * 100.0),
            no: truncate_percent(no as f64 / total as f64 * 100.0),
        })
    }

    /// Answer tallies for a multiple-choice question.
    ///
    /// When the column's answer list covers every observed answer, the list
    /// order is used and unseen answers count 0. Otherwise the observed
    /// answers are sorted alphabetically with "Other" and then "Prefer not
    /// to answer" moved to the end. `None` for unknown, feedback and info
    /// columns.
    pub fn multiple_choice(&self, question_id: &str) -> Option<Vec<AnswerCount>> {
        let column = self.dataset.column(question_id)?;
        match self.configuration.category_of(question_id) {
            Some(category::OPEN_FEEDBACK | category::INFO) => return None,
            _ => {}
        }

        let rendered: Vec<String> = column.cells.iter().filter_map(CellValue::render).collect();
        let mut observed: Vec<&str> = Vec::new();
        for value in &rendered {
            if !observed.contains(&value.as_str()) {
                observed.push(value.as_str());
            }
        }

        let answer_list = self.configuration.answer_list(question_id);
        let covered = !answer_list.is_empty()
            && observed
                .iter()
                .all(|value| answer_list.iter().any(|a| a == value));

        let order: Vec<&str> = if covered {
            answer_list.iter().map(String::as_str).collect()
        } else {
            let mut sorted = observed;
            sorted.sort_unstable();
            for trailing in [OTHER, PREFER_NOT_TO_ANSWER] {
                if let Some(position) = sorted.iter().position(|v| *v == trailing) {
                    let value = sorted.remove(position);
                    sorted.push(value);
                }
            }
            sorted
        };

        Some(
            order
                .into_iter()
                .map(|answer| AnswerCount {
                    answer: answer.to_string(),
                    count: rendered.iter().filter(|v| v.as_str() == answer).count(),
                })
                .collect(),
        )
    }

    pub fn question_text(&self, question_id: &str) -> Option<&'a str> {
        self.configuration.question_text(question_id)
    }

    /// Bundles the figures of the dashboard home view.
    pub fn overview(&self) -> Overview {
        Overview {
            total_surveys: self.total_surveys(),
            start_date: self.start_date(),
            end_date: self.end_date(),
            huddle: self.huddle_sumup(),
            trend_by_month: self.survey_trend_by_month(),
        }
    }
}
