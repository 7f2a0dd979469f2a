//! Numeric bucketing.
//!
//! Numeric answers are published as ranges instead of raw values. The plan
//! searches for the narrowest range width where every non-empty range holds
//! at least `min_k` respondents, optionally folding a sparse upper end into
//! a single open-ended tail.
//!
//! Ranges start at multiples of the width, negative values included. Only
//! ranges holding at least one value are labelled.

use serde::{Deserialize, Serialize};

use crate::models::PREFER_NOT_TO_ANSWER;

/// Largest magnitude bucketed into closed ranges.
///
/// Integers up to this bound are exact in `f64`, and range arithmetic on
/// them cannot leave `i64`.
pub const MAX_BUCKETED_MAGNITUDE: f64 = 1e15;

/// Range layout for one numeric column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPlan {
    /// Width of every closed range
    pub width: i64,
    /// A boundary every closed range is aligned to
    pub origin: i64,
    /// Lower bound of the open-ended tail range, if any
    pub cutoff: Option<i64>,
    /// Labels of the non-empty ranges in ascending order, then the tail,
    /// then the placeholder
    pub labels: Vec<String>,
    satisfied: bool,
}

/// Step added to a width that failed: 1 up to 9, then 10 up to 90, and so on.
fn width_step(width: i64) -> i64 {
    10_i64.pow(width.max(1).ilog10())
}

/// Start of the range of `width` holding `value`, ranges being aligned to
/// `origin`.
fn range_start(value: f64, width: i64, origin: i64) -> i64 {
    let width = width.max(1);
    (value.floor() as i64)
        .saturating_sub(origin)
        .div_euclid(width)
        .saturating_mul(width)
        .saturating_add(origin)
}

fn range_label(low: i64, width: i64) -> String {
    format!("{}-{}", low, low.saturating_add(width))
}

/// Outcome of scanning the sorted values at one width.
enum Scan {
    Fits { starts: Vec<i64>, cutoff: Option<i64> },
    Sparse,
}

/// Walks the ranges holding data in ascending order, jumping over gaps.
///
/// The tail starts at the first boundary after the lowest range where more
/// than `min_k` but fewer than `2 * min_k` values remain.
fn scan(sorted: &[f64], width: i64, min_k: usize) -> Scan {
    let mut starts = Vec::new();
    let mut index = 0;
    while let Some(&value) = sorted.get(index) {
        let low = range_start(value, width, 0);
        let high = low.saturating_add(width) as f64;
        let count = sorted
            .get(index..)
            .map_or(0, |rest| rest.partition_point(|v| *v < high));
        if count < min_k {
            return Scan::Sparse;
        }
        starts.push(low);
        index = index.saturating_add(count);

        let remaining = sorted.len().saturating_sub(index);
        if remaining > min_k && remaining < min_k.saturating_mul(2) {
            return Scan::Fits {
                starts,
                cutoff: Some(low.saturating_add(width)),
            };
        }
    }
    Scan::Fits {
        starts,
        cutoff: None,
    }
}

impl BucketPlan {
    /// Computes the plan for the observed non-null values.
    ///
    /// Returns `None` when there is nothing to bucket. Values that are not
    /// finite or exceed [`MAX_BUCKETED_MAGNITUDE`] cannot be ranged safely,
    /// so the whole column then shares one open-ended label.
    pub fn compute(values: &[f64], min_k: usize) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        if values
            .iter()
            .any(|v| !v.is_finite() || v.abs() > MAX_BUCKETED_MAGNITUDE)
        {
            return Some(Self::open_ended(values));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return None;
        };
        let lowest = min.floor() as i64;
        let highest = max.floor() as i64;

        // Past this width all values of one sign share a single range
        let limit = lowest
            .saturating_abs()
            .max(highest.saturating_abs())
            .saturating_add(1);

        let mut width: i64 = 1;
        loop {
            match scan(&sorted, width, min_k) {
                Scan::Fits { starts, cutoff } => {
                    let mut labels: Vec<String> =
                        starts.iter().map(|low| range_label(*low, width)).collect();
                    if let Some(cutoff) = cutoff {
                        labels.push(format!("{}+", cutoff));
                    }
                    labels.push(PREFER_NOT_TO_ANSWER.to_string());
                    return Some(Self {
                        width,
                        origin: 0,
                        cutoff,
                        labels,
                        satisfied: true,
                    });
                }
                Scan::Sparse => {
                    width = width.saturating_add(width_step(width));
                    if width >= limit {
                        return Some(Self::single_range(lowest, highest, width));
                    }
                }
            }
        }
    }

    /// Best effort once the search runs out of widths: one range holding
    /// every value.
    fn single_range(lowest: i64, highest: i64, width: i64) -> Self {
        let low = range_start(lowest as f64, width, 0);
        let (low, width) = if highest < low.saturating_add(width) {
            (low, width)
        } else {
            // Values on both sides of zero never share a zero-aligned range
            (lowest, highest.saturating_sub(lowest).saturating_add(1))
        };
        Self {
            width,
            origin: low,
            cutoff: None,
            labels: vec![range_label(low, width), PREFER_NOT_TO_ANSWER.to_string()],
            satisfied: false,
        }
    }

    /// Plan for columns holding values no closed range can represent.
    fn open_ended(values: &[f64]) -> Self {
        let lowest = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::min)
            .map_or(0.0, |v| v.clamp(-MAX_BUCKETED_MAGNITUDE, MAX_BUCKETED_MAGNITUDE))
            .floor() as i64;
        Self {
            width: 0,
            origin: lowest,
            cutoff: Some(lowest),
            labels: vec![format!("{}+", lowest), PREFER_NOT_TO_ANSWER.to_string()],
            satisfied: false,
        }
    }

    /// Whether the search found a width meeting the threshold.
    ///
    /// False means a single best-effort range was used instead.
    pub fn meets_threshold(&self) -> bool {
        self.satisfied
    }

    /// The label a value is published under.
    pub fn label_for(&self, value: f64) -> String {
        match self.cutoff {
            // Anything outside the closed ranges, NaN included, is tail
            Some(cutoff) if !(self.width > 0 && value < cutoff as f64) => {
                format!("{}+", cutoff)
            }
            _ => range_label(range_start(value, self.width, self.origin), self.width),
        }
    }

    /// The label for a missing value.
    pub fn label_for_missing(&self) -> &'static str {
        PREFER_NOT_TO_ANSWER
    }
}
