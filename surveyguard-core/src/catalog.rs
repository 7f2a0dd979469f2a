//! Canonical multiple-choice answer sets.
//!
//! The registry order is a fixed priority: when a facility's answers fit
//! several scales, the earliest one wins. Matching is case-insensitive and
//! subset based, so a facility that never saw "Strongly Disagree" still
//! matches the agreement scale.

use serde::{Deserialize, Serialize};

/// Index of a canonical answer set in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSetCode(pub usize);

/// The canonical answer sets, in priority order.
pub const ANSWER_SETS: [&[&str]; 6] = [
    &[
        "Completely Agree",
        "Strongly Agree",
        "Somewhat Agree",
        "Somewhat Disagree",
        "Strongly Disagree",
        "Completely Disagree",
        "Prefer Not to Answer",
    ],
    &[
        "Strongly Agree",
        "Agree",
        "Somewhat Agree",
        "Somewhat Disagree",
        "Disagree",
        "Strongly Disagree",
        "Prefer Not to Answer",
    ],
    &[
        "None of the time",
        "A little of the time",
        "Some or a little of the time",
        "Occasionally or a moderate amount of the time",
        "Most of the time",
        "All of the time",
        "Prefer not to answer",
    ],
    &[
        "None of the time",
        "A little of the time",
        "A moderate amount of time",
        "Most of the time",
        "All of the time",
        "Not applicable",
        "Prefer not to answer",
    ],
    &[
        "Strongly Agree",
        "Agree",
        "Neither Agree nor Disagree",
        "Disagree",
        "Strongly Disagree",
        "Prefer not to answer",
    ],
    &["Yes", "No", "Not sure", "Prefer not to answer"],
];

fn contains_all<S: AsRef<str>>(set: &[&str], answers: &[S]) -> bool {
    answers.iter().all(|answer| {
        set.iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(answer.as_ref()))
    })
}

/// Codes of every canonical set containing all of the answers.
pub fn all_standard_lists<S: AsRef<str>>(answers: &[S]) -> Vec<AnswerSetCode> {
    ANSWER_SETS
        .iter()
        .enumerate()
        .filter(|(_, set)| contains_all(set, answers))
        .map(|(code, _)| AnswerSetCode(code))
        .collect()
}

/// The highest-priority canonical set containing all of the answers.
pub fn standard_list_for<S: AsRef<str>>(answers: &[S]) -> Option<&'static [&'static str]> {
    code_for(answers).map(|code| ANSWER_SETS[code.0])
}

/// Registry code of [`standard_list_for`], or `None` when nothing matches.
pub fn code_for<S: AsRef<str>>(answers: &[S]) -> Option<AnswerSetCode> {
    ANSWER_SETS
        .iter()
        .position(|set| contains_all(set, answers))
        .map(AnswerSetCode)
}

pub fn is_standard<S: AsRef<str>>(answers: &[S]) -> bool {
    code_for(answers).is_some()
}

/// Whether two questions share one multiple-choice scale.
///
/// False when either side matches no canonical set. Otherwise true when
/// the sets matched by one side are a subset of those matched by the other.
pub fn same_standard_set<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    let lists_a = all_standard_lists(a);
    let lists_b = all_standard_lists(b);
    if lists_a.is_empty() || lists_b.is_empty() {
        return false;
    }
    lists_a.iter().all(|code| lists_b.contains(code))
        || lists_b.iter().all(|code| lists_a.contains(code))
}

pub fn list_for_code(code: AnswerSetCode) -> Option<&'static [&'static str]> {
    ANSWER_SETS.get(code.0).copied()
}

/// Whether the answers fit the canonical set with the given code.
pub fn is_compatible_with_code<S: AsRef<str>>(answers: &[S], code: AnswerSetCode) -> bool {
    list_for_code(code).is_some_and(|set| contains_all(set, answers))
}

/// Position of `answer` in the matched canonical set, for ordering answers.
pub fn index_in_standard_list<S: AsRef<str>>(answers: &[S], answer: &str) -> Option<usize> {
    standard_list_for(answers)?
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no_matches_last_set() {
        let answers = ["Yes", "No"];
        assert_eq!(code_for(&answers), Some(AnswerSetCode(5)));
        assert_eq!(
            standard_list_for(&answers),
            Some(&["Yes", "No", "Not sure", "Prefer not to answer"][..])
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let answers = ["yes", "NOT SURE"];
        assert_eq!(code_for(&answers), Some(AnswerSetCode(5)));
    }

    #[test]
    fn test_first_match_wins() {
        // Fits sets 0, 1 and 4; registry order picks 0
        let answers = ["Strongly Agree", "Strongly Disagree"];
        assert_eq!(
            all_standard_lists(&answers),
            vec![AnswerSetCode(0), AnswerSetCode(1), AnswerSetCode(4)]
        );
        assert_eq!(code_for(&answers), Some(AnswerSetCode(0)));

        // "Agree" rules out set 0
        let answers = ["Agree", "Strongly Agree"];
        assert_eq!(code_for(&answers), Some(AnswerSetCode(1)));
    }

    #[test]
    fn test_no_match() {
        let answers = ["Yes", "Maybe"];
        assert_eq!(code_for(&answers), None);
        assert_eq!(standard_list_for(&answers), None);
        assert!(!is_standard(&answers));
    }

    #[test]
    fn test_same_standard_set() {
        // {0,1,4} vs {1,4}: subset
        assert!(same_standard_set(
            &["Strongly Agree"],
            &["Agree", "Strongly Disagree"]
        ));
        // {5} vs {1,4}: disjoint
        assert!(!same_standard_set(&["Yes"], &["Agree"]));
        // non-standard side
        assert!(!same_standard_set(&["Yes"], &["Perhaps"]));
    }

    #[test]
    fn test_code_helpers() {
        assert_eq!(list_for_code(AnswerSetCode(5)).map(<[_]>::len), Some(4));
        assert_eq!(list_for_code(AnswerSetCode(6)), None);
        assert!(is_compatible_with_code(&["Agree"], AnswerSetCode(4)));
        assert!(!is_compatible_with_code(&["Agree"], AnswerSetCode(0)));
        assert_eq!(index_in_standard_list(&["Yes", "No"], "no"), Some(1));
        assert_eq!(index_in_standard_list(&["Yes", "No"], "Maybe"), None);
    }
}
