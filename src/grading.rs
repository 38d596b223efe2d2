//! Rule-based grading: exact label match for MCQs, keyword-weighted rubric matching for essays,
//! and the guarded final-score combination.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::domain::{Criterion, EssayItem, Mcq};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct McqGrade {
  pub correct: u32,
  pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EssayGrade {
  /// Sum of matched weights. Weights are `u32`, so the sum is widened.
  pub score: u64,
  pub total_points: u32,
  pub matched: Vec<String>,
}

/// Summed result over every essay item of a package.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EssayTotals {
  pub score: u64,
  pub possible: u64,
  pub matched: Vec<String>,
}

/// Counts answers equal to the MCQ's `correct_option` label (case-sensitive).
/// An MCQ without a correct option is never counted.
pub fn grade_mcq(mcqs: &[Mcq], answers: &BTreeMap<String, String>) -> McqGrade {
  let correct = mcqs
    .iter()
    .filter(|q| is_correct(q, answers.get(&q.id).map(String::as_str)))
    .count();
  McqGrade { correct: correct as u32, total: mcqs.len() as u32 }
}

pub fn is_correct(mcq: &Mcq, answer: Option<&str>) -> bool {
  match (answer, mcq.correct_option.as_deref()) {
    (Some(given), Some(expected)) => given == expected,
    _ => false,
  }
}

fn matching_criteria<'a>(item: &'a EssayItem, text: &str) -> impl Iterator<Item = &'a Criterion> + 'a {
  let haystack = text.to_lowercase();
  item.rubric.criteria.iter().filter(move |c| haystack.contains(&c.keyword.to_lowercase()))
}

/// Keywords from `criteria`, in order, whose lowercase form occurs anywhere in the lowercased
/// text. Plain substring search: "cat" matches "Concatenate".
pub fn matched_keywords(item: &EssayItem, text: &str) -> Vec<String> {
  matching_criteria(item, text).map(|c| c.keyword.clone()).collect()
}

/// Sums the weights of matched criteria. The sum is not capped at `total_points`.
pub fn grade_essay(item: &EssayItem, text: &str) -> EssayGrade {
  let hits: Vec<&Criterion> = matching_criteria(item, text).collect();
  EssayGrade {
    score: hits.iter().map(|c| u64::from(c.weight)).fold(0, u64::saturating_add),
    total_points: item.rubric.total_points,
    matched: hits.iter().map(|c| c.keyword.clone()).collect(),
  }
}

/// Grades every essay item in package order. A missing answer grades as empty text.
#[instrument(level = "debug", skip_all, fields(items = items.len()))]
pub fn grade_all_essays(items: &[EssayItem], answers: &BTreeMap<String, String>) -> EssayTotals {
  let mut totals = EssayTotals::default();
  for item in items {
    let text = answers.get(&item.id).map(String::as_str).unwrap_or("");
    let g = grade_essay(item, text);
    debug!(target: "quizbank", essay_id = %item.id, score = g.score, total = g.total_points, "Essay graded");
    totals.score = totals.score.saturating_add(g.score);
    totals.possible = totals.possible.saturating_add(u64::from(g.total_points));
    totals.matched.extend(g.matched);
  }
  totals
}

/// Final score on a 0-100 scale. Each half is only used when it has a non-zero denominator.
pub fn final_score(mcq: McqGrade, essay_score: f64, essay_possible: f64) -> f64 {
  let has_mcq = mcq.total > 0;
  let has_essay = essay_possible > 0.0;
  let mcq_ratio = || f64::from(mcq.correct) / f64::from(mcq.total);
  let essay_ratio = || essay_score / essay_possible;

  match (has_mcq, has_essay) {
    (true, true) => mcq_ratio() * 50.0 + essay_ratio() * 50.0,
    (false, true) => essay_ratio() * 100.0,
    (true, false) => mcq_ratio() * 100.0,
    (false, false) => 0.0,
  }
}
