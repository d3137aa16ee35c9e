//! Problem-simplifying transforms.
//!
//! Each transform takes a problem snapshot and returns a new one. A transform
//! with nothing to do reports `success = false` and hands back the input
//! unchanged; that is a steady state, not an error.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::problem::ProblemDefinition;
use crate::util::normalize;

/// Minimum normalized similarity for a distractor to count as a variant of a line.
pub const PAIR_SIMILARITY: f64 = 0.7;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutcome {
  pub success: bool,
  pub problem: ProblemDefinition,
  pub message: String,
  /// Number of things changed (pairs formed, blocks removed, merges, ...).
  pub affected: usize,
  pub affected_ids: Vec<String>,
}

impl TransformOutcome {
  fn unchanged(problem: &ProblemDefinition, message: impl Into<String>) -> Self {
    Self { success: false, problem: problem.clone(), message: message.into(), affected: 0, affected_ids: Vec::new() }
  }

  fn changed(problem: ProblemDefinition, message: String, affected_ids: Vec<String>) -> Self {
    Self { success: true, problem, message, affected: affected_ids.len(), affected_ids }
  }
}

pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let (m, n) = (a.len(), b.len());
  let mut dp = vec![vec![0usize; n + 1]; m + 1];
  for (i, row) in dp.iter_mut().enumerate() {
    row[0] = i;
  }
  for (j, val) in dp[0].iter_mut().enumerate() {
    *val = j;
  }
  for i in 1..=m {
    for j in 1..=n {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      dp[i][j] = (dp[i - 1][j] + 1).min(dp[i][j - 1] + 1).min(dp[i - 1][j - 1] + cost);
    }
  }
  dp[m][n]
}

/// Whitespace-insensitive similarity in 0.0..=1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
  let a = normalize(a);
  let b = normalize(b);
  let longest = a.chars().count().max(b.chars().count());
  if longest == 0 {
    return 1.0;
  }
  1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Smallest `group-{n}` not already used in the problem.
fn fresh_group(problem: &ProblemDefinition) -> String {
  let used: BTreeSet<&str> = problem.blocks.iter().filter_map(|b| b.group_id.as_deref()).collect();
  (0..)
    .map(|n| format!("group-{}", n))
    .find(|g| !used.contains(g.as_str()))
    .unwrap_or_else(|| "group-0".into())
}

/// Pair every ungrouped distractor with the single-line solution block it most
/// resembles. Earliest block wins ties. The pair joins that block's group if it
/// already has one.
pub fn identify_paired_distractors(problem: &ProblemDefinition) -> TransformOutcome {
  let mut next = problem.clone();
  let mut paired = Vec::new();

  let loose: Vec<usize> = next
    .blocks
    .iter()
    .enumerate()
    .filter(|(_, b)| b.is_distractor && b.group_id.is_none())
    .map(|(i, _)| i)
    .collect();

  for d in loose {
    let text = normalize(&next.blocks[d].content());
    let mut best: Option<(usize, f64)> = None;
    for (i, b) in next.blocks.iter().enumerate() {
      if b.is_distractor || b.is_combined() {
        continue;
      }
      let candidate = normalize(&b.content());
      if candidate == text {
        continue;
      }
      let score = similarity(&candidate, &text);
      if score >= PAIR_SIMILARITY && best.map_or(true, |(_, s)| score > s) {
        best = Some((i, score));
      }
    }

    let Some((c, _)) = best else { continue };
    let group = match next.blocks[c].group_id.clone() {
      Some(g) => g,
      None => fresh_group(&next),
    };
    next.blocks[c].group_id = Some(group.clone());
    next.blocks[d].group_id = Some(group);
    next.blocks[d].is_paired_distractor = true;
    paired.push(next.blocks[d].id.clone());
  }

  if paired.is_empty() {
    return TransformOutcome::unchanged(problem, "No unpaired distractor resembles a solution line");
  }
  let message = format!("Paired {} distractor{} with the line{} they imitate", paired.len(), plural(paired.len()), plural(paired.len()));
  TransformOutcome::changed(next, message, paired)
}

/// Remove up to `n` distractors that are not in `placed`. Unpaired ones go first.
pub fn remove_distractors(problem: &ProblemDefinition, n: usize, placed: &BTreeSet<String>) -> TransformOutcome {
  let removable = |paired: bool| {
    problem
      .distractors()
      .filter(move |b| b.group_id.is_some() == paired && !placed.contains(&b.id))
      .map(|b| b.id.clone())
  };
  let doomed: Vec<String> = removable(false).chain(removable(true)).take(n).collect();
  if doomed.is_empty() {
    return TransformOutcome::unchanged(
      problem,
      if problem.distractor_count() == 0 { "No distractors left to remove" } else { "Every remaining distractor is in use" },
    );
  }

  let mut next = problem.clone();
  next.blocks.retain(|b| !doomed.contains(&b.id));

  let lonely: Vec<String> = next
    .groups()
    .into_iter()
    .filter(|(_, members)| members.len() < 2)
    .map(|(g, _)| g.to_string())
    .collect();
  for b in next.blocks.iter_mut() {
    if b.group_id.as_ref().map_or(false, |g| lonely.contains(g)) {
      b.group_id = None;
      b.is_paired_distractor = false;
    }
  }

  let remaining = next.distractor_count();
  if let Some(max) = next.options.max_wrong_lines.as_mut() {
    *max = (*max).min(remaining);
  }

  let message = format!("Removed {} distractor{}", doomed.len(), plural(doomed.len()));
  TransformOutcome::changed(next, message, doomed)
}

/// Present every solution block at its canonical indentation and lock it.
pub fn provide_indentation(problem: &ProblemDefinition) -> TransformOutcome {
  let mut next = problem.clone();
  let mut fixed = Vec::new();
  for b in next.blocks.iter_mut().filter(|b| !b.is_distractor) {
    let expected = b.expected_indent();
    if b.indentation_level != expected {
      b.indentation_level = expected;
      fixed.push(b.id.clone());
    }
  }
  let was_free = next.options.can_indent;
  next.options.can_indent = false;

  if fixed.is_empty() && !was_free {
    return TransformOutcome::unchanged(problem, "Indentation is already provided");
  }
  TransformOutcome {
    success: true,
    message: "Provided the indentation for every solution line".into(),
    affected: fixed.len(),
    affected_ids: fixed,
    problem: next,
  }
}

/// Merge up to `n` pairs of solution blocks that are adjacent in canonical order.
/// Combined blocks and grouped blocks are never merged; the earliest eligible
/// pair goes first. The merged block keeps the first block's id.
pub fn combine_blocks(problem: &ProblemDefinition, n: usize) -> TransformOutcome {
  let mut next = problem.clone();
  let mut merged = Vec::new();

  while merged.len() < n {
    let canonical: Vec<usize> = next
      .blocks
      .iter()
      .enumerate()
      .filter(|(_, b)| !b.is_distractor)
      .map(|(i, _)| i)
      .collect();
    let eligible = |i: usize| !next.blocks[i].is_combined() && next.blocks[i].group_id.is_none();
    let Some((first, second)) = canonical
      .windows(2)
      .map(|w| (w[0], w[1]))
      .find(|&(a, b)| eligible(a) && eligible(b))
    else {
      break;
    };

    let absorbed = next.blocks.remove(second);
    next.blocks[first].lines.extend(absorbed.lines);
    merged.push(next.blocks[first].id.clone());
  }

  if merged.is_empty() {
    return TransformOutcome::unchanged(problem, "No adjacent solution lines left to combine");
  }
  let message = format!("Combined {} pair{} of adjacent lines", merged.len(), plural(merged.len()));
  TransformOutcome::changed(next, message, merged)
}

fn plural(n: usize) -> &'static str {
  if n == 1 {
    ""
  } else {
    "s"
  }
}
