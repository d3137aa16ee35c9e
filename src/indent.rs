//! Indentation helpers shared by the indentation rule and the hint endpoint.
//!
//! Levels are abstract: 1 unit = 1 nesting level, whatever the rendering width.

use serde::{Deserialize, Serialize};

use crate::arrangement::LearnerArrangement;
use crate::problem::ProblemDefinition;

/// Leading whitespace of `line` in levels of `width` columns, floored.
/// A tab counts as a full level.
pub fn indent_level(line: &str, width: usize) -> usize {
  if width == 0 {
    return 0;
  }
  let mut cols = 0usize;
  for ch in line.chars() {
    match ch {
      '\t' => cols += width,
      '\n' | '\r' => break,
      c if c.is_whitespace() => cols += 1,
      _ => break,
    }
  }
  cols / width
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IndentDirection {
  IndentMore,
  IndentLess,
}

impl IndentDirection {
  pub fn hint(&self) -> &'static str {
    match self {
      IndentDirection::IndentMore => "indent more",
      IndentDirection::IndentLess => "indent less",
    }
  }
}

/// Two neighbours whose indentation difference is not the canonical one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndentationIssue {
  pub previous_id: String,
  pub block_id: String,
  pub expected_delta: i64,
  pub actual_delta: i64,
  pub direction: IndentDirection,
}

impl IndentationIssue {
  pub fn message(&self) -> String {
    let off = (self.expected_delta - self.actual_delta).unsigned_abs();
    format!(
      "{} should sit {} level{} relative to {}: {}",
      self.block_id,
      match self.direction {
        IndentDirection::IndentMore => format!("{} deeper", off),
        IndentDirection::IndentLess => format!("{} shallower", off),
      },
      if off == 1 { "" } else { "s" },
      self.previous_id,
      self.direction.hint(),
    )
  }
}

/// Walk consecutive pairs of every group of two or more items and report each pair
/// whose observed delta (`indent_of`) differs from the canonical delta (`expected_of`).
pub fn relative_indent_issues<T, I, E, D>(
  groups: &[Vec<T>],
  indent_of: I,
  expected_of: E,
  id_of: D,
) -> Vec<IndentationIssue>
where
  I: Fn(&T) -> usize,
  E: Fn(&T) -> usize,
  D: Fn(&T) -> String,
{
  let mut issues = Vec::new();
  for group in groups.iter().filter(|g| g.len() >= 2) {
    for pair in group.windows(2) {
      let (prev, cur) = (&pair[0], &pair[1]);
      let actual = indent_of(cur) as i64 - indent_of(prev) as i64;
      let expected = expected_of(cur) as i64 - expected_of(prev) as i64;
      if actual != expected {
        issues.push(IndentationIssue {
          previous_id: id_of(prev),
          block_id: id_of(cur),
          expected_delta: expected,
          actual_delta: actual,
          direction: if actual < expected { IndentDirection::IndentMore } else { IndentDirection::IndentLess },
        });
      }
    }
  }
  issues
}

/// Relative indentation hints for the runs of placed blocks that already sit in
/// canonical order. Blocks outside such runs are left to the ordering rule.
pub fn indentation_hints(problem: &ProblemDefinition, arrangement: &LearnerArrangement) -> Vec<IndentationIssue> {
  // (id, placed indent, canonical indent)
  let mut runs: Vec<Vec<(&str, usize, usize)>> = Vec::new();
  let mut current: Vec<(&str, usize, usize)> = Vec::new();
  let mut last_pos: Option<usize> = None;

  for placed in &arrangement.solution {
    let canonical = problem
      .block(&placed.block_id)
      .filter(|b| !b.is_distractor)
      .and_then(|b| problem.canonical_position(&b.id).map(|pos| (b, pos)));
    match canonical {
      Some((block, pos)) => {
        if last_pos.map_or(false, |p| p + 1 != pos) {
          runs.push(std::mem::take(&mut current));
        }
        current.push((block.id.as_str(), placed.indent, block.expected_indent()));
        last_pos = Some(pos);
      }
      None => {
        runs.push(std::mem::take(&mut current));
        last_pos = None;
      }
    }
  }
  runs.push(current);

  relative_indent_issues(&runs, |t| t.1, |t| t.2, |t| t.0.to_string())
}
