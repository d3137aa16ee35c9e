//! Build a problem from plain source code.
//!
//! Lines may already carry distractor markers. On request, near-duplicate
//! distractors are synthesized from the solution lines:
//! - control-flow headers with the trailing colon dropped
//! - comparisons with the operator swapped (`==` <-> `!=`, `<` <-> `>=`, ...)
//! Synthesis is deterministic: solution lines in source order, colon first.

use std::collections::HashSet;

use tracing::info;

use crate::error::ProblemError;
use crate::parse::parse_problem;
use crate::problem::{Block, ProblemDefinition, ProblemOptions};

const HEADER_KEYWORDS: [&str; 9] = ["if ", "elif ", "else", "for ", "while ", "def ", "class ", "with ", "try"];

// Longest first so `<=` is never read as `<`.
const COMPARISON_SWAPS: [(&str, &str); 6] = [("==", "!="), ("!=", "=="), ("<=", ">"), (">=", "<"), ("<", ">="), (">", "<=")];

/// Upper bound on synthesized distractors for a solution of `len` lines.
pub fn distractor_cap(len: usize) -> usize {
  (len + 2).min(10)
}

fn missing_colon(text: &str) -> Option<String> {
  let t = text.trim_end();
  if t.ends_with(':') && HEADER_KEYWORDS.iter().any(|k| t.starts_with(k)) {
    Some(t.trim_end_matches(':').trim_end().to_string())
  } else {
    None
  }
}

fn swapped_comparison(text: &str) -> Option<String> {
  let (idx, op, swap) = COMPARISON_SWAPS
    .iter()
    .filter_map(|(op, swap)| text.find(op).map(|i| (i, *op, *swap)))
    .min_by_key(|(i, op, _)| (*i, std::cmp::Reverse(op.len())))?;
  // `->` and `=>` are not comparisons.
  if op == ">" && text[..idx].ends_with(|c| c == '-' || c == '=') {
    return None;
  }
  Some(format!("{}{}{}", &text[..idx], swap, &text[idx + op.len()..]))
}

/// Parse `source` and append up to `distractors` synthesized distractors.
/// `maxWrongLines` defaults to the final distractor count.
pub fn generate_problem(
  source: &str,
  distractors: usize,
  options: ProblemOptions,
) -> Result<ProblemDefinition, ProblemError> {
  let mut problem = parse_problem(source, options)?;

  let mut seen: HashSet<String> = problem.blocks.iter().map(|b| b.first_text().to_string()).collect();
  let wanted = distractors.min(distractor_cap(problem.solution_len()));
  let mut made: Vec<Block> = Vec::new();
  // Parsed ids follow source line indices, blank lines included.
  let mut next_id = source.lines().count();

  for block in problem.solution_blocks() {
    for variant in [missing_colon(block.first_text()), swapped_comparison(block.first_text())].into_iter().flatten() {
      if made.len() >= wanted {
        break;
      }
      if seen.insert(variant.clone()) {
        let mut d = Block::single(format!("block-{}", next_id), variant, block.expected_indent(), true);
        if !problem.options.can_indent {
          d.indentation_level = block.expected_indent();
        }
        made.push(d);
        next_id += 1;
      }
    }
  }

  let synthesized = made.len();
  problem.blocks.extend(made);
  if problem.options.max_wrong_lines.is_none() {
    problem.options.max_wrong_lines = Some(problem.distractor_count());
  }
  problem.check()?;

  info!(
    target: "problem",
    blocks = problem.blocks.len(),
    synthesized,
    "Generated problem"
  );
  Ok(problem)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SRC: &str = "def is_adult(age):\n    if age >= 18:\n        return True\n    return False";

  #[test]
  fn variants() {
    assert_eq!(missing_colon("if age >= 18:").as_deref(), Some("if age >= 18"));
    assert_eq!(missing_colon("x = {1: 2}"), None);
    assert_eq!(swapped_comparison("if age >= 18:").as_deref(), Some("if age < 18:"));
    assert_eq!(swapped_comparison("while a <= b and c == d:").as_deref(), Some("while a > b and c == d:"));
    assert_eq!(swapped_comparison("def f() -> int:"), None);
    assert_eq!(swapped_comparison("return x"), None);
  }

  #[test]
  fn synthesizes_in_source_order() {
    let p = generate_problem(SRC, 3, ProblemOptions::default()).expect("problem");
    let texts: Vec<&str> = p.distractors().map(|b| b.first_text()).collect();
    assert_eq!(texts, vec!["def is_adult(age)", "if age >= 18", "if age < 18:"]);
    assert_eq!(p.block("block-4").map(|b| b.expected_indent()), Some(0));
    assert_eq!(p.block("block-6").map(|b| b.expected_indent()), Some(1));
    assert_eq!(p.options.max_wrong_lines, Some(3));
  }

  #[test]
  fn zero_distractors_keeps_the_source() {
    let p = generate_problem(SRC, 0, ProblemOptions::default()).expect("problem");
    assert_eq!(p.blocks.len(), 4);
    assert_eq!(p.options.max_wrong_lines, Some(0));
  }

  #[test]
  fn empty_source_is_rejected() {
    assert_eq!(generate_problem("\n  \n", 2, ProblemOptions::default()).unwrap_err(), ProblemError::EmptySolution);
  }
}
