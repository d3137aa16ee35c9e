//! Text encoding of a problem: one line per block, indentation as leading
//! whitespace, and a trailing marker on lines that do not belong in the answer.
//!
//! Example:
//!   def total(xs):
//!       s = 0
//!       s == 0 #distractor
//!       return s
//!
//! Group membership is never written down; `identify_paired_distractors`
//! infers it from near-duplicate content. The engine never sees raw text.

use tracing::debug;

use crate::error::ProblemError;
use crate::indent::indent_level;
use crate::problem::{Block, ProblemDefinition, ProblemOptions, RENDER_INDENT};

pub const DISTRACTOR_MARKER: &str = "#distractor";
pub const PAIRED_MARKER: &str = "#paired";

/// Split a trailing distractor marker off a line.
fn strip_marker(line: &str) -> (&str, bool) {
  let trimmed = line.trim_end();
  for marker in [DISTRACTOR_MARKER, PAIRED_MARKER] {
    if let Some(rest) = trimmed.strip_suffix(marker) {
      return (rest.trim_end(), true);
    }
  }
  (trimmed, false)
}

/// Parse the marker-annotated source into a checked `ProblemDefinition`.
/// Block ids are `block-{n}` where n is the source line index.
pub fn parse_problem(source: &str, options: ProblemOptions) -> Result<ProblemDefinition, ProblemError> {
  options.check()?;
  let width = options.indent_width;

  let mut blocks = Vec::new();
  for (i, raw) in source.lines().enumerate() {
    if raw.trim().is_empty() {
      continue;
    }
    let (code, is_distractor) = strip_marker(raw);
    let text = code.trim();
    if text.is_empty() {
      continue;
    }
    let indent = indent_level(code, width);
    let mut block = Block::single(format!("block-{}", i), text, indent, is_distractor);
    if !options.can_indent {
      block.indentation_level = indent;
    }
    blocks.push(block);
  }

  let problem = ProblemDefinition::new(blocks, options);
  problem.check()?;
  debug!(
    target: "problem",
    blocks = problem.blocks.len(),
    distractors = problem.distractor_count(),
    "Parsed problem source"
  );
  Ok(problem)
}

/// Inverse of `parse_problem` for single-line blocks; combined blocks emit
/// each of their lines. Pairing groups are not representable and are dropped.
pub fn render_source(problem: &ProblemDefinition) -> String {
  let mut out = Vec::new();
  for block in &problem.blocks {
    for line in &block.lines {
      let mut s = format!("{}{}", RENDER_INDENT.repeat(line.indent), line.text);
      if block.is_distractor {
        s.push(' ');
        s.push_str(DISTRACTOR_MARKER);
      }
      out.push(s);
    }
  }
  out.join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  const SRC: &str = "def total(xs):\n    s = 0\n\n    for x in xs:\n        s += x\n    s == 0 #distractor\n    return s\nreturn xs #paired\n";

  #[test]
  fn markers_and_indentation_are_parsed() {
    let p = parse_problem(SRC, ProblemOptions::default()).expect("parse");
    assert_eq!(p.blocks.len(), 7);
    assert_eq!(p.solution_len(), 5);
    assert_eq!(p.distractor_count(), 2);

    let d = p.block("block-5").expect("distractor");
    assert!(d.is_distractor);
    assert_eq!(d.first_text(), "s == 0");
    assert_eq!(d.expected_indent(), 1);
    assert!(d.group_id.is_none());

    let inner = p.block("block-4").expect("loop body");
    assert_eq!(inner.expected_indent(), 2);
    // learner controls indentation, so everything starts flush left
    assert_eq!(inner.indentation_level, 0);
    assert!(p.block("block-2").is_none());
  }

  #[test]
  fn presented_indentation_is_canonical_when_learner_cannot_indent() {
    let opts = ProblemOptions { can_indent: false, ..ProblemOptions::default() };
    let p = parse_problem(SRC, opts).expect("parse");
    assert!(p.solution_blocks().all(|b| b.indentation_level == b.expected_indent()));
  }

  #[test]
  fn source_without_solution_lines_is_rejected() {
    let err = parse_problem("x = 1 #distractor\n\n", ProblemOptions::default()).unwrap_err();
    assert_eq!(err, ProblemError::EmptySolution);
  }

  #[test]
  fn custom_indent_width() {
    let opts = ProblemOptions { indent_width: 2, ..ProblemOptions::default() };
    let p = parse_problem("if x:\n  y()\n    z()", opts).expect("parse");
    let indents: Vec<usize> = p.blocks.iter().map(|b| b.expected_indent()).collect();
    assert_eq!(indents, vec![0, 1, 2]);
  }

  #[test]
  fn render_round_trips() {
    let p = parse_problem(SRC, ProblemOptions::default()).expect("parse");
    let again = parse_problem(&render_source(&p), ProblemOptions::default()).expect("reparse");
    let texts = |p: &ProblemDefinition| p.blocks.iter().map(|b| (b.content(), b.expected_indent(), b.is_distractor)).collect::<Vec<_>>();
    assert_eq!(texts(&p), texts(&again));
  }
}
