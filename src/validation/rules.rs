//! Default rule set: completeness, ordering, indentation.

use std::collections::HashSet;

use crate::arrangement::UNMATCHED_PREFIX;
use crate::error::RuleFault;
use crate::indent::relative_indent_issues;

use super::{round1, IssueKind, RuleCategory, RuleResult, Severity, ValidationInput, ValidationIssue, ValidationRule};

const INDENT_PENALTY: f32 = 15.0;
const STRICT_CONFIDENCE: f32 = 0.9;
const LENIENT_CONFIDENCE: f32 = 0.7;

fn issue(kind: IssueKind, severity: Severity, rule: &str, block_id: &str, message: String) -> ValidationIssue {
  ValidationIssue {
    kind,
    severity,
    block_id: Some(block_id.to_string()),
    expected: None,
    actual: None,
    message,
    rule: rule.to_string(),
  }
}

/// Text of an unmatched submission id (`unmatched:<index>:<text>`), or the id itself.
fn unmatched_text(id: &str) -> &str {
  id.strip_prefix(UNMATCHED_PREFIX)
    .and_then(|rest| rest.split_once(':').map(|(_, text)| text))
    .unwrap_or(id)
}

/// Every canonical block placed, nothing else.
pub struct CompletenessRule;

impl ValidationRule for CompletenessRule {
  fn name(&self) -> &'static str {
    "completeness"
  }
  fn category(&self) -> RuleCategory {
    RuleCategory::Completeness
  }
  fn priority(&self) -> u8 {
    10
  }

  fn evaluate(&self, input: &ValidationInput<'_>) -> Result<RuleResult, RuleFault> {
    let problem = input.problem;
    let placed: HashSet<&str> = input.arrangement.solution_ids().collect();
    let mut errors = Vec::new();

    let mut missing = 0usize;
    for (pos, block) in problem.solution_blocks().enumerate() {
      if placed.contains(block.id.as_str()) {
        continue;
      }
      missing += 1;
      let mut e = issue(
        IssueKind::MissingBlock,
        Severity::Critical,
        self.name(),
        &block.id,
        format!("Missing line \"{}\"", block.first_text()),
      );
      e.expected = Some(format!("position {}", pos + 1));
      errors.push(e);
    }

    let mut extra = 0usize;
    for (pos, id) in input.arrangement.solution_ids().enumerate() {
      let (kind, message) = match problem.block(id) {
        Some(b) if !b.is_distractor => continue,
        Some(b) => {
          let variant = b.group_id.as_deref().and_then(|g| problem.canonical_member(g));
          let message = match variant {
            Some(correct) => format!(
              "\"{}\" is an incorrect variant; use \"{}\" instead",
              b.first_text(),
              correct.first_text()
            ),
            None => format!("\"{}\" does not belong in the solution", b.first_text()),
          };
          (IssueKind::DistractorUsed, message)
        }
        None => (IssueKind::UnknownBlock, format!("Line {} \"{}\" does not match any block", pos + 1, unmatched_text(id))),
      };
      extra += 1;
      let mut e = issue(kind, Severity::Major, self.name(), id, message);
      e.actual = Some(format!("position {}", pos + 1));
      errors.push(e);
    }

    let canonical = problem.solution_len();
    let present = canonical - missing;
    let denom = canonical + extra;
    let score = if denom == 0 { 0.0 } else { round1(100.0 * present as f32 / denom as f32) };

    Ok(RuleResult { passed: errors.is_empty(), errors, warnings: Vec::new(), score, confidence: 1.0 })
  }
}

/// Indices (into `seq`) of a longest strictly increasing subsequence.
/// Ties keep the earliest-ending candidate.
fn longest_increasing(seq: &[usize]) -> Vec<usize> {
  if seq.is_empty() {
    return Vec::new();
  }
  let mut len = vec![1usize; seq.len()];
  let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
  for i in 0..seq.len() {
    for j in 0..i {
      if seq[j] < seq[i] && len[j] + 1 > len[i] {
        len[i] = len[j] + 1;
        prev[i] = Some(j);
      }
    }
  }
  let mut end = 0;
  for i in 1..seq.len() {
    if len[i] > len[end] {
      end = i;
    }
  }
  let mut out = Vec::with_capacity(len[end]);
  let mut cur = Some(end);
  while let Some(i) = cur {
    out.push(i);
    cur = prev[i];
  }
  out.reverse();
  out
}

/// Placed canonical blocks follow canonical order.
pub struct OrderingRule;

impl ValidationRule for OrderingRule {
  fn name(&self) -> &'static str {
    "ordering"
  }
  fn category(&self) -> RuleCategory {
    RuleCategory::Ordering
  }
  fn priority(&self) -> u8 {
    20
  }

  fn evaluate(&self, input: &ValidationInput<'_>) -> Result<RuleResult, RuleFault> {
    let problem = input.problem;
    // (solution position, canonical position, id)
    let placed: Vec<(usize, usize, &str)> = input
      .arrangement
      .solution_ids()
      .enumerate()
      .filter_map(|(pos, id)| problem.canonical_position(id).map(|c| (pos, c, id)))
      .collect();

    let canon: Vec<usize> = placed.iter().map(|p| p.1).collect();
    let keep: HashSet<usize> = longest_increasing(&canon).into_iter().collect();

    let mut errors = Vec::new();
    for (i, (pos, c, id)) in placed.iter().enumerate() {
      if keep.contains(&i) {
        continue;
      }
      let text = problem.block(id).map(|b| b.first_text()).unwrap_or_default();
      let mut e = issue(
        IssueKind::MisplacedBlock,
        Severity::Major,
        self.name(),
        id,
        format!("\"{}\" is out of order: it belongs at line {}, found at line {}", text, c + 1, pos + 1),
      );
      e.expected = Some((c + 1).to_string());
      e.actual = Some((pos + 1).to_string());
      errors.push(e);
    }

    let canonical = problem.solution_len();
    let score = if canonical == 0 { 0.0 } else { round1(100.0 * keep.len() as f32 / canonical as f32) };

    Ok(RuleResult { passed: errors.is_empty(), errors, warnings: Vec::new(), score, confidence: 1.0 })
  }
}

/// Hint appended to an indentation message, keyed on the line's shape.
fn context_hint(text: &str) -> &'static str {
  let t = text.trim();
  if t.ends_with(':') {
    " Lines ending with \":\" introduce new code blocks."
  } else if t.starts_with("for ") || t.starts_with("while ") {
    " Code inside this loop should be indented relative to this line."
  } else if t.starts_with("print(") {
    " Print statements are usually inside functions or loops."
  } else {
    ""
  }
}

/// Placed canonical blocks sit at their canonical indentation.
///
/// Strict when indentation errors are not allowed: each mismatch is a major
/// error and costs 15 points. Lenient otherwise: mismatches are style warnings.
pub struct IndentationRule;

impl ValidationRule for IndentationRule {
  fn name(&self) -> &'static str {
    "indentation"
  }
  fn category(&self) -> RuleCategory {
    RuleCategory::Indentation
  }
  fn priority(&self) -> u8 {
    30
  }

  fn evaluate(&self, input: &ValidationInput<'_>) -> Result<RuleResult, RuleFault> {
    let problem = input.problem;
    let lenient = problem.options.allows_indentation_errors();
    let severity = if lenient { Severity::Style } else { Severity::Major };
    let mut found = Vec::new();

    for (pos, placed) in input.arrangement.solution.iter().enumerate() {
      let Some(block) = problem.block(&placed.block_id).filter(|b| !b.is_distractor) else {
        continue;
      };

      let expected = block.expected_indent();
      if placed.indent != expected {
        let diff = placed.indent.abs_diff(expected);
        let mut e = issue(
          IssueKind::Indentation,
          severity,
          self.name(),
          &block.id,
          format!(
            "Line {} \"{}\" should be indented {} {} level{}.{}",
            pos + 1,
            block.first_text(),
            diff,
            if placed.indent < expected { "more" } else { "fewer" },
            if diff == 1 { "" } else { "s" },
            context_hint(block.first_text()),
          ),
        );
        e.expected = Some(expected.to_string());
        e.actual = Some(placed.indent.to_string());
        found.push(e);
      }

      if block.is_combined() && !placed.inner_indents.is_empty() {
        // (line index, placed indent, canonical indent)
        let lines: Vec<(usize, usize, usize)> = std::iter::once((0, placed.indent, expected))
          .chain(
            placed
              .inner_indents
              .iter()
              .zip(block.lines.iter().skip(1))
              .enumerate()
              .map(|(i, (got, line))| (i + 1, *got, line.indent)),
          )
          .collect();
        for rel in relative_indent_issues(&[lines], |t| t.1, |t| t.2, |t| format!("{}#{}", block.id, t.0)) {
          let mut e = issue(IssueKind::RelativeIndentation, severity, self.name(), &block.id, rel.message());
          e.expected = Some(rel.expected_delta.to_string());
          e.actual = Some(rel.actual_delta.to_string());
          found.push(e);
        }
      }
    }

    Ok(if lenient {
      RuleResult { passed: true, errors: Vec::new(), warnings: found, score: 100.0, confidence: LENIENT_CONFIDENCE }
    } else {
      let score = (100.0 - INDENT_PENALTY * found.len() as f32).max(0.0);
      RuleResult { passed: found.is_empty(), errors: found, warnings: Vec::new(), score, confidence: STRICT_CONFIDENCE }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arrangement::{LearnerArrangement, Placement};
  use crate::parse::parse_problem;
  use crate::problem::{ProblemDefinition, ProblemOptions};

  const SRC: &str = "def total(xs):\n    s = 0\n    for x in xs:\n        s += x\n    return s\n    return x #distractor";

  fn problem(options: ProblemOptions) -> ProblemDefinition {
    parse_problem(SRC, options).expect("problem")
  }

  fn run(rule: &dyn ValidationRule, p: &ProblemDefinition, a: &LearnerArrangement) -> RuleResult {
    rule.evaluate(&ValidationInput { problem: p, arrangement: a }).expect("rule result")
  }

  #[test]
  fn completeness_scores_present_over_expected_plus_extra() {
    let p = problem(ProblemOptions::default());
    let mut a = LearnerArrangement::canonical(&p);
    a.solution.remove(4);
    a.solution.push(Placement::new("block-5", 1));
    a.solution.push(Placement::new("unmatched:6:pass", 1));
    let r = run(&CompletenessRule, &p, &a);
    assert!(!r.passed);
    let kinds: Vec<IssueKind> = r.errors.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![IssueKind::MissingBlock, IssueKind::DistractorUsed, IssueKind::UnknownBlock]);
    // 4 present / (5 canonical + 2 extra)
    assert_eq!(r.score, 57.1);
    assert!(r.errors[2].message.contains("\"pass\""));
  }

  #[test]
  fn paired_distractor_message_names_the_correct_line() {
    let mut p = problem(ProblemOptions::default());
    for b in p.blocks.iter_mut().filter(|b| b.id == "block-4" || b.id == "block-5") {
      b.group_id = Some("group-0".into());
      b.is_paired_distractor = b.is_distractor;
    }
    let a = LearnerArrangement {
      solution: vec![Placement::new("block-5", 1)],
      scrap: vec![],
    };
    let r = run(&CompletenessRule, &p, &a);
    let used = r.errors.iter().find(|e| e.kind == IssueKind::DistractorUsed).expect("distractor error");
    assert!(used.message.contains("use \"return s\""));
  }

  #[test]
  fn ordering_flags_only_blocks_outside_the_longest_run() {
    let p = problem(ProblemOptions::default());
    let mut a = LearnerArrangement::canonical(&p);
    let moved = a.solution.remove(0);
    a.solution.push(moved);
    let r = run(&OrderingRule, &p, &a);
    assert!(!r.passed);
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].block_id.as_deref(), Some("block-0"));
    assert_eq!(r.errors[0].expected.as_deref(), Some("1"));
    assert_eq!(r.errors[0].actual.as_deref(), Some("5"));
    assert_eq!(r.score, 80.0);
  }

  #[test]
  fn ordering_ignores_distractors_and_missing_blocks() {
    let p = problem(ProblemOptions::default());
    let a = LearnerArrangement {
      solution: vec![Placement::new("block-0", 0), Placement::new("block-5", 1), Placement::new("block-3", 2)],
      scrap: vec![],
    };
    let r = run(&OrderingRule, &p, &a);
    assert!(r.passed);
    assert_eq!(r.score, 40.0);
  }

  #[test]
  fn longest_increasing_prefers_the_earliest_run() {
    assert_eq!(longest_increasing(&[]), Vec::<usize>::new());
    assert_eq!(longest_increasing(&[4, 0, 1, 2, 3]), vec![1, 2, 3, 4]);
    assert_eq!(longest_increasing(&[1, 0]), vec![0]);
  }

  #[test]
  fn strict_indentation_deducts_fifteen_per_slip() {
    let p = problem(ProblemOptions::default());
    let mut a = LearnerArrangement::canonical(&p);
    a.solution[1].indent = 2;
    let r = run(&IndentationRule, &p, &a);
    assert!(!r.passed);
    assert_eq!(r.score, 85.0);
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].severity, Severity::Major);
    assert!(r.errors[0].message.contains("1 fewer level."));
    assert_eq!(r.confidence, 0.9);

    for placed in a.solution.iter_mut() {
      placed.indent = 9;
    }
    assert_eq!(run(&IndentationRule, &p, &a).score, 25.0);
  }

  #[test]
  fn lenient_indentation_only_warns() {
    let p = problem(ProblemOptions { allow_indentation_errors: Some(true), ..ProblemOptions::default() });
    let mut a = LearnerArrangement::canonical(&p);
    a.solution[2].indent = 0;
    let r = run(&IndentationRule, &p, &a);
    assert!(r.passed);
    assert_eq!(r.score, 100.0);
    assert!(r.errors.is_empty());
    assert_eq!(r.warnings.len(), 1);
    assert_eq!(r.warnings[0].severity, Severity::Style);
    assert!(r.warnings[0].message.contains("introduce new code blocks"));
    assert_eq!(r.confidence, 0.7);
  }

  #[test]
  fn combined_blocks_check_inner_lines() {
    let mut p = problem(ProblemOptions::default());
    let second = p.blocks.remove(3);
    p.blocks[2].lines.extend(second.lines);
    let mut a = LearnerArrangement::canonical(&p);
    let combined = a.solution.iter_mut().find(|pl| pl.block_id == "block-2").expect("placed");
    combined.inner_indents = vec![1];
    let r = run(&IndentationRule, &p, &a);
    assert_eq!(r.errors.len(), 1);
    assert_eq!(r.errors[0].kind, IssueKind::RelativeIndentation);
    assert_eq!(r.errors[0].expected.as_deref(), Some("1"));
    assert_eq!(r.errors[0].actual.as_deref(), Some("0"));
  }
}
