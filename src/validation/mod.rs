//! Rule-based grading of a learner arrangement.
//!
//! Flow:
//! 1) Input checks (problem structure, no block placed twice). Failures are
//!    returned as `ProblemError` and no rule runs.
//! 2) Pairing-group conflicts are auto-corrected; each eviction becomes a
//!    `group-conflict` warning.
//! 3) Every registered rule runs in registration order. A rule that errors or
//!    panics is recorded as a `rule-fault` warning and the batch continues.
//! 4) Outcomes fold into one `ValidationVerdict`:
//!    - passed     = AND over the rules that produced a result
//!    - score      = weighted mean of their scores (all weights 1.0 by default)
//!    - confidence = minimum over rules, 0.0 for a faulted rule
//!    - errors / warnings concatenated in registration order

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arrangement::{Eviction, LearnerArrangement};
use crate::error::{ProblemError, RuleFault};
use crate::problem::ProblemDefinition;

pub mod rules;

pub use rules::{CompletenessRule, IndentationRule, OrderingRule};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
  MissingBlock,
  DistractorUsed,
  UnknownBlock,
  MisplacedBlock,
  Indentation,
  RelativeIndentation,
  GroupConflict,
  RuleFault,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Critical,
  Major,
  Minor,
  Style,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
  Completeness,
  Ordering,
  Indentation,
}

/// One finding. Used for both errors and warnings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
  pub kind: IssueKind,
  pub severity: Severity,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub block_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expected: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub actual: Option<String>,
  pub message: String,
  pub rule: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
  pub passed: bool,
  pub errors: Vec<ValidationIssue>,
  pub warnings: Vec<ValidationIssue>,
  /// 0..=100
  pub score: f32,
  /// 0.0..=1.0
  pub confidence: f32,
}

pub struct ValidationInput<'a> {
  pub problem: &'a ProblemDefinition,
  pub arrangement: &'a LearnerArrangement,
}

/// A single, independent check. Rules never see each other's output.
pub trait ValidationRule: Send + Sync {
  fn name(&self) -> &'static str;
  fn category(&self) -> RuleCategory;
  /// Lower runs earlier in the default set; ordering carries no semantics.
  fn priority(&self) -> u8;
  fn weight(&self) -> f32 {
    1.0
  }
  fn evaluate(&self, input: &ValidationInput<'_>) -> Result<RuleResult, RuleFault>;
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
  pub passed: bool,
  pub errors: Vec<ValidationIssue>,
  pub warnings: Vec<ValidationIssue>,
  pub score: f32,
  pub confidence: f32,
  pub rules_applied: Vec<String>,
  pub corrections: Vec<Eviction>,
  pub summary: String,
}

pub(crate) fn round1(x: f32) -> f32 {
  (x * 10.0).round() / 10.0
}

pub struct ValidationEngine {
  rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for ValidationEngine {
  fn default() -> Self {
    Self::with_default_rules()
  }
}

impl ValidationEngine {
  /// No rules registered.
  pub fn empty() -> Self {
    Self { rules: Vec::new() }
  }

  /// Completeness, ordering, indentation.
  pub fn with_default_rules() -> Self {
    let mut rules: Vec<Box<dyn ValidationRule>> =
      vec![Box::new(CompletenessRule), Box::new(OrderingRule), Box::new(IndentationRule)];
    rules.sort_by_key(|r| r.priority());
    Self { rules }
  }

  pub fn register(&mut self, rule: Box<dyn ValidationRule>) {
    self.rules.push(rule);
  }

  pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
    self.register(rule);
    self
  }

  pub fn rule_names(&self) -> Vec<&'static str> {
    self.rules.iter().map(|r| r.name()).collect()
  }

  pub fn validate(
    &self,
    problem: &ProblemDefinition,
    arrangement: &LearnerArrangement,
  ) -> Result<ValidationVerdict, ProblemError> {
    problem.check()?;
    arrangement.check()?;

    // Rules grade the corrected copy. The submission still held one line too
    // many per eviction, so each one is also an error.
    let (arrangement, corrections) = arrangement.enforce_exclusivity(problem);
    let conflict = |e: &Eviction, severity: Severity, message: String| ValidationIssue {
      kind: IssueKind::GroupConflict,
      severity,
      block_id: Some(e.block_id.clone()),
      expected: Some(e.replaced_by.clone()),
      actual: Some(e.block_id.clone()),
      message,
      rule: "group-exclusivity".into(),
    };
    let mut errors: Vec<ValidationIssue> = corrections
      .iter()
      .map(|e| {
        let message = format!(
          "Only one variant of this step belongs in the solution; \"{}\" is an extra line.",
          problem.block(&e.block_id).map(|b| b.first_text()).unwrap_or(e.block_id.as_str())
        );
        conflict(e, Severity::Major, message)
      })
      .collect();
    let mut warnings: Vec<ValidationIssue> =
      corrections.iter().map(|e| conflict(e, Severity::Minor, e.message.clone())).collect();

    let input = ValidationInput { problem, arrangement: &arrangement };
    let mut passed = corrections.is_empty();
    let mut produced = 0usize;
    let mut weighted = 0.0f32;
    let mut weights = 0.0f32;
    let mut confidence = 1.0f32;
    let mut rules_applied = Vec::with_capacity(self.rules.len());

    for rule in &self.rules {
      rules_applied.push(rule.name().to_string());
      match run_rule(rule.as_ref(), &input) {
        Ok(r) => {
          produced += 1;
          passed &= r.passed;
          let w = rule.weight().max(0.0);
          weighted += w * r.score.clamp(0.0, 100.0);
          weights += w;
          confidence = confidence.min(r.confidence.clamp(0.0, 1.0));
          errors.extend(r.errors);
          warnings.extend(r.warnings);
        }
        Err(fault) => {
          warn!(target: "validation", rule = rule.name(), reason = %fault.reason, "Rule faulted; continuing");
          confidence = 0.0;
          warnings.push(ValidationIssue {
            kind: IssueKind::RuleFault,
            severity: Severity::Minor,
            block_id: None,
            expected: None,
            actual: None,
            message: fault.to_string(),
            rule: rule.name().to_string(),
          });
        }
      }
    }

    if produced == 0 {
      passed = false;
      confidence = 0.0;
    }
    let score = if weights > 0.0 { round1(weighted / weights) } else { 0.0 };
    debug!(target: "validation", passed, score, errors = errors.len(), warnings = warnings.len(), "Verdict");

    Ok(ValidationVerdict {
      passed,
      errors,
      warnings,
      score,
      confidence,
      rules_applied,
      corrections,
      summary: if passed { "Correct solution!".into() } else { "Not quite right yet.".into() },
    })
  }
}

fn run_rule(rule: &dyn ValidationRule, input: &ValidationInput<'_>) -> Result<RuleResult, RuleFault> {
  match catch_unwind(AssertUnwindSafe(|| rule.evaluate(input))) {
    Ok(result) => result,
    Err(payload) => {
      let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".into());
      Err(RuleFault::new(rule.name(), reason))
    }
  }
}
