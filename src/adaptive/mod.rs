//! Adaptive difficulty controller.
//!
//! A stateless policy decides, from a learner's attempt counters, which
//! transforms to run against a problem. Every satisfied action is applied in
//! fixed priority order within one call:
//!   1. identify_pairs       attempts >= 2, an unpaired distractor exists
//!   2. remove_distractors   incorrect >= 3, at least one distractor
//!   3. provide_indentation  incorrect >= 4, learner still controls indentation
//!   4. combine              incorrect >= 5, more than 3 solution blocks
//! Conditions are evaluated against the running problem, so an earlier action
//! can enable or disable a later one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::problem::ProblemDefinition;

pub mod transforms;

pub use transforms::{
  combine_blocks, identify_paired_distractors, provide_indentation, remove_distractors, TransformOutcome,
};

/// Per-learner, per-problem attempt counters. Round-tripped by the client.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptiveState {
  pub attempts: u32,
  pub incorrect_attempts: u32,
  pub combined_blocks_applied: u32,
  pub distractors_removed: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveAction {
  IdentifyPairs,
  RemoveDistractors,
  ProvideIndentation,
  Combine,
}

impl AdaptiveAction {
  pub const ALL: [AdaptiveAction; 4] = [
    AdaptiveAction::IdentifyPairs,
    AdaptiveAction::RemoveDistractors,
    AdaptiveAction::ProvideIndentation,
    AdaptiveAction::Combine,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      AdaptiveAction::IdentifyPairs => "identify_pairs",
      AdaptiveAction::RemoveDistractors => "remove_distractors",
      AdaptiveAction::ProvideIndentation => "provide_indentation",
      AdaptiveAction::Combine => "combine",
    }
  }
}

/// Thresholds and magnitudes. Loaded from the `[adaptive]` table of the engine config.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
  pub trigger_after_incorrect: u32,
  pub pair_after_attempts: u32,
  pub remove_after_incorrect: u32,
  pub indentation_after_incorrect: u32,
  pub combine_after_incorrect: u32,
  /// Combine only when the solution has at least this many blocks.
  pub combine_min_blocks: usize,
  pub distractors_per_step: usize,
  pub pairs_per_step: usize,
}

impl Default for PolicyConfig {
  fn default() -> Self {
    Self {
      trigger_after_incorrect: 2,
      pair_after_attempts: 2,
      remove_after_incorrect: 3,
      indentation_after_incorrect: 4,
      combine_after_incorrect: 5,
      combine_min_blocks: 4,
      distractors_per_step: 1,
      pairs_per_step: 1,
    }
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationOutcome {
  pub success: bool,
  pub new_problem: ProblemDefinition,
  pub new_state: AdaptiveState,
  /// Human-readable description per applied action.
  pub actions_applied: Vec<String>,
  pub applied: Vec<AdaptiveAction>,
  pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct AdaptivePolicy {
  config: PolicyConfig,
}

impl AdaptivePolicy {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: PolicyConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PolicyConfig {
    &self.config
  }

  pub fn should_trigger(&self, state: &AdaptiveState) -> bool {
    state.incorrect_attempts >= self.config.trigger_after_incorrect
  }

  fn condition(&self, action: AdaptiveAction, state: &AdaptiveState, problem: &ProblemDefinition) -> bool {
    let c = &self.config;
    match action {
      AdaptiveAction::IdentifyPairs => state.attempts >= c.pair_after_attempts && problem.has_unpaired_distractor(),
      AdaptiveAction::RemoveDistractors => {
        state.incorrect_attempts >= c.remove_after_incorrect && problem.distractor_count() > 0
      }
      AdaptiveAction::ProvideIndentation => {
        state.incorrect_attempts >= c.indentation_after_incorrect && problem.options.can_indent
      }
      AdaptiveAction::Combine => {
        state.incorrect_attempts >= c.combine_after_incorrect && problem.solution_len() >= c.combine_min_blocks
      }
    }
  }

  /// Run every satisfied action. `placed` lists the blocks currently in the
  /// learner's solution; those are never removed.
  pub fn apply(&self, state: &AdaptiveState, problem: &ProblemDefinition, placed: &BTreeSet<String>) -> AdaptationOutcome {
    let mut current = problem.clone();
    let mut next_state = state.clone();
    let mut actions_applied = Vec::new();
    let mut applied = Vec::new();

    for action in AdaptiveAction::ALL {
      if !self.condition(action, &next_state, &current) {
        continue;
      }
      let out = match action {
        AdaptiveAction::IdentifyPairs => identify_paired_distractors(&current),
        AdaptiveAction::RemoveDistractors => remove_distractors(&current, self.config.distractors_per_step, placed),
        AdaptiveAction::ProvideIndentation => provide_indentation(&current),
        AdaptiveAction::Combine => combine_blocks(&current, self.config.pairs_per_step),
      };
      if !out.success {
        debug!(target: "adaptive", action = action.as_str(), reason = %out.message, "Action not applicable");
        continue;
      }
      match action {
        AdaptiveAction::RemoveDistractors => next_state.distractors_removed = next_state.distractors_removed.saturating_add(count(out.affected)),
        AdaptiveAction::Combine => next_state.combined_blocks_applied = next_state.combined_blocks_applied.saturating_add(count(out.affected)),
        _ => {}
      }
      current = out.problem;
      actions_applied.push(out.message);
      applied.push(action);
    }

    let success = !applied.is_empty();
    let message = if success {
      format!("Applied {} adaptive feature{}", applied.len(), if applied.len() == 1 { "" } else { "s" })
    } else {
      "No adaptive features to apply".to_string()
    };
    info!(
      target: "adaptive",
      applied = ?applied.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
      attempts = state.attempts,
      incorrect = state.incorrect_attempts,
      "Adaptation evaluated"
    );

    AdaptationOutcome { success, new_problem: current, new_state: next_state, actions_applied, applied, message }
  }
}

/// Default policy, nothing placed.
pub fn apply_adaptive_features(state: &AdaptiveState, problem: &ProblemDefinition) -> AdaptationOutcome {
  AdaptivePolicy::new().apply(state, problem, &BTreeSet::new())
}

pub fn apply_adaptive_features_with_placed(
  state: &AdaptiveState,
  problem: &ProblemDefinition,
  placed: &BTreeSet<String>,
) -> AdaptationOutcome {
  AdaptivePolicy::new().apply(state, problem, placed)
}

pub fn should_trigger_adaptation(state: &AdaptiveState) -> bool {
  AdaptivePolicy::new().should_trigger(state)
}

pub fn update_state_after_attempt(state: &AdaptiveState, was_correct: bool) -> AdaptiveState {
  AdaptiveState {
    attempts: state.attempts.saturating_add(1),
    incorrect_attempts: state.incorrect_attempts.saturating_add(u32::from(!was_correct)),
    ..state.clone()
  }
}

/// Counters are client round-tripped; they stick at the maximum instead of wrapping.
fn count(affected: usize) -> u32 {
  u32::try_from(affected).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arrangement::{LearnerArrangement, Placement};
  use crate::parse::parse_problem;
  use crate::problem::ProblemOptions;
  use crate::validation::{IssueKind, ValidationEngine};

  const SRC: &str = "\
def average(values):
    total = 0
    for v in values:
        total += v
    count = len(values)
    return total / count
    return total * count #distractor
    for v in value #distractor";

  fn problem() -> ProblemDefinition {
    parse_problem(SRC, ProblemOptions::default()).expect("problem")
  }

  fn state(attempts: u32, incorrect: u32) -> AdaptiveState {
    AdaptiveState { attempts, incorrect_attempts: incorrect, ..AdaptiveState::default() }
  }

  #[test]
  fn nothing_applies_below_thresholds() {
    let p = problem();
    let out = apply_adaptive_features(&state(1, 1), &p);
    assert!(!out.success);
    assert_eq!(out.new_problem, p);
    assert_eq!(out.message, "No adaptive features to apply");
  }

  #[test]
  fn struggling_learner_gets_every_action_in_order() {
    let p = problem();
    let out = apply_adaptive_features(&state(2, 5), &p);
    assert!(out.success);
    assert_eq!(
      out.applied,
      vec![
        AdaptiveAction::IdentifyPairs,
        AdaptiveAction::RemoveDistractors,
        AdaptiveAction::ProvideIndentation,
        AdaptiveAction::Combine
      ]
    );
    assert_eq!(out.actions_applied.len(), 4);
    assert_eq!(out.new_state.distractors_removed, 1);
    assert_eq!(out.new_state.combined_blocks_applied, 1);
    assert_eq!(out.new_state.attempts, 2);

    let np = &out.new_problem;
    assert!(np.check().is_ok());
    // The paired return variant went first; the loop variant stays paired.
    assert!(np.block("block-6").is_none());
    assert_eq!(np.block("block-7").and_then(|b| b.group_id.as_deref()), Some("group-1"));
    assert!(!np.options.can_indent);
    assert!(np.block("block-0").map_or(false, |b| b.is_combined()));

    // Both loop variants placed: one is evicted, the extra line fails the
    // attempt, and a distractor at the wrong indentation is never reported as
    // an indentation slip.
    let mut a = LearnerArrangement::canonical(np);
    a.scrap.clear();
    a.solution.push(Placement::new("block-7", 3));
    let v = ValidationEngine::default().validate(np, &a).expect("verdict");
    assert_eq!(v.corrections.len(), 1);
    assert!(!v.passed);
    assert!(v.errors.iter().all(|i| i.kind == IssueKind::GroupConflict));
    assert!(v.errors.iter().chain(&v.warnings).all(|i| i.kind != IssueKind::Indentation));
  }

  #[test]
  fn repeated_adaptation_settles() {
    let mut s = state(2, 9);
    let mut p = problem();
    for _ in 0..10 {
      let out = apply_adaptive_features(&s, &p);
      if !out.success {
        break;
      }
      s = out.new_state;
      p = out.new_problem;
    }
    let last = apply_adaptive_features(&s, &p);
    assert!(!last.success);
    assert_eq!(last.new_problem, p);
    assert_eq!(last.new_state, s);
    assert_eq!(p.distractor_count(), 0);
  }

  #[test]
  fn placed_distractors_survive_removal() {
    let placed: BTreeSet<String> = ["block-6".to_string(), "block-7".to_string()].into();
    let out = apply_adaptive_features_with_placed(&state(0, 3), &problem(), &placed);
    assert!(!out.success);
    assert_eq!(out.new_problem.distractor_count(), 2);
  }

  #[test]
  fn policy_thresholds_come_from_config() {
    let policy = AdaptivePolicy::from_config(PolicyConfig { remove_after_incorrect: 1, distractors_per_step: 2, ..PolicyConfig::default() });
    let out = policy.apply(&state(0, 1), &problem(), &BTreeSet::new());
    assert_eq!(out.applied, vec![AdaptiveAction::RemoveDistractors]);
    assert_eq!(out.new_state.distractors_removed, 2);
    assert!(!policy.should_trigger(&state(0, 1)));
  }

  #[test]
  fn attempt_counters() {
    let s = AdaptiveState::default();
    let s = update_state_after_attempt(&s, false);
    assert!(!should_trigger_adaptation(&s));
    let s = update_state_after_attempt(&s, true);
    let s = update_state_after_attempt(&s, false);
    assert_eq!(s, AdaptiveState { attempts: 3, incorrect_attempts: 2, ..AdaptiveState::default() });
    assert!(should_trigger_adaptation(&s));
  }

  #[test]
  fn attempt_counters_saturate() {
    let s = state(u32::MAX, u32::MAX);
    let next = update_state_after_attempt(&s, false);
    assert_eq!(next.attempts, u32::MAX);
    assert_eq!(next.incorrect_attempts, u32::MAX);
    assert_eq!(update_state_after_attempt(&s, true), s);

    let full = AdaptiveState { distractors_removed: u32::MAX, ..state(2, 5) };
    let out = apply_adaptive_features(&full, &problem());
    assert!(out.applied.contains(&AdaptiveAction::RemoveDistractors));
    assert_eq!(out.new_state.distractors_removed, u32::MAX);
  }
}
