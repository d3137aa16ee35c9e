//! Input errors raised before any grading or transform runs.
//!
//! Anything that is an expected steady state (a transform with nothing left to
//! do, a group conflict that gets auto-corrected) is reported in the result
//! value instead and never shows up here.

/// Malformed problem definitions, options or arrangements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemError {
  #[error("problem has no solution lines")]
  EmptySolution,

  #[error("duplicate block id {id}")]
  DuplicateBlockId { id: String },

  #[error("block {id} has no lines")]
  EmptyBlock { id: String },

  #[error("pairing group {group} has {members} member(s), at least 2 required")]
  UndersizedGroup { group: String, members: usize },

  #[error("pairing group {group} has {canonical} canonical member(s), exactly 1 required")]
  AmbiguousGroup { group: String, canonical: usize },

  #[error("option {option} is required when grader is {grader}")]
  MissingOption { option: &'static str, grader: &'static str },

  #[error("indent width must be positive")]
  InvalidIndentWidth,

  #[error("block {id} is placed more than once")]
  DuplicatePlacement { id: String },

  #[error("unknown block {id}")]
  UnknownBlock { id: String },

  #[error("block {id} is not part of the arrangement")]
  NotInArrangement { id: String },
}

/// A rule that could not produce a result. Downgraded to a warning by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rule {rule} faulted: {reason}")]
pub struct RuleFault {
  pub rule: String,
  pub reason: String,
}

impl RuleFault {
  pub fn new(rule: impl Into<String>, reason: impl Into<String>) -> Self {
    Self { rule: rule.into(), reason: reason.into() }
  }
}

/// Failures of the HTTP/WebSocket surface. Unknown problems map to 404,
/// everything else to 422.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("unknown problem {id}")]
  UnknownProblem { id: String },

  #[error("request needs either problemId or problem")]
  MissingProblem,

  #[error("request needs either arrangement or solution")]
  MissingArrangement,

  #[error(transparent)]
  Problem(#[from] ProblemError),
}
