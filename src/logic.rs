//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Resolving the target problem (bank id or inline definition)
//!   - Validating an arrangement or a text submission
//!   - Running the adaptive policy and reconciling the learner's arrangement
//!   - Attempt bookkeeping, block moves and indentation hints
//!   - Generating new problems from source code and removing bank entries
//!
//! Engine calls are synchronous; no lock is held while grading.

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::adaptive::update_state_after_attempt;
use crate::arrangement::{LearnerArrangement, MoveOutcome};
use crate::error::ApiError;
use crate::generator::generate_problem;
use crate::indent::indentation_hints;
use crate::problem::{ProblemDefinition, ProblemRecord, ProblemSource};
use crate::protocol::*;
use crate::state::AppState;
use crate::util::trunc_for_log;

const DEFAULT_DISTRACTORS: usize = 2;

/// Inline problems win over ids. Either one must be present.
pub async fn resolve_problem(state: &AppState, target: ProblemRef) -> Result<ProblemDefinition, ApiError> {
  match (target.problem, target.problem_id) {
    (Some(p), _) => Ok(p),
    (None, Some(id)) => match state.get_problem(&id).await {
      Some(r) => Ok(r.problem),
      None => Err(ApiError::UnknownProblem { id }),
    },
    (None, None) => Err(ApiError::MissingProblem),
  }
}

pub async fn list_problems(state: &AppState) -> Vec<ProblemSummary> {
  state.list_problems().await.iter().map(to_summary).collect()
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn get_problem(state: &AppState, id: &str) -> Result<ProblemOut, ApiError> {
  let r = state
    .get_problem(id)
    .await
    .ok_or_else(|| ApiError::UnknownProblem { id: id.to_string() })?;
  Ok(to_out(&r))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn delete_problem(state: &AppState, id: &str) -> Result<ProblemSummary, ApiError> {
  let r = state
    .remove_problem(id)
    .await
    .ok_or_else(|| ApiError::UnknownProblem { id: id.to_string() })?;
  info!(target: "problem", %id, source = ?r.source, "Problem removed from bank");
  Ok(to_summary(&r))
}

#[instrument(level = "info", skip(state, body), fields(source_len = body.source_code.len()))]
pub async fn generate(state: &AppState, body: GenerateIn) -> Result<ProblemOut, ApiError> {
  debug!(target: "problem", source = %trunc_for_log(&body.source_code, 200), "Generating problem");
  let problem = generate_problem(
    &body.source_code,
    body.distractors.unwrap_or(DEFAULT_DISTRACTORS),
    body.options.unwrap_or_default(),
  )?;
  let record = ProblemRecord {
    id: Uuid::new_v4().to_string(),
    title: body.title.unwrap_or_else(|| "Generated problem".into()),
    description: String::new(),
    difficulty: body.difficulty.unwrap_or_else(|| "medium".into()),
    tags: Vec::new(),
    source: ProblemSource::Generated,
    problem,
  };
  state.insert_problem(record.clone()).await;
  info!(target: "problem", id = %record.id, blocks = record.problem.blocks.len(), "Generated problem stored");
  Ok(to_out(&record))
}

#[instrument(level = "info", skip(state, body), fields(problem_id = ?body.target.problem_id))]
pub async fn validate(state: &AppState, body: ValidateIn) -> Result<crate::validation::ValidationVerdict, ApiError> {
  let problem = resolve_problem(state, body.target).await?;
  let arrangement = match (body.arrangement, body.solution) {
    (Some(a), _) => a,
    (None, Some(lines)) => LearnerArrangement::from_lines(&problem, &lines),
    (None, None) => return Err(ApiError::MissingArrangement),
  };
  let verdict = state.engine.validate(&problem, &arrangement)?;
  info!(
    target: "validation",
    passed = verdict.passed,
    score = verdict.score,
    errors = verdict.errors.len(),
    "Arrangement validated"
  );
  Ok(verdict)
}

#[instrument(level = "info", skip(state, body), fields(problem_id = ?body.target.problem_id))]
pub async fn adapt(state: &AppState, body: AdaptIn) -> Result<AdaptOut, ApiError> {
  let problem = resolve_problem(state, body.target).await?;
  problem.check()?;
  let placed = body.arrangement.as_ref().map(|a| a.placed()).unwrap_or_default();
  let outcome = state.policy.apply(&body.state, &problem, &placed);
  let arrangement = body.arrangement.map(|a| a.reconcile(&outcome.new_problem));
  Ok(AdaptOut { outcome, arrangement })
}

#[instrument(level = "info", skip(state, body), fields(correct = body.correct))]
pub fn record_attempt(state: &AppState, body: AttemptIn) -> AttemptOut {
  let next = update_state_after_attempt(&body.state, body.correct);
  let should_adapt = state.policy.should_trigger(&next);
  debug!(target: "adaptive", attempts = next.attempts, incorrect = next.incorrect_attempts, should_adapt, "Attempt recorded");
  AttemptOut { state: next, should_adapt }
}

#[instrument(level = "info", skip(state, body), fields(block_id = %body.block_id, to = ?body.to))]
pub async fn move_block(state: &AppState, body: MoveIn) -> Result<MoveOutcome, ApiError> {
  let problem = resolve_problem(state, body.target).await?;
  Ok(body.arrangement.move_block(&problem, &body.block_id, body.to, body.position, body.indent)?)
}

#[instrument(level = "info", skip(state, body), fields(problem_id = ?body.target.problem_id))]
pub async fn hints(state: &AppState, body: HintsIn) -> Result<HintsOut, ApiError> {
  let problem = resolve_problem(state, body.target).await?;
  let issues = indentation_hints(&problem, &body.arrangement);
  let messages = issues.iter().map(|i| i.message()).collect();
  Ok(HintsOut { issues, messages })
}
