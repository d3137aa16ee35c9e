//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures become `{ "error": ... }` bodies.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::arrangement::MoveOutcome;
use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;
use crate::validation::ValidationVerdict;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::UnknownProblem { .. } => StatusCode::NOT_FOUND,
      _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    warn!(target: "parsons_backend", %status, error = %self, "Request rejected");
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_list_problems(State(state): State<Arc<AppState>>) -> Json<Vec<ProblemSummary>> {
  Json(logic::list_problems(&state).await)
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProblemOut>, ApiError> {
  let out = logic::get_problem(&state, &id).await?;
  info!(target: "problem", %id, "HTTP problem served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProblemSummary>, ApiError> {
  Ok(Json(logic::delete_problem(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_generate_problem(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<ProblemOut>, ApiError> {
  Ok(Json(logic::generate(&state, body).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_validate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ValidateIn>,
) -> Result<Json<ValidationVerdict>, ApiError> {
  Ok(Json(logic::validate(&state, body).await?))
}

#[instrument(level = "info", skip(state, body), fields(attempts = body.state.attempts, incorrect = body.state.incorrect_attempts))]
pub async fn http_adapt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AdaptIn>,
) -> Result<Json<AdaptOut>, ApiError> {
  let out = logic::adapt(&state, body).await?;
  info!(target: "adaptive", success = out.outcome.success, actions = out.outcome.actions_applied.len(), "HTTP adapt evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AttemptIn>,
) -> Json<AttemptOut> {
  Json(logic::record_attempt(&state, body))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_move_block(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MoveIn>,
) -> Result<Json<MoveOutcome>, ApiError> {
  Ok(Json(logic::move_block(&state, body).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_indentation_hints(
  State(state): State<Arc<AppState>>,
  Json(body): Json<HintsIn>,
) -> Result<Json<HintsOut>, ApiError> {
  Ok(Json(logic::hints(&state, body).await?))
}
