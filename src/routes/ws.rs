//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::ApiError;
use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "parsons_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "parsons_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "parsons_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "parsons_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "parsons_backend", "WebSocket disconnected");
}

fn ws_error(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

#[instrument(level = "info", skip_all)]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListProblems => ServerWsMessage::Problems { problems: logic::list_problems(state).await },

    ClientWsMessage::GetProblem { problem_id } => match logic::get_problem(state, &problem_id).await {
      Ok(problem) => ServerWsMessage::Problem { problem },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::GenerateProblem(body) => match logic::generate(state, body).await {
      Ok(problem) => ServerWsMessage::Problem { problem },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Validate(body) => match logic::validate(state, body).await {
      Ok(verdict) => {
        info!(target: "validation", passed = verdict.passed, score = verdict.score, "WS validate evaluated");
        ServerWsMessage::Verdict { verdict }
      }
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Adapt(body) => match logic::adapt(state, body).await {
      Ok(result) => ServerWsMessage::Adaptation { result },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Attempt(body) => ServerWsMessage::Attempt { result: logic::record_attempt(state, body) },

    ClientWsMessage::MoveBlock(body) => match logic::move_block(state, body).await {
      Ok(result) => ServerWsMessage::Moved { result },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::IndentationHints(body) => match logic::hints(state, body).await {
      Ok(result) => ServerWsMessage::IndentationHints { result },
      Err(e) => ws_error(e),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::EngineConfig;

  #[tokio::test]
  async fn dispatches_tagged_messages() {
    let state = AppState::from_config(EngineConfig::default());

    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"ping"}"#).expect("ping");
    assert!(matches!(handle_client_ws(msg, &state).await, ServerWsMessage::Pong));

    let msg: ClientWsMessage =
      serde_json::from_str(r#"{"type":"attempt","state":{"attempts":1,"incorrectAttempts":1},"correct":false}"#)
        .expect("attempt");
    match handle_client_ws(msg, &state).await {
      ServerWsMessage::Attempt { result } => {
        assert_eq!(result.state.attempts, 2);
        assert!(result.should_adapt);
      }
      other => panic!("unexpected reply {:?}", other),
    }

    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"get_problem","problemId":"missing"}"#).expect("get");
    assert!(matches!(handle_client_ws(msg, &state).await, ServerWsMessage::Error { .. }));
  }
}
