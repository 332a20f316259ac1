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
use tracing::{debug, error, info, instrument};

use crate::engine::{build_debug_steps, parse_pattern_input, DEFAULT_TRACE_CAP};
use crate::levels::TIERS;
use crate::protocol::*;
use crate::state::AppState;
use crate::tokens::tokenize_pattern;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "realm_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "realm_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "realm_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "realm_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "realm_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, msg))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListLevels => {
      let snapshot = state.snapshot().await;
      let levels = state
        .levels()
        .await
        .iter()
        .map(|level| to_level_out(level, &snapshot))
        .collect();
      ServerWsMessage::Levels { levels, tiers: TIERS.to_vec() }
    }

    ClientWsMessage::SelectLevel { level_id } => match state.select_level(&level_id).await {
      Some((level, input)) => {
        let snapshot = state.snapshot().await;
        ServerWsMessage::LevelSelected { level: to_level_out(&level, &snapshot), input }
      }
      None => ServerWsMessage::Error { message: format!("Unknown levelId: {}", level_id) },
    },

    ClientWsMessage::Evaluate { level_id, pattern, flags } => {
      match state.evaluate(&level_id, &pattern, &flags).await {
        Some(outcome) => {
          tracing::info!(target: "engine", level = %level_id, solved = outcome.solved, "WS evaluate");
          ServerWsMessage::Evaluation { evaluation: to_evaluation_out(outcome) }
        }
        None => ServerWsMessage::Error { message: format!("Unknown levelId: {}", level_id) },
      }
    }

    ClientWsMessage::Tokenize { pattern } => {
      let tokens = tokenize_pattern(&pattern);
      ServerWsMessage::Tokens { pattern, tokens }
    }

    ClientWsMessage::Trace { pattern, flags, text, cap } => {
      let parsed = parse_pattern_input(&pattern, &flags);
      let steps = if parsed.matcher.is_some() {
        build_debug_steps(&parsed.source, &parsed.flags, &text, cap.unwrap_or(DEFAULT_TRACE_CAP))
      } else {
        Vec::new()
      };
      ServerWsMessage::Trace { steps }
    }

    ClientWsMessage::CreateLevel { level } => match state.create_level(level.into_draft()).await {
      Ok((created, new_achievements)) => {
        let snapshot = state.snapshot().await;
        ServerWsMessage::LevelCreated {
          level: to_level_out(&created, &snapshot),
          new_achievements: new_achievements
            .into_iter()
            .map(|a| to_achievement_out(a, None))
            .collect(),
        }
      }
      Err(message) => ServerWsMessage::Error { message },
    },

    ClientWsMessage::ImportLevel { fragment } => match state.import_level(&fragment).await {
      Ok(Some((imported, new_achievements))) => {
        let snapshot = state.snapshot().await;
        ServerWsMessage::LevelImported {
          level: Some(to_level_out(&imported, &snapshot)),
          new_achievements: new_achievements
            .into_iter()
            .map(|a| to_achievement_out(a, None))
            .collect(),
        }
      }
      Ok(None) => ServerWsMessage::LevelImported { level: None, new_achievements: Vec::new() },
      Err(message) => ServerWsMessage::Error { message },
    },

    ClientWsMessage::ShareLevel { level_id } => match state.share_level(&level_id).await {
      Some(fragment) => ServerWsMessage::ShareLink { fragment },
      None => ServerWsMessage::Error { message: format!("Unknown levelId: {}", level_id) },
    },

    ClientWsMessage::Progress => {
      let snapshot = state.snapshot().await;
      let total = state.levels().await.len();
      ServerWsMessage::Progress { progress: to_progress_out(&snapshot, total) }
    }

    ClientWsMessage::ResetProgress => {
      state.reset().await;
      ServerWsMessage::ResetDone
    }
  }
}
