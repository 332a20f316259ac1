//! HTTP endpoint handlers. These are thin wrappers that forward to the core
//! engine and the progression state; each handler is instrumented.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::engine::{build_debug_steps, parse_pattern_input, DEFAULT_TRACE_CAP};
use crate::levels::TIERS;
use crate::protocol::*;
use crate::state::AppState;
use crate::tokens::tokenize_pattern;
use crate::util::trunc_for_log;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_levels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let snapshot = state.snapshot().await;
  let levels = state
    .levels()
    .await
    .iter()
    .map(|level| to_level_out(level, &snapshot))
    .collect();
  Json(LevelsOut { levels, tiers: TIERS.to_vec() })
}

#[instrument(level = "info", skip(state), fields(%q.level_id))]
pub async fn http_select_level(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SelectQuery>,
) -> impl IntoResponse {
  match state.select_level(&q.level_id).await {
    Some((level, input)) => {
      let snapshot = state.snapshot().await;
      Json(SelectedOut { level: to_level_out(&level, &snapshot), input }).into_response()
    }
    None => (StatusCode::NOT_FOUND, format!("Unknown levelId: {}", q.level_id)).into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(%body.level_id, pattern_len = body.pattern.len()))]
pub async fn http_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EvaluateIn>,
) -> impl IntoResponse {
  match state.evaluate(&body.level_id, &body.pattern, &body.flags).await {
    Some(outcome) => {
      info!(target: "engine", level = %body.level_id, solved = outcome.solved, "HTTP evaluate");
      Json(to_evaluation_out(outcome)).into_response()
    }
    None => (StatusCode::NOT_FOUND, format!("Unknown levelId: {}", body.level_id)).into_response(),
  }
}

#[instrument(level = "info", skip(body), fields(pattern = %trunc_for_log(&body.pattern, 64)))]
pub async fn http_tokenize(Json(body): Json<TokenizeIn>) -> impl IntoResponse {
  let tokens = tokenize_pattern(&body.pattern);
  Json(TokensOut { pattern: body.pattern, tokens })
}

#[instrument(level = "info", skip(body), fields(text_len = body.text.len()))]
pub async fn http_trace(Json(body): Json<TraceIn>) -> impl IntoResponse {
  let parsed = parse_pattern_input(&body.pattern, &body.flags);
  let steps = if parsed.matcher.is_some() {
    build_debug_steps(
      &parsed.source,
      &parsed.flags,
      &body.text,
      body.cap.unwrap_or(DEFAULT_TRACE_CAP),
    )
  } else {
    Vec::new()
  };
  Json(TraceOut { steps })
}

#[instrument(level = "info", skip(state), fields(%q.level_id))]
pub async fn http_share_level(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ShareQuery>,
) -> impl IntoResponse {
  match state.share_level(&q.level_id).await {
    Some(fragment) => Json(ShareOut { fragment }).into_response(),
    None => (StatusCode::NOT_FOUND, format!("Unknown levelId: {}", q.level_id)).into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title))]
pub async fn http_create_level(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LevelDraftIn>,
) -> impl IntoResponse {
  match state.create_level(body.into_draft()).await {
    Ok((level, new_achievements)) => {
      let snapshot = state.snapshot().await;
      Json(CreatedOut {
        level: to_level_out(&level, &snapshot),
        new_achievements: new_achievements
          .into_iter()
          .map(|a| to_achievement_out(a, None))
          .collect(),
      })
      .into_response()
    }
    Err(message) => (StatusCode::BAD_REQUEST, message).into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(fragment_len = body.fragment.len()))]
pub async fn http_import_level(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ImportIn>,
) -> impl IntoResponse {
  match state.import_level(&body.fragment).await {
    Ok(Some((level, new_achievements))) => {
      let snapshot = state.snapshot().await;
      Json(ImportOut {
        level: Some(to_level_out(&level, &snapshot)),
        new_achievements: new_achievements
          .into_iter()
          .map(|a| to_achievement_out(a, None))
          .collect(),
      })
      .into_response()
    }
    Ok(None) => Json(ImportOut { level: None, new_achievements: Vec::new() }).into_response(),
    Err(message) => (StatusCode::BAD_REQUEST, message).into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let snapshot = state.snapshot().await;
  let total = state.levels().await.len();
  Json(to_progress_out(&snapshot, total))
}

#[instrument(level = "info", skip(state))]
pub async fn http_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.reset().await;
  Json(HealthOut { ok: true })
}
