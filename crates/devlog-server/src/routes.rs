//! HTTP surface: event ingestion and per-day stats reporting.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use devlog_core::report::{OutputMode, UnknownOutputMode};
use devlog_core::{
    ProjectMatchers, StatsPayload, classify, drill_down, normalize, render_drill_down,
    render_summary, unclassified,
};
use devlog_db::StoreError;
use serde::Deserialize;

use crate::{AppState, projects};

/// Submitted bodies larger than this are rejected up front.
const MAX_EVENT_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(submit_event))
        .route("/stats", get(stats))
        .layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES))
        .with_state(state)
}

/// Request-level failure, rendered as a JSON error body.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Conflict(message) => (StatusCode::CONFLICT, message),
            Self::Internal(message) => {
                tracing::error!(%message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEvent { .. } => Self::Conflict(err.to_string()),
            StoreError::Sqlite(_) | StoreError::TimestampParse { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

async fn submit_event(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let event = normalize(&body).map_err(|err| {
        tracing::debug!(error = %err, "rejected event submission");
        ApiError::BadRequest(err.to_string())
    })?;
    let payload = std::str::from_utf8(&body)
        .map_err(|_| ApiError::BadRequest("invalid event body: not UTF-8".to_string()))?;

    state.store.lock().await.insert(&event, payload)?;
    tracing::debug!(event_id = %event.event_id, kind = event.kind.type_name(), "event stored");

    Ok(Json(serde_json::json!({ "status": "ok", "event_id": event.event_id })).into_response())
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    date: Option<String>,
    project: Option<String>,
    mode: Option<String>,
}

async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, ApiError> {
    // Mode and date are checked before any database work.
    let mode = match query.mode.as_deref() {
        None => OutputMode::default(),
        Some(token) => token
            .parse()
            .map_err(|err: UnknownOutputMode| ApiError::BadRequest(err.to_string()))?,
    };
    let date = query
        .date
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("date is required".to_string()))?;
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("date must be YYYY-MM-DD".to_string()))?;

    let rules = projects::load(&state.projects_path)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let (terminal, browser) = {
        let store = state.store.lock().await;
        (
            store.terminal_durations_by_cwd(day, state.day_boundary)?,
            store.browser_durations_by_title(day, state.day_boundary)?,
        )
    };

    if let Some(project) = &query.project {
        let matchers = match &rules {
            Some(config) => ProjectMatchers::compile(config)
                .map_err(|err| ApiError::BadRequest(err.to_string()))?,
            None => ProjectMatchers::default(),
        };
        let detail = drill_down(&terminal, &browser, &matchers, project)
            .ok_or_else(|| ApiError::NotFound(format!("unknown project: {project}")))?;
        if detail.rows.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no activity for project: {project}"
            )));
        }
        return Ok(match mode {
            OutputMode::Json => Json(detail).into_response(),
            OutputMode::Md => render_drill_down(&detail).into_response(),
        });
    }

    let classification = match &rules {
        Some(config) => {
            let matchers = ProjectMatchers::compile(config)
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            classify(&terminal, &browser, &matchers)
        }
        None => unclassified(&terminal, &browser),
    };

    Ok(match mode {
        OutputMode::Json => {
            Json(StatsPayload::new(&terminal, &browser, classification)).into_response()
        }
        OutputMode::Md => render_summary(&classification).into_response(),
    })
}
