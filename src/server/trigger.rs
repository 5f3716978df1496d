//! Trigger endpoint handlers.
//!
//! Triggers are fire-and-forget: a `202 Accepted` means the sync was
//! scheduled, not completed. Sync-time failures are operator-visible only
//! through logs; HTTP callers only ever see scheduling-time errors.

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info};

use super::AppState;
use crate::types::ProjectKey;

/// Scheduling-time routing errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The path does not identify a registered project.
    #[error("unknown project: {0}")]
    UnknownProject(String),

    /// The verb is outside the trigger surface (GET and POST only).
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        match self {
            TriggerError::UnknownProject(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            TriggerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        }
    }
}

/// Read-only status query: a human-readable count of configured projects.
/// Served for GET on every path.
pub async fn status_handler(State(state): State<AppState>) -> (StatusCode, String) {
    let body = format!("{} projects configured\n", state.registry().len());
    (StatusCode::OK, body)
}

/// Sync-all trigger: submits every registered project and acknowledges
/// immediately.
pub async fn sync_all_handler(State(state): State<AppState>) -> StatusCode {
    let mut accepted = 0;
    for key in state.registry().keys() {
        if state.dispatcher().submit(key.clone()) {
            accepted += 1;
        }
    }

    info!(
        accepted,
        total = state.registry().len(),
        "sync-all trigger scheduled"
    );
    StatusCode::ACCEPTED
}

/// Sync-one trigger: submits the project named by the path, or 404 without
/// dispatching anything.
pub async fn sync_one_handler(
    State(state): State<AppState>,
    Path((org, name)): Path<(String, String)>,
) -> Result<StatusCode, TriggerError> {
    let key = ProjectKey::new(org, name);
    if !state.registry().contains(&key) {
        return Err(TriggerError::UnknownProject(key.to_string()));
    }

    debug!(project = %key, "sync-one trigger");
    state.dispatcher().submit(key);
    Ok(StatusCode::ACCEPTED)
}

/// Catch-all for paths outside the routed surface: GET answers the status
/// query, POST is an unknown project, every other verb is rejected.
pub async fn fallback_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    if method == Method::GET {
        status_handler(State(state)).await.into_response()
    } else if method == Method::POST {
        let path = uri.path().trim_start_matches('/').to_string();
        TriggerError::UnknownProject(path).into_response()
    } else {
        TriggerError::MethodNotAllowed.into_response()
    }
}
