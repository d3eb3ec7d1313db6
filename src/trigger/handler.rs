use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::platform::{self, RepoAction};
use crate::server::AppState;
use crate::trigger::signature::verify_signature;
use crate::workflow::types::WorkflowRequest;

/// Check the optional trigger signature against the raw body.
fn authorize(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    let Some(secret) = &state.config.server.trigger_secret else {
        return Ok(());
    };

    let signature = match headers.get("x-signature-256").and_then(|v| v.to_str().ok()) {
        Some(sig) => sig,
        None => {
            tracing::warn!("Missing X-Signature-256 header");
            return Err(StatusCode::UNAUTHORIZED.into_response());
        }
    };

    if let Err(e) = verify_signature(secret, body, signature) {
        tracing::warn!(error = %e, "Trigger signature verification failed");
        return Err(StatusCode::UNAUTHORIZED.into_response());
    }

    Ok(())
}

/// `POST /workflows`: run one workflow invocation and return its report.
pub async fn handle_workflow(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = authorize(&state, &headers, &body) {
        return response;
    }

    let request: WorkflowRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed workflow request");
            return (StatusCode::BAD_REQUEST, format!("Invalid request: {e}")).into_response();
        }
    };

    let result = state.pipeline.run(request).await;
    Json(result).into_response()
}

/// `POST /repository`: dispatch one repository action.
pub async fn handle_repository(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = authorize(&state, &headers, &body) {
        return response;
    }

    let action: RepoAction = match serde_json::from_slice(&body) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed repository action");
            return (StatusCode::BAD_REQUEST, format!("Invalid action: {e}")).into_response();
        }
    };

    let Some(host) = &state.repository else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Repository host is not configured".to_string(),
        )
            .into_response();
    };

    match platform::dispatch(host.as_ref(), action).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Repository action failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
