//! HTTP surface for the pipeline.
//!
//! Push subscriptions deliver messages to these routes:
//!
//! - `POST /extract` – Cloud Storage notification wrapped in a Pub/Sub push envelope; runs the
//!   metadata extractor.
//! - `POST /refresh` – forwarded lease record wrapped in a Pub/Sub push envelope; runs the
//!   datastore refresher.
//! - `POST /admin/clear` – delete every stored metadata record; the body must be
//!   `{"confirm": true}`.
//! - `GET /healthz` – liveness probe.
//!
//! Handlers always answer `200 OK` with the outcome so the subscription acknowledges the
//! message. Redelivery is never requested.

use crate::{app::AppState, event::PushEnvelope};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

/// Build the HTTP router exposing both handlers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/extract", post(extract))
        .route("/refresh", post(refresh))
        .route("/admin/clear", post(clear))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Response body shared by every handler route.
#[derive(Debug, Serialize)]
struct OutcomeResponse {
    /// Machine-readable outcome label.
    status: &'static str,
    /// Human-readable outcome description.
    detail: String,
}

async fn extract(
    State(state): State<AppState>,
    Json(envelope): Json<PushEnvelope>,
) -> Json<OutcomeResponse> {
    let outcome = state.extractor.handle_message(&envelope.message).await;
    tracing::info!(
        message_id = ?envelope.message.message_id,
        status = outcome.status(),
        detail = %outcome,
        "Extract request completed"
    );
    Json(OutcomeResponse {
        status: outcome.status(),
        detail: outcome.to_string(),
    })
}

async fn refresh(
    State(state): State<AppState>,
    Json(envelope): Json<PushEnvelope>,
) -> Json<OutcomeResponse> {
    let outcome = state.refresher.handle_message(&envelope.message).await;
    tracing::info!(
        message_id = ?envelope.message.message_id,
        status = outcome.status(),
        detail = %outcome,
        "Refresh request completed"
    );
    Json(OutcomeResponse {
        status: outcome.status(),
        detail: outcome.to_string(),
    })
}

/// Body of the bulk-clear route.
#[derive(Debug, Default, Deserialize)]
struct ClearRequest {
    #[serde(default)]
    confirm: bool,
}

async fn clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Json<OutcomeResponse> {
    if !request.confirm {
        tracing::warn!("Bulk clear requested without confirmation");
        return Json(OutcomeResponse {
            status: "not_confirmed",
            detail: "Clear not confirmed; send {\"confirm\": true}".to_string(),
        });
    }
    let outcome = state.extractor.clear().await;
    tracing::info!(status = outcome.status(), detail = %outcome, "Clear request completed");
    Json(OutcomeResponse {
        status: outcome.status(),
        detail: outcome.to_string(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}
