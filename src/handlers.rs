//! Push-delivery handler for build-completion notifications

use axum::{Json, Router, extract::State as AxumState, http::StatusCode, routing};
use tracing::{error, info};

use crate::matcher::should_publish;
use crate::notification::{BuildNotification, PushEnvelope};
use crate::publisher::publish_badge;
use crate::storage::BadgeStorage;
use crate::{SharedState, VALUE_NOT_SET};

pub async fn root() -> &'static str {
    concat!("build_status_badge ", env!("CARGO_PKG_VERSION"))
}

/// Handles one pushed envelope: decode, match, publish.
///
/// The response status drives the transport's redelivery policy: ignored
/// and published events are acknowledged, failures are not.
pub async fn handle_push<S: BadgeStorage + 'static>(
    AxumState(state): AxumState<SharedState<S>>,
    Json(envelope): Json<PushEnvelope>,
) -> StatusCode {
    info!(
        "Received message '{}' published at '{}'",
        envelope.message.message_id.as_deref().unwrap_or(VALUE_NOT_SET),
        envelope
            .message
            .publish_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| VALUE_NOT_SET.to_string())
    );

    let notification = match BuildNotification::from_message(&envelope.message) {
        Ok(notification) => notification,
        Err(e) => {
            error!("Could not decode build notification: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(
        "Received repository name: '{}'",
        notification.repo_name.as_deref().unwrap_or(VALUE_NOT_SET)
    );
    info!(
        "Received branch name: '{}'",
        notification.branch_name.as_deref().unwrap_or(VALUE_NOT_SET)
    );
    info!(
        "Received tag name: '{}'",
        notification.tag_name.as_deref().unwrap_or(VALUE_NOT_SET)
    );
    info!("Received build status: '{}'", notification.status);

    if !should_publish(&state.config, &notification) {
        info!("Received data ignored, no badge built.");
        return StatusCode::NO_CONTENT;
    }

    match publish_badge(
        &state.storage,
        &state.config,
        &notification.status,
        &notification.project_id,
    )
    .await
    {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!("Badge publishing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn router<S: BadgeStorage + 'static>(state: SharedState<S>) -> Router {
    Router::new()
        .route("/", routing::get(root).post(handle_push))
        .with_state(state)
}
