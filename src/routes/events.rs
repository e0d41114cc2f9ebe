// SPDX-License-Identifier: MIT

//! Pub/Sub push endpoint for inbound activity events.
//!
//! Ack/nack is signaled through the HTTP status: any 2xx acks the
//! message, anything else makes Pub/Sub redeliver it. Structurally
//! broken messages are acked with an error log, since redelivery can
//! never fix them.

use crate::error::{AppError, Result};
use crate::loop_prevention::is_bounceback_with_retry;
use crate::models::activity::StandardizedActivity;
use crate::models::payload::{ActivityPayload, EnrichedActivityEvent};
use crate::services::offload;
use crate::services::orchestrator::ExecutionStatus;
use crate::storage::parse_gcs_uri;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::Engine;
use futures_util::future;
use serde::Deserialize;
use std::sync::Arc;

/// Pub/Sub gives up after this many delivery attempts; the last one
/// runs with `do_not_retry` so providers degrade instead of parking.
const MAX_DELIVERY_ATTEMPTS: u32 = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/activity", post(receive_activity))
}

/// Pub/Sub push envelope.
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: PushMessage,
    #[serde(default)]
    subscription: String,
    #[serde(rename = "deliveryAttempt", default)]
    delivery_attempt: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PushMessage {
    /// Base64-encoded `ActivityPayload` JSON.
    #[serde(default)]
    data: String,
    #[serde(rename = "messageId", alias = "message_id")]
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct PushParams {
    token: String,
}

async fn receive_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PushParams>,
    Json(envelope): Json<PushEnvelope>,
) -> StatusCode {
    // Security Check: the push subscription appends a shared token to
    // the endpoint URL; anything else is not Pub/Sub.
    if params.token != state.config.push_verify_token {
        tracing::warn!(
            subscription = %envelope.subscription,
            "Security Alert: Blocked push with invalid token"
        );
        return StatusCode::FORBIDDEN;
    }

    let message_id = envelope.message.message_id.clone();
    let do_not_retry = envelope
        .delivery_attempt
        .map(|n| n >= MAX_DELIVERY_ATTEMPTS)
        .unwrap_or(false);

    let payload = match decode_payload(&envelope.message.data) {
        Ok(p) => p,
        Err(e) => {
            // Never valid on redelivery, so ack it.
            tracing::error!(message_id = %message_id, error = %e, "Undecodable push message");
            return StatusCode::NO_CONTENT;
        }
    };

    // Loop check before any work: our own uploads echo back through
    // source webhooks on platforms that are both source and destination.
    // The activity may arrive by URI rather than inline; the external id
    // is recovered from the archive so slim payloads are checked too.
    if !payload.is_resume {
        if let Some(external_id) = resolve_external_id(&state, &payload).await {
            let bounced = is_bounceback_with_retry(
                state.store.as_ref(),
                &payload.user_id,
                payload.source,
                &external_id,
            )
            .await;
            if bounced {
                tracing::info!(
                    user_id = %payload.user_id,
                    external_id = %external_id,
                    "Dropping bounced-back activity"
                );
                return StatusCode::NO_CONTENT;
            }
        }
    }

    match state.orchestrator.process(&payload, &message_id, do_not_retry).await {
        Ok(result) => {
            if result.status == ExecutionStatus::Completed {
                if let Some(event) = result.event {
                    if let Err(e) = publish_enriched(&state, event).await {
                        tracing::error!(
                            run_id = %result.run_id,
                            error = %e,
                            "Failed to publish enriched event"
                        );
                        // Nack so the whole delivery is retried.
                        return StatusCode::INTERNAL_SERVER_ERROR;
                    }
                }
            }
            StatusCode::NO_CONTENT
        }
        Err(e) if e.is_non_retryable() || do_not_retry => {
            tracing::error!(
                message_id = %message_id,
                error = %e,
                "Dropping activity after unrecoverable failure"
            );
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            tracing::error!(message_id = %message_id, error = %e, "Processing failed; will retry");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// External id of the payload's activity, fetching the archived copy
/// when only a URI is carried. An unreadable archive skips the loop
/// check rather than blocking ingestion.
async fn resolve_external_id(state: &AppState, payload: &ActivityPayload) -> Option<String> {
    if let Some(activity) = &payload.activity {
        return Some(activity.external_id.clone());
    }
    let uri = payload.activity_uri.as_deref()?;

    let fetched: Result<StandardizedActivity> = async {
        let (bucket, object) = parse_gcs_uri(uri)?;
        let bytes = state.blob.get(bucket, object).await?;
        Ok(serde_json::from_slice(&bytes).map_err(anyhow::Error::from)?)
    }
    .await;

    match fetched {
        Ok(activity) => Some(activity.external_id),
        Err(e) => {
            tracing::warn!(uri = %uri, error = %e, "Could not resolve activity for loop check");
            None
        }
    }
}

fn decode_payload(data: &str) -> Result<ActivityPayload> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| AppError::BadRequest(format!("message data is not base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::BadRequest(format!("message data is not an activity payload: {e}")))
}

/// Offload the event if needed, then fan it out: one message per
/// destination topic.
pub(crate) async fn publish_enriched(
    state: &AppState,
    mut event: EnrichedActivityEvent,
) -> Result<()> {
    offload::maybe_offload(&mut event, state.blob.as_ref(), &state.config.payload_bucket).await?;

    let bytes = serde_json::to_vec(&event).map_err(anyhow::Error::from)?;
    let publishes = event.destinations.iter().map(|destination| {
        let topic = format!("{}-{}", state.config.topic_prefix, destination.id());
        let bytes = bytes.clone();
        let execution_id = event.pipeline_execution_id.clone();
        async move {
            state.publisher.publish(&topic, bytes).await?;
            tracing::info!(
                execution_id = %execution_id,
                topic = %topic,
                "Published enriched activity"
            );
            Ok::<_, crate::error::AppError>(())
        }
    });
    future::try_join_all(publishes).await?;
    Ok(())
}
