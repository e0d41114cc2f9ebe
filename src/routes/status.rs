// SPDX-License-Identifier: MIT

//! Destination-status callback.
//!
//! Uploader services report the terminal state of each upload here.
//! Each callback writes its own outcome document, then reduces all
//! outcomes for the run into the run status, so concurrent callbacks
//! for different destinations never interfere.

use crate::error::{AppError, Result};
use crate::loop_prevention::build_uploaded_activity_id;
use crate::models::activity::Destination;
use crate::models::run::{compute_run_status, DestinationOutcome, DestinationStatus, PipelineRunStatus};
use crate::models::uploaded::UploadedActivityRecord;
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/callbacks/destination-status", post(destination_status))
}

#[derive(Debug, Deserialize)]
struct StatusCallback {
    run_id: String,
    destination: Destination,
    status: DestinationStatus,
    /// Platform-assigned id, present on SUCCESS.
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    run_status: PipelineRunStatus,
}

async fn destination_status(
    State(state): State<Arc<AppState>>,
    Json(callback): Json<StatusCallback>,
) -> Result<Json<StatusResponse>> {
    let run = state
        .store
        .get_pipeline_run(&callback.run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("run {} not found", callback.run_id)))?;

    state
        .store
        .set_destination_outcome(&DestinationOutcome {
            run_id: callback.run_id.clone(),
            destination: callback.destination,
            status: callback.status,
            external_id: callback.external_id.clone(),
            error: callback.error.clone(),
            updated_at: Utc::now(),
        })
        .await?;

    // Successful uploads feed the loop prevention guard: the next
    // webhook carrying this external id is our own upload.
    if callback.status == DestinationStatus::Success {
        if let Some(external_id) = &callback.external_id {
            state
                .store
                .put_uploaded_activity(&UploadedActivityRecord {
                    id: build_uploaded_activity_id(callback.destination, external_id),
                    user_id: run.user_id.clone(),
                    destination: callback.destination,
                    external_id: external_id.clone(),
                    pipeline_execution_id: callback.run_id.clone(),
                    uploaded_at: Utc::now(),
                })
                .await?;
        } else {
            tracing::warn!(
                run_id = %callback.run_id,
                destination = callback.destination.id(),
                "SUCCESS callback without external id; loop prevention blind spot"
            );
        }
    }

    let outcomes = state
        .store
        .get_destination_outcomes(&callback.run_id)
        .await?;
    let statuses: Vec<DestinationStatus> = outcomes.iter().map(|o| o.status).collect();
    let run_status = compute_run_status(&statuses);

    state
        .store
        .set_run_status(&callback.run_id, run_status, None)
        .await?;

    tracing::info!(
        run_id = %callback.run_id,
        destination = callback.destination.id(),
        status = ?callback.status,
        run_status = ?run_status,
        "Destination status recorded"
    );

    Ok(Json(StatusResponse { run_status }))
}
