// SPDX-License-Identifier: MIT

//! Pending-input submission and deadline sweep.
//!
//! Submission resolves a parked run and immediately re-enters the
//! orchestrator in resume mode, so the user sees the outcome of their
//! input in one round trip.

use crate::error::Result;
use crate::services::orchestrator::ExecutionStatus;
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inputs/{id}", post(submit_input))
        .route("/inputs/sweep", post(sweep_expired))
}

#[derive(Serialize)]
struct SubmitResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
}

async fn submit_input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input_data): Json<Value>,
) -> Result<Json<SubmitResponse>> {
    let Some(resume) = state.resume.submit(&id, input_data).await? else {
        return Ok(Json(SubmitResponse {
            status: "SKIPPED",
            run_id: None,
        }));
    };

    let result = state
        .orchestrator
        .process(&resume.payload, &resume.base_execution_id, false)
        .await?;

    let status = match result.status {
        ExecutionStatus::Completed => {
            if let Some(event) = result.event {
                crate::routes::events::publish_enriched(&state, event).await?;
            }
            "RESUMED"
        }
        ExecutionStatus::Waiting => "WAITING",
        ExecutionStatus::Skipped => "SKIPPED",
    };

    Ok(Json(SubmitResponse {
        status,
        run_id: Some(result.run_id),
    }))
}

#[derive(Serialize)]
struct SweepResponse {
    dismissed: usize,
}

/// Called on a schedule; dismisses WAITING inputs past their deadline.
async fn sweep_expired(State(state): State<Arc<AppState>>) -> Result<Json<SweepResponse>> {
    let dismissed = state.resume.sweep_expired().await?;
    Ok(Json(SweepResponse { dismissed }))
}
