// SPDX-License-Identifier: MIT

//! Pending-input resume coordinator.
//!
//! Takes a user's submission for a parked run, marks the input
//! resolved, reconstructs the archived inbound payload, and hands back
//! a resume payload that re-enters the orchestrator against the same
//! run. Also sweeps inputs whose deadline passed.

use crate::db::{pending_input_accepts_submission, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::payload::ActivityPayload;
use crate::models::pending_input::{self, PendingInput, PendingInputStatus};
use crate::storage::{parse_gcs_uri, BlobStore};
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// A resume ready to feed back into the orchestrator: the payload plus
/// the base execution id recorded when the run parked.
#[derive(Debug)]
pub struct ResumeRequest {
    pub payload: ActivityPayload,
    pub base_execution_id: String,
}

pub struct ResumeCoordinator {
    store: Arc<dyn DocumentStore>,
    blob: Arc<dyn BlobStore>,
}

impl ResumeCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, blob: Arc<dyn BlobStore>) -> Self {
        Self { store, blob }
    }

    /// Accept user input for a parked run.
    ///
    /// Validation happens before any write, so malformed submissions
    /// leave the input WAITING and the user can try again. A missing
    /// archived payload is the one unrecoverable case: the input is
    /// marked SKIPPED and `Ok(None)` comes back.
    pub async fn submit(
        &self,
        pending_input_id: &str,
        input_data: Value,
    ) -> Result<Option<ResumeRequest>> {
        pending_input::parse_id(pending_input_id)?;
        validate_input_data(&input_data)?;

        let mut input = self
            .store
            .get_pending_input(pending_input_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("pending input {pending_input_id} not found"))
            })?;

        if !pending_input_accepts_submission(&input) {
            return Err(AppError::BadRequest(format!(
                "pending input {pending_input_id} is not waiting for input"
            )));
        }

        let Some(archived) = self.fetch_archived_payload(&input).await else {
            tracing::warn!(
                pending_input_id = %pending_input_id,
                "Archived payload unavailable; skipping pending input"
            );
            input.status = PendingInputStatus::Skipped;
            input.updated_at = Utc::now();
            self.store.upsert_pending_input(&input).await?;
            return Ok(None);
        };

        input.status = PendingInputStatus::Resolved;
        input.input_data = Some(input_data);
        input.updated_at = Utc::now();
        self.store.upsert_pending_input(&input).await?;

        tracing::info!(
            pending_input_id = %pending_input_id,
            base_execution_id = %input.base_execution_id,
            "Pending input resolved; resuming run"
        );

        Ok(Some(build_resume_request(&input, archived)))
    }

    /// Dismiss WAITING inputs whose deadline has passed. Returns how
    /// many were dismissed.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let expired = self.store.list_expired_pending_inputs(Utc::now()).await?;
        let count = expired.len();

        for mut input in expired {
            tracing::info!(pending_input_id = %input.id, "Dismissing expired pending input");
            input.status = PendingInputStatus::Dismissed;
            input.updated_at = Utc::now();
            self.store.upsert_pending_input(&input).await?;
        }

        Ok(count)
    }

    async fn fetch_archived_payload(&self, input: &PendingInput) -> Option<ActivityPayload> {
        let uri = input.original_payload_uri.as_deref()?;
        let (bucket, object) = parse_gcs_uri(uri).ok()?;
        let bytes = self.blob.get(bucket, object).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Archived payload is unreadable");
                None
            }
        }
    }
}

fn build_resume_request(input: &PendingInput, mut payload: ActivityPayload) -> ResumeRequest {
    payload.is_resume = true;
    payload.activity_id = Some(input.linked_activity_id.clone());
    payload.resume_only_enrichers = vec![input.provider.id().to_string()];
    payload.resume_pending_input_id = Some(input.id.clone());
    payload.use_update_method = true;
    payload.pipeline_id = input.pipeline_id.clone();

    ResumeRequest {
        payload,
        base_execution_id: input.base_execution_id.clone(),
    }
}

/// Reject submissions whose declared binary fields don't decode, before
/// anything is persisted. Keys ending in `_base64` carry file content.
fn validate_input_data(input_data: &Value) -> Result<()> {
    let Some(object) = input_data.as_object() else {
        return Err(AppError::BadRequest(
            "input data must be a JSON object".to_string(),
        ));
    };

    for (key, value) in object {
        if !key.ends_with("_base64") {
            continue;
        }
        let Some(encoded) = value.as_str() else {
            return Err(AppError::BadRequest(format!(
                "input field {key} must be a base64 string"
            )));
        };
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AppError::BadRequest(format!("input field {key} is not valid base64: {e}")))?;
    }

    Ok(())
}
