// SPDX-License-Identifier: MIT

//! Pending user input awaiting resolution.
//!
//! When an enricher needs data only the user can supply, the run parks
//! and a `PendingInput` is stored. Its id ties the input back to the
//! exact activity and provider that requested it.

use crate::error::AppError;
use crate::models::activity::Source;
use crate::models::pipeline::ProviderType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingInputStatus {
    /// Created by the orchestrator; awaiting user submission.
    Waiting,
    /// User submitted input; resume is in flight or done.
    Resolved,
    /// Deadline passed without input.
    Dismissed,
    /// Resume could not proceed (e.g. archived payload gone).
    Skipped,
}

/// One parked request for user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInput {
    /// `{source}:{external_id}:{provider}`.
    pub id: String,
    pub user_id: String,
    pub provider: ProviderType,
    pub status: PendingInputStatus,
    /// What the provider is asking for, shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// User-submitted data, present once RESOLVED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    /// After this instant the sweep dismisses the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_resolve_deadline: Option<DateTime<Utc>>,
    pub linked_activity_id: String,
    pub pipeline_id: String,
    /// Execution id of the run that parked, so the resume lands on the
    /// same run.
    pub base_execution_id: String,
    /// Archived inbound payload, reconstructed on resume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_payload_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Build a pending-input id from its three coordinates.
pub fn generate_id(source: Source, external_id: &str, provider: ProviderType) -> String {
    format!("{}:{}:{}", source.id(), external_id, provider.id())
}

/// Split a pending-input id back into `(source_id, external_id,
/// provider_id)`. External ids may themselves contain colons, so the
/// provider is taken from the last segment.
pub fn parse_id(id: &str) -> Result<(&str, &str, &str), AppError> {
    let (source, rest) = id
        .split_once(':')
        .ok_or_else(|| AppError::BadRequest(format!("malformed pending input id: {id}")))?;
    let (external_id, provider) = rest
        .rsplit_once(':')
        .ok_or_else(|| AppError::BadRequest(format!("malformed pending input id: {id}")))?;
    if source.is_empty() || external_id.is_empty() || provider.is_empty() {
        return Err(AppError::BadRequest(format!(
            "malformed pending input id: {id}"
        )));
    }
    Ok((source, external_id, provider))
}
