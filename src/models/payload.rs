// SPDX-License-Identifier: MIT

//! Wire types: the inbound activity payload and the outbound enriched
//! activity event.

use crate::models::activity::{ActivityType, Destination, Source, StandardizedActivity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Inbound message consumed by the orchestrator. Published by source
/// webhook adapters, and republished by the resume coordinator with the
/// resume fields filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub source: Source,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// Raw payload as received from the source platform, archived
    /// verbatim before any mutation.
    #[serde(default)]
    pub original_payload: Value,
    /// Normalized activity. Absent when `activity_uri` points at an
    /// archived copy instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<StandardizedActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_uri: Option<String>,
    /// The single pipeline this delivery targets.
    pub pipeline_id: String,

    // Resume fields, set only when re-entering after a pending input
    // is resolved.
    #[serde(default)]
    pub is_resume: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resume_only_enrichers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_pending_input_id: Option<String>,
    #[serde(default)]
    pub use_update_method: bool,
}

/// Outbound message published once per destination after enrichment.
///
/// Large activities are offloaded: `activity` is cleared and
/// `activity_data_uri` points at the full serialized event in blob
/// storage (see `services::offload`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedActivityEvent {
    pub user_id: String,
    pub source: Source,
    pub activity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<StandardizedActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_data_uri: Option<String>,

    // Summary fields retained inline even when the body is offloaded.
    pub name: String,
    pub description: String,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,

    #[serde(default)]
    pub applied_enrichments: Vec<String>,
    /// Later enrichers win on key collision.
    #[serde(default)]
    pub enrichment_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    pub pipeline_id: String,
    /// `{base_execution_id}-{pipeline_id}`; idempotency key for uploads.
    pub pipeline_execution_id: String,
}
