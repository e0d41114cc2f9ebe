// SPDX-License-Identifier: MIT

//! Pipeline run tracking.
//!
//! One `PipelineRun` document per pipeline execution, plus one
//! `DestinationOutcome` document per destination so concurrent uploader
//! callbacks never clobber each other's fields.

use crate::models::activity::{Destination, Source};
use crate::models::pipeline::ProviderType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate status of a pipeline run, reduced from the per-destination
/// outcomes by `compute_run_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineRunStatus {
    /// Enrichment in progress, or at least one upload still pending.
    Running,
    /// Every destination uploaded successfully.
    Synced,
    /// Some destinations succeeded, some failed.
    Partial,
    /// Every destination failed.
    Failed,
    /// Waiting on user input before enrichment can continue.
    Pending,
    /// No matching pipeline, or every destination skipped.
    Skipped,
    /// Set by the retention job; never produced by the pipeline itself.
    Archived,
}

/// Terminal (or pending) state of one destination upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestinationStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

/// Per-destination outcome, stored as its own document keyed
/// `{run_id}_{destination}` so uploader callbacks update disjoint docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationOutcome {
    pub run_id: String,
    pub destination: Destination,
    pub status: DestinationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a single enricher within a run, persisted for visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderExecution {
    pub provider: ProviderType,
    /// "SUCCESS", "FAILED", "WAITING" or "SKIPPED".
    pub status: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// One pipeline execution, keyed by `{base_execution_id}-{pipeline_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub user_id: String,
    pub pipeline_id: String,
    pub source: Source,
    pub activity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    pub status: PipelineRunStatus,
    /// Human-readable note, e.g. which input the run is waiting on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub executions: Vec<ProviderExecution>,
    /// Archived copy of the inbound payload, when the archive write
    /// succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_payload_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reduce per-destination statuses to a run status.
///
/// PENDING anywhere keeps the run RUNNING; otherwise all-SUCCESS is
/// SYNCED, all-FAILED is FAILED, all-SKIPPED is SKIPPED, and any
/// SUCCESS/FAILED mix is PARTIAL. An empty outcome set means the run is
/// still being set up, so it stays RUNNING.
pub fn compute_run_status(outcomes: &[DestinationStatus]) -> PipelineRunStatus {
    if outcomes.is_empty() || outcomes.contains(&DestinationStatus::Pending) {
        return PipelineRunStatus::Running;
    }

    let any_success = outcomes.contains(&DestinationStatus::Success);
    let any_failed = outcomes.contains(&DestinationStatus::Failed);

    match (any_success, any_failed) {
        (true, false) => PipelineRunStatus::Synced,
        (true, true) => PipelineRunStatus::Partial,
        (false, true) => PipelineRunStatus::Failed,
        // Only SKIPPED outcomes remain.
        (false, false) => PipelineRunStatus::Skipped,
    }
}
