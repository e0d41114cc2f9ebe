// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

use crate::error::Result;
use crate::loop_prevention::UploadedActivityStore;
use crate::models::pending_input::{PendingInput, PendingInputStatus};
use crate::models::pipeline::PipelineConfig;
use crate::models::run::{DestinationOutcome, PipelineRun, PipelineRunStatus};
use crate::models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PIPELINES: &str = "pipelines";
    pub const PIPELINE_RUNS: &str = "pipeline_runs";
    /// One document per (run, destination), keyed `{run_id}_{destination}`.
    pub const DESTINATION_OUTCOMES: &str = "destination_outcomes";
    pub const PENDING_INPUTS: &str = "pending_inputs";
    /// Loop prevention records (keyed `{destination}_{external_id}`).
    pub const UPLOADED_ACTIVITIES: &str = "uploaded_activities";
}

/// Document access the pipeline core needs.
///
/// The orchestrator and resume coordinator only see this trait, so unit
/// tests run against in-memory fakes; `FirestoreDb` is the production
/// implementation.
#[async_trait]
pub trait DocumentStore: UploadedActivityStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// All pipeline configurations owned by a user.
    async fn get_user_pipelines(&self, user_id: &str) -> Result<Vec<PipelineConfig>>;

    async fn get_pipeline_run(&self, run_id: &str) -> Result<Option<PipelineRun>>;

    async fn upsert_pipeline_run(&self, run: &PipelineRun) -> Result<()>;

    /// Field-level status update; never touches the rest of the run
    /// document.
    async fn set_run_status(
        &self,
        run_id: &str,
        status: PipelineRunStatus,
        status_message: Option<String>,
    ) -> Result<()>;

    async fn set_destination_outcome(&self, outcome: &DestinationOutcome) -> Result<()>;

    async fn get_destination_outcomes(&self, run_id: &str) -> Result<Vec<DestinationOutcome>>;

    async fn get_pending_input(&self, id: &str) -> Result<Option<PendingInput>>;

    async fn upsert_pending_input(&self, input: &PendingInput) -> Result<()>;

    async fn delete_pending_input(&self, id: &str) -> Result<()>;

    /// WAITING inputs whose deadline is in the past, for the sweep.
    async fn list_expired_pending_inputs(&self, now: DateTime<Utc>) -> Result<Vec<PendingInput>>;
}

/// Shared status-transition check: only WAITING inputs accept input.
pub fn pending_input_accepts_submission(input: &PendingInput) -> bool {
    input.status == PendingInputStatus::Waiting
}
