// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod activity;
pub mod payload;
pub mod pending_input;
pub mod pipeline;
pub mod run;
pub mod uploaded;
pub mod user;

pub use activity::{
    ActivityType, Destination, Lap, Record, Session, Source, StandardizedActivity,
};
pub use payload::{ActivityPayload, EnrichedActivityEvent};
pub use pending_input::{PendingInput, PendingInputStatus};
pub use pipeline::{EnricherConfig, PipelineConfig, ProviderType};
pub use run::{
    compute_run_status, DestinationOutcome, DestinationStatus, PipelineRun, PipelineRunStatus,
    ProviderExecution,
};
pub use uploaded::UploadedActivityRecord;
pub use user::User;
