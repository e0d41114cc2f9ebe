// SPDX-License-Identifier: MIT

//! Record of an activity this system uploaded to a destination.
//!
//! Consulted by the loop prevention guard: an inbound webhook whose
//! external id matches one of these records is our own upload bouncing
//! back.

use crate::models::activity::Destination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedActivityRecord {
    /// `{destination}_{external_id}`.
    pub id: String,
    pub user_id: String,
    pub destination: Destination,
    /// Id assigned by the destination platform.
    pub external_id: String,
    pub pipeline_execution_id: String,
    pub uploaded_at: DateTime<Utc>,
}
