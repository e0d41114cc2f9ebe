// SPDX-License-Identifier: MIT

//! User account record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal user record; providers read per-user settings from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
