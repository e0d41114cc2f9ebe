// SPDX-License-Identifier: MIT

//! Built-in provider that lets the user title and describe an activity
//! before it is uploaded.
//!
//! On a fresh run it always parks: there is nothing to compute, the
//! provider exists purely to hold the pipeline open for user input. On
//! resume it passes the submitted fields through.

use crate::models::activity::StandardizedActivity;
use crate::models::pending_input::PendingInput;
use crate::models::pipeline::ProviderType;
use crate::models::user::User;
use crate::providers::{EnrichError, EnrichmentResult, Provider, WaitForInput};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_PROMPT: &str = "Add a title and description for this activity";
const DEFAULT_DEADLINE_HOURS: i64 = 48;

#[derive(Debug, Deserialize, Default)]
struct UserInputConfig {
    #[serde(default)]
    prompt: Option<String>,
    /// Hours until the pending input is auto-dismissed.
    #[serde(default)]
    deadline_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SubmittedInput {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub struct UserInputProvider;

#[async_trait]
impl Provider for UserInputProvider {
    fn name(&self) -> &'static str {
        "user_input"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::UserInput
    }

    async fn enrich(
        &self,
        _activity: &StandardizedActivity,
        _user: &User,
        config: &Value,
        do_not_retry: bool,
    ) -> Result<EnrichmentResult, EnrichError> {
        // Final delivery attempt: don't park a run that can no longer
        // be resumed through redelivery.
        if do_not_retry {
            return Ok(EnrichmentResult::default());
        }

        let config: UserInputConfig = serde_json::from_value(config.clone())
            .map_err(|e| EnrichError::Fatal(format!("invalid user_input config: {e}")))?;

        let deadline_hours = config.deadline_hours.unwrap_or(DEFAULT_DEADLINE_HOURS);
        Err(EnrichError::WaitForInput(WaitForInput {
            prompt: config.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            deadline: Some(Utc::now() + Duration::hours(deadline_hours)),
        }))
    }

    async fn enrich_resume(
        &self,
        _activity: &StandardizedActivity,
        _user: &User,
        pending_input: &PendingInput,
    ) -> Result<EnrichmentResult, EnrichError> {
        let data = pending_input
            .input_data
            .clone()
            .ok_or_else(|| EnrichError::Fatal("pending input has no input data".to_string()))?;

        let input: SubmittedInput = serde_json::from_value(data)
            .map_err(|e| EnrichError::Fatal(format!("invalid user input data: {e}")))?;

        Ok(EnrichmentResult {
            name: input.name.filter(|n| !n.trim().is_empty()),
            description: input.description.filter(|d| !d.trim().is_empty()),
            ..Default::default()
        })
    }
}
