// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.

use std::env;

/// Default Pub/Sub topic prefix for enriched activity events.
/// One topic exists per destination: `{prefix}-{destination}`.
pub const ENRICHED_TOPIC_PREFIX: &str = "enriched-activities";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Bucket for payload archives and offloaded enriched events
    pub payload_bucket: String,
    /// Shared token appended to the Pub/Sub push endpoint URL
    pub push_verify_token: String,
    /// Topic prefix for per-destination enriched activity topics
    pub topic_prefix: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            payload_bucket: "test-payload-bucket".to_string(),
            push_verify_token: "test_push_token".to_string(),
            topic_prefix: ENRICHED_TOPIC_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            payload_bucket: env::var("PAYLOAD_BUCKET")
                .map_err(|_| ConfigError::Missing("PAYLOAD_BUCKET"))?,
            push_verify_token: env::var("PUSH_VERIFY_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("PUSH_VERIFY_TOKEN"))?,
            topic_prefix: env::var("TOPIC_PREFIX")
                .unwrap_or_else(|_| ENRICHED_TOPIC_PREFIX.to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
