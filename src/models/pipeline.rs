// SPDX-License-Identifier: MIT

//! User pipeline configuration.

use crate::models::activity::{Destination, Source};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enrichment providers that can appear in a pipeline chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    UserInput,
    FitFileHeartRate,
    PaceSummary,
    HeartRateZones,
    /// Test-only provider, never registered in production.
    Mock,
}

impl ProviderType {
    pub fn id(&self) -> &'static str {
        match self {
            ProviderType::UserInput => "user_input",
            ProviderType::FitFileHeartRate => "fit_file_heart_rate",
            ProviderType::PaceSummary => "pace_summary",
            ProviderType::HeartRateZones => "heart_rate_zones",
            ProviderType::Mock => "mock",
        }
    }
}

/// One enricher entry in a pipeline chain, with provider-specific config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherConfig {
    pub provider_type: ProviderType,
    #[serde(default)]
    pub config: Value,
}

/// A user-configured pipeline: one source, an ordered enricher chain,
/// and a set of destinations to fan out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id: String,
    pub user_id: String,
    pub source: Source,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub enrichers: Vec<EnricherConfig>,
    #[serde(default)]
    pub disabled: bool,
}
