// SPDX-License-Identifier: MIT

//! Enrichment provider contract and registry.
//!
//! Providers are pure with respect to the pipeline: they receive the
//! working activity and return an [`EnrichmentResult`]; the orchestrator
//! owns all merging. A provider that needs data only the user can supply
//! returns [`EnrichError::WaitForInput`] and the run parks until the
//! input is resolved.

pub mod user_input;

use crate::models::activity::StandardizedActivity;
use crate::models::pending_input::PendingInput;
use crate::models::pipeline::ProviderType;
use crate::models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// What a provider contributes to the working activity. All fields are
/// optional; an empty result is a valid no-op.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentResult {
    /// Replacement activity name.
    pub name: Option<String>,
    /// Section content for the description. Placed under
    /// `section_header` when set, appended verbatim otherwise.
    pub description: Option<String>,
    /// Merged into the event metadata; later providers win.
    pub metadata: BTreeMap<String, String>,
    /// Per-second heart rate samples, spliced into the session records.
    pub heart_rate_stream: Vec<u32>,
    /// Named section owned by this provider, for idempotent re-runs.
    pub section_header: Option<String>,
}

/// Signal that a provider is parked on user input.
#[derive(Debug, Clone)]
pub struct WaitForInput {
    /// Shown to the user when asking for the input.
    pub prompt: String,
    /// Input is dismissed if not supplied by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

/// Provider failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// Not a failure: the run parks and resumes once input arrives.
    #[error("waiting for user input: {}", .0.prompt)]
    WaitForInput(WaitForInput),

    /// Controlled stop: the run is marked SKIPPED, not failed. Used by
    /// gating providers that decide an activity should not go out.
    #[error("pipeline halted: {0}")]
    Halt(String),

    /// Provider does not participate in resume.
    #[error("provider does not support resume")]
    ResumeUnsupported,

    #[error("{0}")]
    Fatal(String),
}

/// Contract every enrichment provider implements.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn provider_type(&self) -> ProviderType;

    /// Enrich the working activity. `do_not_retry` is set on the final
    /// delivery attempt; providers that would otherwise park on input
    /// should degrade to a no-op instead of parking forever.
    async fn enrich(
        &self,
        activity: &StandardizedActivity,
        user: &User,
        config: &Value,
        do_not_retry: bool,
    ) -> Result<EnrichmentResult, EnrichError>;

    /// Re-run after the pending input this provider requested was
    /// resolved. Providers that never park keep the default.
    async fn enrich_resume(
        &self,
        _activity: &StandardizedActivity,
        _user: &User,
        _pending_input: &PendingInput,
    ) -> Result<EnrichmentResult, EnrichError> {
        Err(EnrichError::ResumeUnsupported)
    }
}

/// Maps provider types to implementations. Built once in `main` by
/// explicit `register` calls; the orchestrator only sees this.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.provider_type(), provider);
    }

    pub fn get(&self, provider_type: ProviderType) -> Option<Arc<dyn Provider>> {
        self.providers.get(&provider_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
