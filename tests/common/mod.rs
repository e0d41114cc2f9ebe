// SPDX-License-Identifier: MIT

//! Shared test fixtures: in-memory implementations of the storage and
//! publishing seams, a scriptable provider, and payload builders.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fitrelay::config::Config;
use fitrelay::db::DocumentStore;
use fitrelay::error::{AppError, Result};
use fitrelay::loop_prevention::UploadedActivityStore;
use fitrelay::models::activity::{
    ActivityType, Destination, Session, Source, StandardizedActivity,
};
use fitrelay::models::payload::{ActivityPayload, EnrichedActivityEvent};
use fitrelay::models::pending_input::{PendingInput, PendingInputStatus};
use fitrelay::models::pipeline::{EnricherConfig, PipelineConfig, ProviderType};
use fitrelay::models::run::{DestinationOutcome, PipelineRun, PipelineRunStatus};
use fitrelay::models::user::User;
use fitrelay::providers::{
    EnrichError, EnrichmentResult, Provider, ProviderRegistry, WaitForInput,
};
use fitrelay::pubsub::EventPublisher;
use fitrelay::services::{Orchestrator, ResumeCoordinator};
use fitrelay::storage::BlobStore;
use fitrelay::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

// ─── In-Memory Document Store ───────────────────────────────────

#[derive(Default)]
pub struct FakeStore {
    pub users: Mutex<HashMap<String, User>>,
    pub pipelines: Mutex<Vec<PipelineConfig>>,
    pub runs: Mutex<HashMap<String, PipelineRun>>,
    pub outcomes: Mutex<HashMap<String, DestinationOutcome>>,
    pub pending_inputs: Mutex<HashMap<String, PendingInput>>,
    pub uploaded: Mutex<HashMap<String, fitrelay::models::uploaded::UploadedActivityRecord>>,
    /// When set, every operation fails (for fail-open tests).
    pub fail_all: bool,
}

impl FakeStore {
    pub fn check(&self) -> Result<()> {
        if self.fail_all {
            Err(AppError::Database("unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn with_user_and_pipeline(pipeline: PipelineConfig) -> Self {
        let store = Self::default();
        let user_id = pipeline.user_id.clone();
        store.users.lock().unwrap().insert(user_id.clone(), test_user(&user_id));
        store.pipelines.lock().unwrap().push(pipeline);
        store
    }

    pub fn run(&self, run_id: &str) -> Option<PipelineRun> {
        self.runs.lock().unwrap().get(run_id).cloned()
    }

    pub fn pending(&self, id: &str) -> Option<PendingInput> {
        self.pending_inputs.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn get_user_pipelines(&self, user_id: &str) -> Result<Vec<PipelineConfig>> {
        self.check()?;
        Ok(self
            .pipelines
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_pipeline_run(&self, run_id: &str) -> Result<Option<PipelineRun>> {
        self.check()?;
        Ok(self.runs.lock().unwrap().get(run_id).cloned())
    }

    async fn upsert_pipeline_run(&self, run: &PipelineRun) -> Result<()> {
        self.check()?;
        self.runs.lock().unwrap().insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn set_run_status(
        &self,
        run_id: &str,
        status: PipelineRunStatus,
        status_message: Option<String>,
    ) -> Result<()> {
        self.check()?;
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| AppError::NotFound(format!("run {run_id}")))?;
        run.status = status;
        run.status_message = status_message;
        run.updated_at = Utc::now();
        Ok(())
    }

    async fn set_destination_outcome(&self, outcome: &DestinationOutcome) -> Result<()> {
        self.check()?;
        let key = format!("{}_{}", outcome.run_id, outcome.destination.id());
        self.outcomes.lock().unwrap().insert(key, outcome.clone());
        Ok(())
    }

    async fn get_destination_outcomes(&self, run_id: &str) -> Result<Vec<DestinationOutcome>> {
        self.check()?;
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn get_pending_input(&self, id: &str) -> Result<Option<PendingInput>> {
        self.check()?;
        Ok(self.pending_inputs.lock().unwrap().get(id).cloned())
    }

    async fn upsert_pending_input(&self, input: &PendingInput) -> Result<()> {
        self.check()?;
        self.pending_inputs
            .lock()
            .unwrap()
            .insert(input.id.clone(), input.clone());
        Ok(())
    }

    async fn delete_pending_input(&self, id: &str) -> Result<()> {
        self.check()?;
        self.pending_inputs.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_expired_pending_inputs(&self, now: DateTime<Utc>) -> Result<Vec<PendingInput>> {
        self.check()?;
        Ok(self
            .pending_inputs
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                p.status == PendingInputStatus::Waiting
                    && p.auto_resolve_deadline.map(|d| d < now).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UploadedActivityStore for FakeStore {
    async fn get_uploaded_activity(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<fitrelay::models::uploaded::UploadedActivityRecord>> {
        self.check()?;
        Ok(self
            .uploaded
            .lock()
            .unwrap()
            .get(&format!("{user_id}/{record_id}"))
            .cloned())
    }

    async fn put_uploaded_activity(
        &self,
        record: &fitrelay::models::uploaded::UploadedActivityRecord,
    ) -> Result<()> {
        self.check()?;
        self.uploaded
            .lock()
            .unwrap()
            .insert(format!("{}/{}", record.user_id, record.id), record.clone());
        Ok(())
    }
}

// ─── In-Memory Blob Store ───────────────────────────────────────

#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[allow(dead_code)]
    pub fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{object}"))
            .cloned()
    }

    #[allow(dead_code)]
    pub fn delete(&self, bucket: &str, object: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{bucket}/{object}"));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{object}"), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{object}"))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{bucket}/{object}")))
    }
}

// ─── Capturing Publisher ────────────────────────────────────────

#[derive(Default)]
pub struct CapturingPublisher {
    pub messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl CapturingPublisher {
    #[allow(dead_code)]
    pub fn published_events(&self) -> Vec<(String, EnrichedActivityEvent)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, bytes)| {
                (
                    topic.clone(),
                    serde_json::from_slice(bytes).expect("published message is an event"),
                )
            })
            .collect()
    }
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), data));
        Ok(())
    }
}

// ─── Scriptable Provider ────────────────────────────────────────

#[allow(dead_code)]
pub enum MockBehavior {
    Apply(EnrichmentResult),
    Wait(String),
    Halt(String),
    Fail(String),
}

/// Provider whose behavior is fixed at construction. Records every
/// working activity it sees, so tests can assert on sequencing.
pub struct MockProvider {
    ptype: ProviderType,
    behavior: MockBehavior,
    pub seen: Mutex<Vec<StandardizedActivity>>,
    pub resume_result: Option<EnrichmentResult>,
}

impl MockProvider {
    #[allow(dead_code)]
    pub fn new(ptype: ProviderType, behavior: MockBehavior) -> Self {
        Self {
            ptype,
            behavior,
            seen: Mutex::new(vec![]),
            resume_result: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_resume(mut self, result: EnrichmentResult) -> Self {
        self.resume_result = Some(result);
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.ptype.id()
    }

    fn provider_type(&self) -> ProviderType {
        self.ptype
    }

    async fn enrich(
        &self,
        activity: &StandardizedActivity,
        _user: &User,
        _config: &Value,
        _do_not_retry: bool,
    ) -> std::result::Result<EnrichmentResult, EnrichError> {
        self.seen.lock().unwrap().push(activity.clone());
        match &self.behavior {
            MockBehavior::Apply(result) => Ok(result.clone()),
            MockBehavior::Wait(prompt) => Err(EnrichError::WaitForInput(WaitForInput {
                prompt: prompt.clone(),
                deadline: Some(Utc::now() + chrono::Duration::hours(1)),
            })),
            MockBehavior::Halt(reason) => Err(EnrichError::Halt(reason.clone())),
            MockBehavior::Fail(msg) => Err(EnrichError::Fatal(msg.clone())),
        }
    }

    async fn enrich_resume(
        &self,
        activity: &StandardizedActivity,
        _user: &User,
        _pending_input: &PendingInput,
    ) -> std::result::Result<EnrichmentResult, EnrichError> {
        self.seen.lock().unwrap().push(activity.clone());
        match &self.resume_result {
            Some(result) => Ok(result.clone()),
            None => Err(EnrichError::ResumeUnsupported),
        }
    }
}

// ─── Fixtures ───────────────────────────────────────────────────

pub const TEST_BUCKET: &str = "test-payload-bucket";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        display_name: None,
        created_at: start_time(),
    }
}

#[allow(dead_code)]
pub fn test_activity(external_id: &str, elapsed: u64) -> StandardizedActivity {
    StandardizedActivity {
        external_id: external_id.to_string(),
        source: Source::Strava,
        name: "Morning Run".to_string(),
        description: String::new(),
        activity_type: ActivityType::Run,
        start_time: start_time(),
        sessions: vec![Session {
            start_time: start_time(),
            total_elapsed_time: elapsed,
            laps: vec![],
        }],
    }
}

#[allow(dead_code)]
pub fn test_pipeline(
    user_id: &str,
    id: &str,
    enrichers: Vec<ProviderType>,
    destinations: Vec<Destination>,
) -> PipelineConfig {
    PipelineConfig {
        id: id.to_string(),
        user_id: user_id.to_string(),
        source: Source::Strava,
        destinations,
        enrichers: enrichers
            .into_iter()
            .map(|provider_type| EnricherConfig {
                provider_type,
                config: serde_json::json!({}),
            })
            .collect(),
        disabled: false,
    }
}

#[allow(dead_code)]
pub fn test_payload(user_id: &str, pipeline_id: &str, activity: StandardizedActivity) -> ActivityPayload {
    ActivityPayload {
        source: Source::Strava,
        user_id: user_id.to_string(),
        timestamp: start_time(),
        original_payload: serde_json::json!({"raw": "webhook"}),
        activity: Some(activity),
        activity_uri: None,
        pipeline_id: pipeline_id.to_string(),
        is_resume: false,
        activity_id: None,
        resume_only_enrichers: vec![],
        resume_pending_input_id: None,
        use_update_method: false,
    }
}

// ─── Test Harness ───────────────────────────────────────────────

/// Everything a test needs, with handles kept on the fakes.
#[allow(dead_code)]
pub struct TestHarness {
    pub store: Arc<FakeStore>,
    pub blob: Arc<MemoryBlobStore>,
    pub publisher: Arc<CapturingPublisher>,
    pub orchestrator: Orchestrator,
    pub resume: ResumeCoordinator,
}

#[allow(dead_code)]
pub fn harness(store: FakeStore, providers: Vec<Arc<dyn Provider>>) -> TestHarness {
    let store = Arc::new(store);
    let blob = Arc::new(MemoryBlobStore::default());
    let publisher = Arc::new(CapturingPublisher::default());

    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }

    let orchestrator = Orchestrator::new(
        store.clone(),
        blob.clone(),
        Arc::new(registry),
        TEST_BUCKET,
    );
    let resume = ResumeCoordinator::new(store.clone(), blob.clone());

    TestHarness {
        store,
        blob,
        publisher,
        orchestrator,
        resume,
    }
}

/// Turn a harness into a routable app. Clone any fake handles you need
/// for assertions before calling this; the harness is consumed.
#[allow(dead_code)]
pub fn test_app(h: TestHarness) -> axum::Router {
    let state = Arc::new(AppState {
        config: Config::default(),
        store: h.store,
        blob: h.blob,
        publisher: h.publisher,
        orchestrator: h.orchestrator,
        resume: h.resume,
    });
    fitrelay::routes::create_router(state)
}

/// Create a test app with in-memory dependencies.
/// Returns the router plus handles on the fakes for assertions.
#[allow(dead_code)]
pub fn create_test_app(
    store: FakeStore,
    providers: Vec<Arc<dyn Provider>>,
) -> (axum::Router, Arc<FakeStore>, Arc<CapturingPublisher>) {
    let h = harness(store, providers);
    let (fake_store, publisher) = (h.store.clone(), h.publisher.clone());
    (test_app(h), fake_store, publisher)
}
