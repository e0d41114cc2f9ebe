// SPDX-License-Identifier: MIT

//! Pipeline orchestrator.
//!
//! Drives one activity through one pipeline: resolve the pipeline and
//! user, archive the inbound payload, run the enricher chain over a
//! working copy of the activity, and hand back the enriched event for
//! per-destination publication. Uploads themselves happen in separate
//! uploader services that report back via the destination-status
//! callback.

use crate::db::DocumentStore;
use crate::description;
use crate::error::{AppError, Result};
use crate::loop_prevention::corresponding_destination;
use crate::models::activity::{Lap, Record, Session, StandardizedActivity};
use crate::models::payload::{ActivityPayload, EnrichedActivityEvent};
use crate::models::pending_input::{self, PendingInput, PendingInputStatus};
use crate::models::pipeline::{EnricherConfig, PipelineConfig};
use crate::models::run::{
    DestinationOutcome, DestinationStatus, PipelineRun, PipelineRunStatus, ProviderExecution,
};
use crate::models::user::User;
use crate::providers::{EnrichError, ProviderRegistry};
use crate::storage::{gcs_uri, parse_gcs_uri, BlobStore};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// How one pipeline execution ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Enrichment finished; the event is ready to publish.
    Completed,
    /// Nothing to do (no matching pipeline, disabled, wrong source).
    Skipped,
    /// Parked on user input; no event.
    Waiting,
}

/// Outcome of [`Orchestrator::process`].
#[derive(Debug)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub run_id: String,
    pub event: Option<EnrichedActivityEvent>,
}

impl ExecutionResult {
    fn without_event(status: ExecutionStatus, run_id: String) -> Self {
        Self {
            status,
            run_id,
            event: None,
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    blob: Arc<dyn BlobStore>,
    registry: Arc<ProviderRegistry>,
    payload_bucket: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blob: Arc<dyn BlobStore>,
        registry: Arc<ProviderRegistry>,
        payload_bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            blob,
            registry,
            payload_bucket: payload_bucket.into(),
        }
    }

    /// Run one activity through the pipeline named by the payload.
    ///
    /// `base_execution_id` is the Pub/Sub message id (or, on resume, the
    /// id recorded when the run parked), so redeliveries and resumes
    /// land on the same run document. `do_not_retry` marks the final
    /// delivery attempt.
    pub async fn process(
        &self,
        payload: &ActivityPayload,
        base_execution_id: &str,
        do_not_retry: bool,
    ) -> Result<ExecutionResult> {
        let execution_id = format!("{}-{}", base_execution_id, payload.pipeline_id);

        tracing::info!(
            user_id = %payload.user_id,
            pipeline_id = %payload.pipeline_id,
            execution_id = %execution_id,
            is_resume = payload.is_resume,
            "Processing activity"
        );

        let activity = self.resolve_activity(payload).await?;

        // Shape problems never improve on redelivery; reject before any
        // pipeline bookkeeping.
        if let Err(e) = activity.validate() {
            self.persist_terminal_run(
                payload,
                &execution_id,
                PipelineRunStatus::Failed,
                &e.to_string(),
            )
            .await?;
            return Err(e);
        }

        // Resolve the pipeline. A delivery with no matching pipeline is
        // not an error: the config may have been deleted after publish.
        let pipeline = self.find_pipeline(payload).await?;
        let pipeline = match pipeline {
            PipelineLookup::Found(p) => p,
            PipelineLookup::Skip(reason) => {
                tracing::info!(
                    pipeline_id = %payload.pipeline_id,
                    reason = %reason,
                    "Skipping delivery"
                );
                self.persist_terminal_run(
                    payload,
                    &execution_id,
                    PipelineRunStatus::Skipped,
                    &reason,
                )
                .await?;
                return Ok(ExecutionResult::without_event(
                    ExecutionStatus::Skipped,
                    execution_id,
                ));
            }
        };

        let activity_id = payload
            .activity_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut run = self
            .initial_run(payload, &pipeline, &execution_id, &activity_id)
            .await?;
        self.store.upsert_pipeline_run(&run).await?;
        self.seed_outcomes(&run).await?;

        // Archive the inbound payload before anything mutates, so a
        // parked run can be replayed later. Best-effort.
        run.original_payload_uri = self.archive_payload(payload, &activity_id).await;
        if run.original_payload_uri.is_some() {
            self.store.upsert_pipeline_run(&run).await?;
        }

        let user = match self.store.get_user(&payload.user_id).await? {
            Some(u) => u,
            None => {
                let msg = format!("user {} not found", payload.user_id);
                self.store
                    .set_run_status(&run.id, PipelineRunStatus::Failed, Some(msg.clone()))
                    .await?;
                return Err(AppError::NotFound(msg));
            }
        };

        if !payload.is_resume {
            self.clear_stale_inputs(payload, &pipeline, &activity).await?;
        }

        let resumed_input = self.load_resumed_input(payload).await?;

        // Enrichment works on a deep copy; the inbound activity stays
        // untouched for archival and retries.
        let mut working = activity.clone();
        let mut metadata: BTreeMap<String, String> = BTreeMap::new();
        let mut applied: Vec<String> = Vec::new();

        for cfg in self.enrichers_to_run(payload, &pipeline) {
            let outcome = self
                .run_enricher(
                    payload,
                    &cfg,
                    &mut working,
                    &user,
                    resumed_input.as_ref(),
                    do_not_retry,
                )
                .await;

            match outcome {
                EnricherOutcome::Applied(execution, name) => {
                    for (k, v) in &execution.metadata {
                        metadata.insert(k.clone(), v.clone());
                    }
                    applied.push(name);
                    run.executions.push(execution);
                }
                EnricherOutcome::Waiting(execution, wait_prompt) => {
                    run.executions.push(execution);
                    self.park_run(payload, &mut run, &activity, &cfg, &wait_prompt)
                        .await?;
                    return Ok(ExecutionResult::without_event(
                        ExecutionStatus::Waiting,
                        run.id,
                    ));
                }
                EnricherOutcome::Halted(execution, reason) => {
                    tracing::info!(
                        run_id = %run.id,
                        provider = execution.provider.id(),
                        reason = %reason,
                        "Pipeline halted by enricher"
                    );
                    run.executions.push(execution);
                    run.status = PipelineRunStatus::Skipped;
                    run.status_message = Some(reason);
                    run.updated_at = Utc::now();
                    self.store.upsert_pipeline_run(&run).await?;
                    return Ok(ExecutionResult::without_event(
                        ExecutionStatus::Skipped,
                        run.id,
                    ));
                }
                EnricherOutcome::Failed(execution, error) => {
                    run.executions.push(execution);
                    run.status = PipelineRunStatus::Failed;
                    run.status_message = Some(error.to_string());
                    run.updated_at = Utc::now();
                    self.store.upsert_pipeline_run(&run).await?;
                    return Err(error);
                }
            }
        }

        self.tag_destination_metadata(payload, &pipeline, &mut metadata);

        let event = EnrichedActivityEvent {
            user_id: payload.user_id.clone(),
            source: payload.source,
            activity_id: activity_id.clone(),
            name: working.name.clone(),
            description: working.description.clone(),
            activity_type: working.activity_type,
            start_time: working.start_time,
            activity: Some(working),
            activity_data_uri: None,
            applied_enrichments: applied,
            enrichment_metadata: metadata,
            destinations: pipeline.destinations.clone(),
            pipeline_id: pipeline.id.clone(),
            pipeline_execution_id: execution_id.clone(),
        };

        run.activity_name = Some(event.name.clone());
        run.status = PipelineRunStatus::Running;
        run.status_message = None;
        run.updated_at = Utc::now();
        self.store.upsert_pipeline_run(&run).await?;

        tracing::info!(
            execution_id = %execution_id,
            enrichers = event.applied_enrichments.len(),
            destinations = event.destinations.len(),
            "Enrichment complete"
        );

        Ok(ExecutionResult {
            status: ExecutionStatus::Completed,
            run_id: execution_id,
            event: Some(event),
        })
    }

    // ─── Pipeline Resolution ─────────────────────────────────────

    async fn find_pipeline(&self, payload: &ActivityPayload) -> Result<PipelineLookup> {
        let pipelines = self.store.get_user_pipelines(&payload.user_id).await?;
        let Some(pipeline) = pipelines.into_iter().find(|p| p.id == payload.pipeline_id) else {
            return Ok(PipelineLookup::Skip("no matching pipeline".to_string()));
        };

        if pipeline.disabled {
            return Ok(PipelineLookup::Skip("pipeline disabled".to_string()));
        }
        if pipeline.source != payload.source {
            return Ok(PipelineLookup::Skip(format!(
                "pipeline source {} does not match payload source {}",
                pipeline.source.id(),
                payload.source.id()
            )));
        }

        Ok(PipelineLookup::Found(pipeline))
    }

    /// Record a run that never reached enrichment (skipped delivery or
    /// rejected activity).
    async fn persist_terminal_run(
        &self,
        payload: &ActivityPayload,
        execution_id: &str,
        status: PipelineRunStatus,
        reason: &str,
    ) -> Result<()> {
        let now = Utc::now();
        self.store
            .upsert_pipeline_run(&PipelineRun {
                id: execution_id.to_string(),
                user_id: payload.user_id.clone(),
                pipeline_id: payload.pipeline_id.clone(),
                source: payload.source,
                activity_id: payload.activity_id.clone().unwrap_or_default(),
                activity_name: None,
                status,
                status_message: Some(reason.to_string()),
                destinations: vec![],
                executions: vec![],
                original_payload_uri: None,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    // ─── Activity Resolution ─────────────────────────────────────

    /// The activity arrives inline or as a URI to an archived copy.
    async fn resolve_activity(&self, payload: &ActivityPayload) -> Result<StandardizedActivity> {
        if let Some(activity) = &payload.activity {
            return Ok(activity.clone());
        }

        let Some(uri) = &payload.activity_uri else {
            return Err(AppError::BadRequest(
                "payload carries neither activity nor activity_uri".to_string(),
            ));
        };

        let (bucket, object) = parse_gcs_uri(uri)?;
        let bytes = self.blob.get(bucket, object).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("archived activity is unreadable: {e}")))
    }

    async fn initial_run(
        &self,
        payload: &ActivityPayload,
        pipeline: &PipelineConfig,
        execution_id: &str,
        activity_id: &str,
    ) -> Result<PipelineRun> {
        let now = Utc::now();

        // A resume lands on the run that parked; keep its history.
        let existing = if payload.is_resume {
            self.store.get_pipeline_run(execution_id).await?
        } else {
            None
        };

        Ok(match existing {
            Some(mut run) => {
                run.status = PipelineRunStatus::Running;
                run.status_message = None;
                run.updated_at = now;
                run
            }
            None => PipelineRun {
                id: execution_id.to_string(),
                user_id: payload.user_id.clone(),
                pipeline_id: pipeline.id.clone(),
                source: payload.source,
                activity_id: activity_id.to_string(),
                activity_name: None,
                status: PipelineRunStatus::Running,
                status_message: None,
                destinations: pipeline.destinations.clone(),
                executions: vec![],
                original_payload_uri: None,
                created_at: now,
                updated_at: now,
            },
        })
    }

    async fn seed_outcomes(&self, run: &PipelineRun) -> Result<()> {
        for destination in &run.destinations {
            self.store
                .set_destination_outcome(&DestinationOutcome {
                    run_id: run.id.clone(),
                    destination: *destination,
                    status: DestinationStatus::Pending,
                    external_id: None,
                    error: None,
                    updated_at: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    async fn archive_payload(
        &self,
        payload: &ActivityPayload,
        activity_id: &str,
    ) -> Option<String> {
        let object = format!("payloads/{}/{}.json", payload.user_id, activity_id);
        let bytes = match serde_json::to_vec(payload) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize payload for archive");
                return None;
            }
        };

        match self.blob.put(&self.payload_bucket, &object, bytes).await {
            Ok(()) => Some(gcs_uri(&self.payload_bucket, &object)),
            Err(e) => {
                tracing::warn!(
                    activity_id = %activity_id,
                    error = %e,
                    "Failed to archive inbound payload"
                );
                None
            }
        }
    }

    // ─── Enrichment ──────────────────────────────────────────────

    fn enrichers_to_run(
        &self,
        payload: &ActivityPayload,
        pipeline: &PipelineConfig,
    ) -> Vec<EnricherConfig> {
        pipeline
            .enrichers
            .iter()
            .filter(|cfg| {
                if payload.is_resume && !payload.resume_only_enrichers.is_empty() {
                    payload
                        .resume_only_enrichers
                        .iter()
                        .any(|name| name == cfg.provider_type.id())
                } else {
                    true
                }
            })
            .cloned()
            .collect()
    }

    async fn run_enricher(
        &self,
        payload: &ActivityPayload,
        cfg: &EnricherConfig,
        working: &mut StandardizedActivity,
        user: &User,
        resumed_input: Option<&PendingInput>,
        do_not_retry: bool,
    ) -> EnricherOutcome {
        let Some(provider) = self.registry.get(cfg.provider_type) else {
            let error = AppError::Enricher(format!(
                "provider {} is not registered",
                cfg.provider_type.id()
            ));
            return EnricherOutcome::Failed(
                ProviderExecution {
                    provider: cfg.provider_type,
                    status: "FAILED".to_string(),
                    duration_ms: 0,
                    error: Some(error.to_string()),
                    metadata: BTreeMap::new(),
                },
                error,
            );
        };

        let started = Instant::now();

        // The provider that parked this run gets the resolved input;
        // everything else runs its normal path.
        let owns_resume = resumed_input
            .map(|input| input.provider == cfg.provider_type)
            .unwrap_or(false);

        let result = match resumed_input {
            Some(input) if owns_resume => provider.enrich_resume(working, user, input).await,
            _ => provider.enrich(working, user, &cfg.config, do_not_retry).await,
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(enrichment) => {
                apply_enrichment(working, &enrichment);
                let mut metadata = enrichment.metadata;
                // Update-mode uploaders patch only this provider's
                // section in the destination's live description.
                if let Some(header) = enrichment.section_header {
                    metadata.insert(
                        format!("section_header_{}", cfg.provider_type.id()),
                        header,
                    );
                }
                EnricherOutcome::Applied(
                    ProviderExecution {
                        provider: cfg.provider_type,
                        status: "SUCCESS".to_string(),
                        duration_ms,
                        error: None,
                        metadata,
                    },
                    provider.name().to_string(),
                )
            }
            Err(EnrichError::WaitForInput(wait)) => EnricherOutcome::Waiting(
                ProviderExecution {
                    provider: cfg.provider_type,
                    status: "WAITING".to_string(),
                    duration_ms,
                    error: None,
                    metadata: BTreeMap::new(),
                },
                wait,
            ),
            Err(EnrichError::Halt(reason)) => EnricherOutcome::Halted(
                ProviderExecution {
                    provider: cfg.provider_type,
                    status: "SKIPPED".to_string(),
                    duration_ms,
                    error: None,
                    metadata: BTreeMap::new(),
                },
                reason,
            ),
            Err(e @ (EnrichError::Fatal(_) | EnrichError::ResumeUnsupported)) => {
                tracing::error!(
                    provider = provider.name(),
                    user_id = %payload.user_id,
                    error = %e,
                    "Enricher failed"
                );
                let error = AppError::Enricher(format!("{}: {}", provider.name(), e));
                EnricherOutcome::Failed(
                    ProviderExecution {
                        provider: cfg.provider_type,
                        status: "FAILED".to_string(),
                        duration_ms,
                        error: Some(e.to_string()),
                        metadata: BTreeMap::new(),
                    },
                    error,
                )
            }
        }
    }

    // ─── Pending Input Handling ──────────────────────────────────

    /// A fresh run invalidates inputs parked by earlier deliveries of
    /// the same activity, so the user can submit something different.
    async fn clear_stale_inputs(
        &self,
        payload: &ActivityPayload,
        pipeline: &PipelineConfig,
        activity: &StandardizedActivity,
    ) -> Result<()> {
        for cfg in &pipeline.enrichers {
            let id = pending_input::generate_id(
                payload.source,
                &activity.external_id,
                cfg.provider_type,
            );
            if let Some(existing) = self.store.get_pending_input(&id).await? {
                if existing.status == PendingInputStatus::Waiting {
                    tracing::debug!(pending_input_id = %id, "Clearing stale pending input");
                    self.store.delete_pending_input(&id).await?;
                }
            }
        }
        Ok(())
    }

    async fn load_resumed_input(&self, payload: &ActivityPayload) -> Result<Option<PendingInput>> {
        let Some(id) = &payload.resume_pending_input_id else {
            return Ok(None);
        };
        let input = self
            .store
            .get_pending_input(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pending input {id} not found")))?;
        if input.status != PendingInputStatus::Resolved {
            return Err(AppError::BadRequest(format!(
                "pending input {id} is not resolved"
            )));
        }
        Ok(Some(input))
    }

    async fn park_run(
        &self,
        payload: &ActivityPayload,
        run: &mut PipelineRun,
        activity: &StandardizedActivity,
        cfg: &EnricherConfig,
        wait: &crate::providers::WaitForInput,
    ) -> Result<()> {
        let id =
            pending_input::generate_id(payload.source, &activity.external_id, cfg.provider_type);

        // A user may have already answered a previous park; never
        // clobber a resolved input with a fresh WAITING one.
        let already_resolved = matches!(
            self.store.get_pending_input(&id).await?,
            Some(existing) if existing.status == PendingInputStatus::Resolved
        );

        if !already_resolved {
            let now = Utc::now();
            self.store
                .upsert_pending_input(&PendingInput {
                    id: id.clone(),
                    user_id: payload.user_id.clone(),
                    provider: cfg.provider_type,
                    status: PendingInputStatus::Waiting,
                    prompt: Some(wait.prompt.clone()),
                    input_data: None,
                    auto_resolve_deadline: wait.deadline,
                    linked_activity_id: run.activity_id.clone(),
                    pipeline_id: run.pipeline_id.clone(),
                    base_execution_id: base_of(&run.id, &run.pipeline_id),
                    original_payload_uri: run.original_payload_uri.clone(),
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }

        tracing::info!(
            pending_input_id = %id,
            run_id = %run.id,
            "Run parked on user input"
        );

        run.status = PipelineRunStatus::Pending;
        run.status_message = Some(format!("waiting for user input: {}", wait.prompt));
        run.updated_at = Utc::now();
        self.store.upsert_pipeline_run(run).await
    }

    // ─── Outbound Metadata ───────────────────────────────────────

    fn tag_destination_metadata(
        &self,
        payload: &ActivityPayload,
        pipeline: &PipelineConfig,
        metadata: &mut BTreeMap<String, String>,
    ) {
        // When a destination is also this activity's source, the
        // uploader must update the existing platform activity instead
        // of creating a duplicate.
        for destination in &pipeline.destinations {
            if corresponding_destination(payload.source) == Some(*destination) {
                metadata.insert(
                    format!("same_source_destination_{}", destination.id()),
                    "true".to_string(),
                );
            }
        }

        if payload.use_update_method {
            metadata.insert("use_update_method".to_string(), "true".to_string());
        }
    }
}

enum PipelineLookup {
    Found(PipelineConfig),
    Skip(String),
}

enum EnricherOutcome {
    Applied(ProviderExecution, String),
    Waiting(ProviderExecution, crate::providers::WaitForInput),
    Halted(ProviderExecution, String),
    Failed(ProviderExecution, AppError),
}

/// Recover the base execution id from `{base}-{pipeline_id}`.
fn base_of(run_id: &str, pipeline_id: &str) -> String {
    run_id
        .strip_suffix(&format!("-{pipeline_id}"))
        .unwrap_or(run_id)
        .to_string()
}

/// Fold one enrichment result into the working activity.
fn apply_enrichment(
    working: &mut StandardizedActivity,
    enrichment: &crate::providers::EnrichmentResult,
) {
    if let Some(name) = &enrichment.name {
        working.name = name.clone();
    }

    if let Some(content) = &enrichment.description {
        working.description = match &enrichment.section_header {
            Some(header) => description::replace_section(&working.description, header, content),
            None if working.description.is_empty() => content.clone(),
            None => format!("{}\n\n{}", working.description, content),
        };
    }

    if !enrichment.heart_rate_stream.is_empty() {
        if let Some(session) = working.sessions.first_mut() {
            splice_heart_rate(session, &enrichment.heart_rate_stream);
        }
    }
}

/// Splice a per-second heart rate stream into the session's records.
///
/// Zeroes in the stream mean "no sample"; they take the nearest
/// preceding sample. Sparse sessions (fewer records than a quarter of
/// the duration) are expanded to one record per second first so the
/// samples have somewhere to land.
fn splice_heart_rate(session: &mut Session, stream: &[u32]) {
    let filled = forward_fill(stream);

    if session.laps.is_empty() {
        session.laps.push(Lap {
            start_time: session.start_time,
            total_elapsed_time: session.total_elapsed_time,
            records: vec![],
        });
    }

    let session_start = session.start_time;
    let lap = &mut session.laps[0];

    let expansion_threshold = std::cmp::max(session.total_elapsed_time / 4, 1);
    if (lap.records.len() as u64) < expansion_threshold {
        let seconds = std::cmp::min(filled.len() as u64, session.total_elapsed_time.max(1));
        lap.records = (0..seconds)
            .map(|i| Record::at(session_start + chrono::Duration::seconds(i as i64)))
            .collect();
    }

    for record in &mut lap.records {
        let offset = (record.timestamp - session_start).num_seconds();
        if offset < 0 {
            continue;
        }
        if let Some(sample) = filled.get(offset as usize) {
            if *sample > 0 {
                record.heart_rate = Some(*sample);
            }
        }
    }
}

/// Replace missing (zero) samples with the nearest preceding sample.
/// Leading zeroes stay missing.
fn forward_fill(stream: &[u32]) -> Vec<u32> {
    let mut filled = Vec::with_capacity(stream.len());
    let mut last = 0u32;
    for &sample in stream {
        if sample > 0 {
            last = sample;
        }
        filled.push(last);
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(elapsed: u64, records: Vec<Record>) -> Session {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        Session {
            start_time: start,
            total_elapsed_time: elapsed,
            laps: vec![Lap {
                start_time: start,
                total_elapsed_time: elapsed,
                records,
            }],
        }
    }

    #[test]
    fn forward_fill_carries_last_sample() {
        assert_eq!(forward_fill(&[100, 0, 0, 110, 0]), vec![100, 100, 100, 110, 110]);
        assert_eq!(forward_fill(&[0, 0, 90]), vec![0, 0, 90]);
    }

    #[test]
    fn splice_expands_sparse_session_to_one_record_per_second() {
        let mut s = session(3, vec![]);
        splice_heart_rate(&mut s, &[100, 110, 120]);

        let records = &s.laps[0].records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].heart_rate, Some(100));
        assert_eq!(records[1].heart_rate, Some(110));
        assert_eq!(records[2].heart_rate, Some(120));
        assert_eq!(
            records[2].timestamp - records[0].timestamp,
            chrono::Duration::seconds(2)
        );
    }

    #[test]
    fn splice_keeps_dense_records_and_annotates_them() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let existing: Vec<Record> = (0..4)
            .map(|i| {
                let mut r = Record::at(start + chrono::Duration::seconds(i));
                r.power = Some(200);
                r
            })
            .collect();
        let mut s = session(4, existing);

        splice_heart_rate(&mut s, &[100, 0, 0, 130]);

        let records = &s.laps[0].records;
        assert_eq!(records.len(), 4);
        // Existing fields survive the splice.
        assert_eq!(records[0].power, Some(200));
        assert_eq!(records[1].heart_rate, Some(100));
        assert_eq!(records[3].heart_rate, Some(130));
    }

    #[test]
    fn splice_creates_default_lap_when_none_exists() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut s = Session {
            start_time: start,
            total_elapsed_time: 2,
            laps: vec![],
        };

        splice_heart_rate(&mut s, &[95, 96]);

        assert_eq!(s.laps.len(), 1);
        assert_eq!(s.laps[0].records.len(), 2);
        assert_eq!(s.laps[0].records[1].heart_rate, Some(96));
    }

    #[test]
    fn leading_missing_samples_leave_heart_rate_unset() {
        let mut s = session(3, vec![]);
        splice_heart_rate(&mut s, &[0, 0, 120]);

        let records = &s.laps[0].records;
        assert_eq!(records[0].heart_rate, None);
        assert_eq!(records[1].heart_rate, None);
        assert_eq!(records[2].heart_rate, Some(120));
    }

    #[test]
    fn base_of_strips_pipeline_suffix() {
        assert_eq!(base_of("msg-123-p1", "p1"), "msg-123");
        assert_eq!(base_of("weird", "p1"), "weird");
    }
}
