// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and their pipeline configurations
//! - Pipeline runs and per-destination outcomes
//! - Pending inputs (parked runs awaiting user input)
//! - Uploaded-activity records (loop prevention)

use crate::db::{collections, DocumentStore};
use crate::error::{AppError, Result};
use crate::loop_prevention::UploadedActivityStore;
use crate::models::pending_input::PendingInput;
use crate::models::pipeline::PipelineConfig;
use crate::models::run::{DestinationOutcome, PipelineRun, PipelineRunStatus};
use crate::models::uploaded::UploadedActivityRecord;
use crate::models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Pending-input ids contain `:` separators; encode them before use
    /// as document ids.
    fn pending_input_doc_id(id: &str) -> String {
        urlencoding::encode(id).into_owned()
    }

    fn outcome_doc_id(outcome: &DestinationOutcome) -> String {
        format!("{}_{}", outcome.run_id, outcome.destination.id())
    }
}

/// Field-level patch for run status updates.
#[derive(serde::Serialize, serde::Deserialize)]
struct RunStatusPatch {
    status: PipelineRunStatus,
    status_message: Option<String>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_pipelines(&self, user_id: &str) -> Result<Vec<PipelineConfig>> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PIPELINES)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Pipeline Run Operations ─────────────────────────────────

    async fn get_pipeline_run(&self, run_id: &str) -> Result<Option<PipelineRun>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PIPELINE_RUNS)
            .obj()
            .one(run_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_pipeline_run(&self, run: &PipelineRun) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PIPELINE_RUNS)
            .document_id(&run.id)
            .object(run)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_run_status(
        &self,
        run_id: &str,
        status: PipelineRunStatus,
        status_message: Option<String>,
    ) -> Result<()> {
        let patch = RunStatusPatch {
            status,
            status_message,
            updated_at: Utc::now(),
        };

        // Only the status fields are written, so a concurrent uploader
        // callback never clobbers the rest of the run document.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(RunStatusPatch::{
                status,
                status_message,
                updated_at
            }))
            .in_col(collections::PIPELINE_RUNS)
            .document_id(run_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Destination Outcome Operations ──────────────────────────

    async fn set_destination_outcome(&self, outcome: &DestinationOutcome) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DESTINATION_OUTCOMES)
            .document_id(Self::outcome_doc_id(outcome))
            .object(outcome)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_destination_outcomes(&self, run_id: &str) -> Result<Vec<DestinationOutcome>> {
        let run_id = run_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DESTINATION_OUTCOMES)
            .filter(move |q| q.field("run_id").eq(run_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Pending Input Operations ────────────────────────────────

    async fn get_pending_input(&self, id: &str) -> Result<Option<PendingInput>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PENDING_INPUTS)
            .obj()
            .one(Self::pending_input_doc_id(id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_pending_input(&self, input: &PendingInput) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PENDING_INPUTS)
            .document_id(Self::pending_input_doc_id(&input.id))
            .object(input)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_pending_input(&self, id: &str) -> Result<()> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PENDING_INPUTS)
            .document_id(Self::pending_input_doc_id(id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_expired_pending_inputs(&self, now: DateTime<Utc>) -> Result<Vec<PendingInput>> {
        // Deadlines are stored as RFC 3339 strings, which order
        // lexicographically.
        let cutoff = now.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PENDING_INPUTS)
            .filter(move |q| {
                q.for_all([
                    q.field("status").eq("WAITING"),
                    q.field("auto_resolve_deadline").less_than(cutoff.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl UploadedActivityStore for FirestoreDb {
    // ─── Loop Prevention Operations ──────────────────────────────

    async fn get_uploaded_activity(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<UploadedActivityRecord>> {
        let doc_id = format!("{}_{}", user_id, urlencoding::encode(record_id));
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::UPLOADED_ACTIVITIES)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_uploaded_activity(&self, record: &UploadedActivityRecord) -> Result<()> {
        let doc_id = format!("{}_{}", record.user_id, urlencoding::encode(&record.id));
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::UPLOADED_ACTIVITIES)
            .document_id(&doc_id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
