// SPDX-License-Identifier: MIT

//! Loop prevention guard.
//!
//! When a destination platform is also an ingestion source (upload to
//! Strava, Strava webhook fires back at us), an inbound activity may be
//! our own upload echoing back. Every successful upload records the
//! destination-assigned external id; inbound webhooks from loop-prone
//! sources are checked against those records before any pipeline runs.

use crate::error::Result;
use crate::models::activity::{Destination, Source};
use crate::models::uploaded::UploadedActivityRecord;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Lookup/record surface the guard needs. Implemented by the Firestore
/// layer and by in-memory fakes in tests.
#[async_trait]
pub trait UploadedActivityStore: Send + Sync {
    async fn get_uploaded_activity(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<UploadedActivityRecord>>;

    async fn put_uploaded_activity(&self, record: &UploadedActivityRecord) -> Result<()>;
}

/// The destination whose uploads echo back through this source, if any.
pub fn corresponding_destination(source: Source) -> Option<Destination> {
    match source {
        Source::Strava => Some(Destination::Strava),
        Source::Hevy => Some(Destination::Hevy),
        Source::Fitbit | Source::FileUpload | Source::ParkrunResults => None,
    }
}

/// Composite key for uploaded-activity records.
pub fn build_uploaded_activity_id(destination: Destination, external_id: &str) -> String {
    format!("{}_{}", destination.id(), external_id)
}

/// True when this inbound activity is one of our own uploads bouncing
/// back. Sources with no corresponding destination can never bounce.
pub async fn is_bounceback<S: UploadedActivityStore + ?Sized>(
    store: &S,
    user_id: &str,
    source: Source,
    external_id: &str,
) -> Result<bool> {
    let Some(destination) = corresponding_destination(source) else {
        return Ok(false);
    };

    let record_id = build_uploaded_activity_id(destination, external_id);
    let record = store.get_uploaded_activity(user_id, &record_id).await?;
    Ok(record.is_some())
}

/// Run `op` up to `max_attempts` times with exponentially growing
/// delays, returning `default` once attempts are exhausted.
///
/// The guard must never block ingestion: an unreachable store after all
/// retries means we proceed as if the activity were genuine.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    initial_delay: Duration,
    default: T,
    mut op: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut delay = initial_delay;
    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return value,
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "retryable operation failed"
                );
                if attempt < max_attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    default
}

/// Bounceback check with the guard's standard retry budget, failing
/// open (not a bounceback) when the store stays unreachable.
pub async fn is_bounceback_with_retry<S: UploadedActivityStore + ?Sized>(
    store: &S,
    user_id: &str,
    source: Source,
    external_id: &str,
) -> bool {
    retry_with_backoff(5, Duration::from_millis(200), false, || {
        is_bounceback(store, user_id, source, external_id)
    })
    .await
}
