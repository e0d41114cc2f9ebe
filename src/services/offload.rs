// SPDX-License-Identifier: MIT

//! Payload offload gateway.
//!
//! Pub/Sub caps message size well below what a long activity with
//! per-second records serializes to. Every enriched event is archived
//! to blob storage so reposts can replay it; events that exceed the
//! transport budget additionally drop the inline activity and carry
//! only the summary fields plus the archive URI.

use crate::error::Result;
use crate::models::payload::EnrichedActivityEvent;
use crate::storage::{gcs_uri, parse_gcs_uri, BlobStore};

/// Transport budget for an inline event (Pub/Sub message limit is
/// 10 MB; half of that leaves room for envelope overhead).
pub const MAX_INLINE_EVENT_BYTES: usize = 5 * 1024 * 1024;

fn archive_object(user_id: &str, execution_id: &str) -> String {
    format!("enriched_events/{user_id}/{execution_id}.json")
}

/// Archive the full event and slim it down if it exceeds the transport
/// budget.
///
/// The archive write is fatal only when the event is too large to send
/// inline; otherwise the event still fits on the wire and the failure
/// is just logged.
pub async fn maybe_offload<B: BlobStore + ?Sized>(
    event: &mut EnrichedActivityEvent,
    blob: &B,
    bucket: &str,
) -> Result<()> {
    let serialized = serde_json::to_vec(&*event).map_err(anyhow::Error::from)?;
    let oversized = serialized.len() > MAX_INLINE_EVENT_BYTES;

    let object = archive_object(&event.user_id, &event.pipeline_execution_id);
    match blob.put(bucket, &object, serialized).await {
        Ok(()) => {
            event.activity_data_uri = Some(gcs_uri(bucket, &object));
        }
        Err(e) if oversized => return Err(e),
        Err(e) => {
            tracing::warn!(
                execution_id = %event.pipeline_execution_id,
                error = %e,
                "Event archive write failed; sending inline"
            );
        }
    }

    if oversized {
        tracing::info!(
            execution_id = %event.pipeline_execution_id,
            "Event exceeds transport budget; offloading activity body"
        );
        event.activity = None;
    }

    Ok(())
}

/// Restore an offloaded event body from its archive. No-op when the
/// activity is inline; a failed fetch is logged and the slim event is
/// used as-is.
pub async fn resolve<B: BlobStore + ?Sized>(event: &mut EnrichedActivityEvent, blob: &B) {
    if event.activity.is_some() {
        return;
    }
    let Some(uri) = event.activity_data_uri.clone() else {
        return;
    };

    let fetched: Result<EnrichedActivityEvent> = async {
        let (bucket, object) = parse_gcs_uri(&uri)?;
        let bytes = blob.get(bucket, object).await?;
        Ok(serde_json::from_slice(&bytes).map_err(anyhow::Error::from)?)
    }
    .await;

    match fetched {
        Ok(full) => event.activity = full.activity,
        Err(e) => {
            tracing::warn!(uri = %uri, error = %e, "Failed to resolve offloaded event");
        }
    }
}
