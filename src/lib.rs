// SPDX-License-Identifier: MIT

//! Activity enrichment pipeline orchestrator.
//!
//! Fitness activities arrive from source platforms as Pub/Sub push
//! deliveries, run through a user-configured chain of enrichment
//! providers, and fan out to per-destination uploader topics. The
//! service also tracks run status, guards against upload loops, parks
//! runs on pending user input, and offloads oversized events to blob
//! storage.

pub mod config;
pub mod db;
pub mod description;
pub mod error;
pub mod loop_prevention;
pub mod models;
pub mod providers;
pub mod pubsub;
pub mod routes;
pub mod services;
pub mod storage;

use crate::config::Config;
use crate::db::DocumentStore;
use crate::pubsub::EventPublisher;
use crate::services::{Orchestrator, ResumeCoordinator};
use crate::storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub blob: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub orchestrator: Orchestrator,
    pub resume: ResumeCoordinator,
}
