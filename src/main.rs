// SPDX-License-Identifier: MIT

//! FitRelay API Server
//!
//! Receives activity events from source platforms, enriches them
//! through user-configured provider chains, and publishes the results
//! to per-destination uploader topics.

use fitrelay::{
    config::Config,
    db::FirestoreDb,
    providers::{user_input::UserInputProvider, ProviderRegistry},
    pubsub::PubSubPublisher,
    services::{Orchestrator, ResumeCoordinator},
    storage::GcsBlobStore,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting FitRelay API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");
    let store = Arc::new(db);

    // Initialize Cloud Storage (payload archives + offloaded events)
    let blob = Arc::new(
        GcsBlobStore::new()
            .await
            .expect("Failed to initialize Cloud Storage client"),
    );
    tracing::info!(bucket = %config.payload_bucket, "Cloud Storage client initialized");

    // Initialize Pub/Sub publisher
    let publisher = Arc::new(
        PubSubPublisher::new()
            .await
            .expect("Failed to initialize Pub/Sub client"),
    );
    tracing::info!("Pub/Sub publisher initialized");

    // Register enrichment providers
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(UserInputProvider));
    let registry = Arc::new(registry);
    tracing::info!(providers = registry.len(), "Provider registry initialized");

    let orchestrator = Orchestrator::new(
        store.clone(),
        blob.clone(),
        registry,
        config.payload_bucket.clone(),
    );
    let resume = ResumeCoordinator::new(store.clone(), blob.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        blob,
        publisher,
        orchestrator,
        resume,
    });

    // Build router
    let app = fitrelay::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitrelay=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
