// SPDX-License-Identifier: MIT

//! Pub/Sub publishing seam.
//!
//! Enriched activity events go out on one topic per destination
//! (`{prefix}-{destination}`); uploader services subscribe to their own
//! topic. Tests use a capturing fake behind [`EventPublisher`].

use crate::error::{AppError, Result};
use async_trait::async_trait;
use google_cloud_googleapis::pubsub::v1::PubsubMessage;
use google_cloud_pubsub::client::{Client, ClientConfig};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<()>;
}

/// Cloud Pub/Sub implementation.
pub struct PubSubPublisher {
    client: Client,
}

impl PubSubPublisher {
    /// Connect using application default credentials (or the emulator
    /// when PUBSUB_EMULATOR_HOST is set).
    pub async fn new() -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| AppError::Publish(format!("Failed to configure Pub/Sub client: {}", e)))?;
        let client = Client::new(config)
            .await
            .map_err(|e| AppError::Publish(format!("Failed to create Pub/Sub client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for PubSubPublisher {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<()> {
        let topic = self.client.topic(topic);
        let mut publisher = topic.new_publisher(None);

        let message = PubsubMessage {
            data: data.into(),
            ..Default::default()
        };

        let awaiter = publisher.publish(message).await;
        awaiter
            .get()
            .await
            .map_err(|e| AppError::Publish(e.to_string()))?;

        publisher.shutdown().await;
        Ok(())
    }
}
