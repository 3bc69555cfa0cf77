//! Fire-and-forget publishing of domain events.
//!
//! Publishing never fails the operation that raised the event: errors are
//! logged and dropped. Downstream consumers (e-mail notifications, reporting)
//! subscribe to these subjects.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);

    async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

/// Publishes JSON-encoded events to NATS under `<prefix>.<event subject>`.
#[derive(Clone, Debug)]
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = format!("{}.{}", self.prefix, event.subject());
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(%subject, error = %e, "Failed to encode domain event");
                return;
            }
        };
        match self.client.publish(subject.clone(), payload.into()).await {
            Ok(()) => debug!(%subject, "Published domain event"),
            Err(e) => warn!(%subject, error = %e, "Failed to publish domain event"),
        }
    }
}

/// Logs events instead of publishing them; used when no broker is configured.
#[derive(Clone, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: DomainEvent) {
        info!(subject = event.subject(), event = ?event, "Domain event");
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self { Self::default() }

    pub fn subjects(&self) -> Vec<&'static str> {
        match self.events.lock() {
            Ok(events) => events.iter().map(DomainEvent::subject).collect(),
            Err(_) => vec![],
        }
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
