//! Typestate builder for [`SuperStreamProducer`].
//! The state transition itself enforces the "routing strategy required"
//! rule at compile time rather than with a runtime check; the
//! empty-super-stream-name check still happens at `open()`, synchronously
//! and before any I/O.

use super::partition::ConfirmHandler;
use super::super_stream::SuperStreamProducer;
use crate::backoff::BackoffStrategy;
use crate::routing::RoutingStrategy;
use crate::transport::{Confirmation, MetadataClient, Transport};
use std::sync::Arc;
use stream_std::errors::{ConfigError, Result};

/// The builder has a transport and metadata client, but no routing
/// strategy yet.
pub struct WantsRouting {
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataClient>,
}

/// The builder has everything required to open; the remaining setters are
/// all optional.
pub struct WantsOpen {
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataClient>,
    routing: Box<dyn RoutingStrategy>,
    reference: Option<String>,
    confirm_handler: Option<ConfirmHandler>,
    backoff_strategy: BackoffStrategy,
}

pub struct SuperStreamProducerBuilder<State> {
    super_stream: String,
    state: State,
}

impl SuperStreamProducerBuilder<WantsRouting> {
    pub fn new(
        super_stream: impl Into<String>,
        transport: Arc<dyn Transport>,
        metadata: Arc<dyn MetadataClient>,
    ) -> Self {
        Self {
            super_stream: super_stream.into(),
            state: WantsRouting { transport, metadata },
        }
    }

    pub fn routing(
        self,
        strategy: impl RoutingStrategy + 'static,
    ) -> SuperStreamProducerBuilder<WantsOpen> {
        SuperStreamProducerBuilder {
            super_stream: self.super_stream,
            state: WantsOpen {
                transport: self.state.transport,
                metadata: self.state.metadata,
                routing: Box::new(strategy),
                reference: None,
                confirm_handler: None,
                backoff_strategy: BackoffStrategy::default(),
            },
        }
    }
}

impl SuperStreamProducerBuilder<WantsOpen> {
    /// Enables deduplication: the broker dedupes `(reference,
    /// publishing_id)` pairs per partition.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.state.reference = Some(reference.into());
        self
    }

    /// Receives `(partition_name, confirmation)` for every broker ack.
    pub fn confirm_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Confirmation) + Send + Sync + 'static,
    {
        self.state.confirm_handler = Some(Arc::new(handler));
        self
    }

    pub fn backoff_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.state.backoff_strategy = strategy;
        self
    }

    /// Validates synchronously, then performs the metadata lookup and
    /// opens the super-stream producer.
    pub async fn open(self) -> Result<SuperStreamProducer> {
        if self.super_stream.is_empty() {
            return Err(ConfigError::EmptySuperStreamName.into());
        }

        let confirm_handler = self.state.confirm_handler.unwrap_or_else(|| Arc::new(|_| {}));

        SuperStreamProducer::open(
            self.super_stream,
            self.state.routing,
            self.state.reference,
            confirm_handler,
            self.state.transport,
            self.state.metadata,
            self.state.backoff_strategy,
        )
        .await
    }
}
