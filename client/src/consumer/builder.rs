//! Typestate builder for [`Consumer`], mirroring
//! [`SuperStreamProducerBuilder`](crate::producer::SuperStreamProducerBuilder)'s
//! shape: an offset spec and a message handler are required before
//! `open()` is reachable at all, so a caller cannot forget either.

use super::consumer::{Consumer, DecompressorResolver, MessageHandler};
use crate::transport::Transport;
use std::sync::Arc;
use stream_protocol::{CompressionType, OffsetMessage, OffsetSpecification};
use stream_std::errors::{ConfigError, Result};
use stream_std::traits::Decompress;

/// The builder has a stream name but no offset spec yet.
pub struct WantsOffset {
    transport: Arc<dyn Transport>,
}

/// The offset spec is set; a message handler is still required.
pub struct WantsHandler {
    transport: Arc<dyn Transport>,
    offset: OffsetSpecification,
}

/// Everything required to open is present; the remaining setters are
/// optional.
pub struct WantsOpen {
    transport: Arc<dyn Transport>,
    offset: OffsetSpecification,
    handler: MessageHandler,
    resolve_decompressor: DecompressorResolver,
    single_active_consumer: bool,
    consumer_reference: Option<String>,
    super_stream: Option<String>,
    initial_credit: u16,
}

pub struct ConsumerBuilder<State> {
    stream: String,
    state: State,
}

impl ConsumerBuilder<WantsOffset> {
    pub fn new(stream: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            stream: stream.into(),
            state: WantsOffset { transport },
        }
    }

    pub fn offset(self, offset: OffsetSpecification) -> ConsumerBuilder<WantsHandler> {
        ConsumerBuilder {
            stream: self.stream,
            state: WantsHandler {
                transport: self.state.transport,
                offset,
            },
        }
    }
}

impl ConsumerBuilder<WantsHandler> {
    /// Registers the per-message callback the consumer dispatches decoded,
    /// offset-filtered messages through.
    pub fn message_handler<F>(self, handler: F) -> ConsumerBuilder<WantsOpen>
    where
        F: Fn(OffsetMessage) + Send + Sync + 'static,
    {
        ConsumerBuilder {
            stream: self.stream,
            state: WantsOpen {
                transport: self.state.transport,
                offset: self.state.offset,
                handler: Arc::new(handler),
                resolve_decompressor: Arc::new(|_| None),
                single_active_consumer: false,
                consumer_reference: None,
                super_stream: None,
                initial_credit: 10,
            },
        }
    }
}

impl ConsumerBuilder<WantsOpen> {
    /// Maps a sub-entry compression type to a decompressor; types with no
    /// registered resolver are a per-entry decode error.
    pub fn decompressor<F>(mut self, resolve: F) -> Self
    where
        F: Fn(CompressionType) -> Option<Arc<dyn Decompress>> + Send + Sync + 'static,
    {
        self.state.resolve_decompressor = Arc::new(resolve);
        self
    }

    /// Requires `reference` to be set as well, checked synchronously in
    /// `open()`.
    pub fn single_active_consumer(mut self, enabled: bool) -> Self {
        self.state.single_active_consumer = enabled;
        self
    }

    /// A stable consumer name, required when `single_active_consumer` is set.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.state.consumer_reference = Some(reference.into());
        self
    }

    /// Sets the `super-stream` subscribe property so the broker routes
    /// single-active-consumer notifications correctly.
    pub fn super_stream(mut self, super_stream: impl Into<String>) -> Self {
        self.state.super_stream = Some(super_stream.into());
        self
    }

    pub fn initial_credit(mut self, credit: u16) -> Self {
        self.state.initial_credit = credit;
        self
    }

    /// Validates synchronously, then subscribes and opens the consumer.
    pub async fn open(self) -> Result<Consumer> {
        if self.stream.is_empty() {
            return Err(ConfigError::EmptyStreamName.into());
        }
        if self.state.single_active_consumer && self.state.consumer_reference.is_none() {
            return Err(ConfigError::MissingReferenceForSingleActiveConsumer.into());
        }

        Consumer::open(
            self.stream,
            self.state.offset,
            self.state.handler,
            self.state.resolve_decompressor,
            self.state.single_active_consumer,
            self.state.consumer_reference,
            self.state.super_stream,
            self.state.initial_credit,
            self.state.transport,
        )
        .await
    }
}
