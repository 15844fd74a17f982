//! The lower-layer collaborators this crate leaves external: TCP framing,
//! the outer RPC wire codec and connection lifecycle. Expressed
//! here as `async_trait` traits so the core (routing, producer/consumer
//! state machines, chunk parsing) is testable without a real broker.

use async_trait::async_trait;
use bytes::Bytes;
use stream_protocol::{CompressionType, Message, OffsetSpecification, ResponseCode};
use stream_std::errors::Result;
use tokio_stream::wrappers::BroadcastStream;

/// Properties attached to a subscribe call.
#[derive(Debug, Clone, Default)]
pub struct SubscribeConfig {
    pub offset: OffsetSpecification,
    pub initial_credit: u16,
    pub single_active_consumer: bool,
    pub super_stream: Option<String>,
    pub consumer_reference: Option<String>,
}

/// A signal the transport pushes out of band: a connection drop, or a
/// broker-side metadata change for a stream this client cares about.
#[derive(Debug, Clone)]
pub enum TransportSignal {
    ConnectionClosed { stream: String, reason: String },
    MetadataUpdate { stream: String, code: ResponseCode },
}

/// A broker acknowledgement for one previously sent publishing-id.
/// `partition` lets a fan-in consumer (the super-stream producer) tag the
/// confirmation without the partition producer needing a bespoke wrapper
/// type.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub partition: String,
    pub publishing_id: u64,
    pub code: ResponseCode,
}

/// The wire-independent surface a partition producer/consumer drives.
/// Everything below this trait (frame header, command ids, TCP) is out of
/// scope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn declare_publisher(&self, partition: &str, reference: Option<&str>) -> Result<()>;

    async fn send(&self, partition: &str, publishing_id: u64, message: Message) -> Result<()>;

    async fn send_batch(&self, partition: &str, messages: Vec<(u64, Message)>) -> Result<()>;

    #[allow(clippy::too_many_arguments)]
    async fn send_sub_entry(
        &self,
        partition: &str,
        publishing_id: u64,
        compressed: Bytes,
        uncompressed_size: u32,
        record_count: u16,
        compression: CompressionType,
    ) -> Result<()>;

    async fn get_last_publishing_id(&self, partition: &str, reference: &str) -> Result<u64>;

    async fn close_publisher(&self, partition: &str) -> Result<ResponseCode>;

    async fn subscribe(&self, stream: &str, config: SubscribeConfig) -> Result<(u8, ResponseCode)>;

    async fn credit(&self, subscriber_id: u8, count: u16) -> Result<()>;

    async fn unsubscribe(&self, subscriber_id: u8) -> Result<ResponseCode>;

    async fn store_offset(&self, reference: &str, stream: &str, offset: u64) -> Result<()>;

    fn signals(&self) -> BroadcastStream<TransportSignal>;

    fn confirmations(&self) -> BroadcastStream<Confirmation>;
}

/// Metadata lookups: which partitions make up a super-stream, and which
/// partition(s) a routing key maps to when the broker is asked directly.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn partitions(&self, super_stream: &str) -> Result<Vec<String>>;

    async fn route(&self, super_stream: &str, routing_key: &str) -> Result<Vec<String>>;
}
