//! One connection's publishing context for a single partition stream.
//! Owned exclusively by a [`SuperStreamProducer`](super::super_stream::SuperStreamProducer).

use crate::logging;
use crate::transport::{Confirmation, Transport};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use stream_protocol::{CompressionType, Message, ResponseCode};
use stream_std::errors::{Result, StreamError, TransportError};
use stream_std::traits::Compress;
use tokio::task::JoinHandle;

/// `{ creating, open, (reconnecting <-> open), closed }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProducerState {
    Creating = 0,
    Open = 1,
    Reconnecting = 2,
    Closed = 3,
}

impl ProducerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Creating,
            1 => Self::Open,
            2 => Self::Reconnecting,
            _ => Self::Closed,
        }
    }
}

/// `(partition_name, confirmation) -> unit`, at-most-once per ack.
pub type ConfirmHandler = Arc<dyn Fn(Confirmation) + Send + Sync>;

fn encode_sub_entry_payload(messages: &[Message]) -> (bytes::BytesMut, u32) {
    use bytes::BufMut;

    let mut buf = bytes::BytesMut::new();
    for message in messages {
        buf.put_u32(message.body.len() as u32);
        buf.put_slice(&message.body);
    }
    let len = buf.len() as u32;
    (buf, len)
}

/// Owns one partition's publishing context: declares the publisher,
/// forwards sends, and relays confirmations tagged with this partition's
/// name to the caller-supplied handler.
pub struct PartitionProducer {
    partition: String,
    reference: Option<String>,
    transport: Arc<dyn Transport>,
    state: AtomicU8,
    last_publishing_id: AtomicU64,
    fail_fast: bool,
    confirm_task: Option<JoinHandle<()>>,
}

impl PartitionProducer {
    pub async fn create(
        partition: String,
        reference: Option<String>,
        transport: Arc<dyn Transport>,
        confirm_handler: ConfirmHandler,
    ) -> Result<Self> {
        transport
            .declare_publisher(&partition, reference.as_deref())
            .await?;

        let confirmations = transport.confirmations();
        let confirm_task = Self::spawn_confirm_forwarder(partition.clone(), confirmations, confirm_handler);

        logging::producer::partition_created("", &partition);

        Ok(Self {
            partition,
            reference,
            transport,
            state: AtomicU8::new(ProducerState::Open as u8),
            last_publishing_id: AtomicU64::new(0),
            fail_fast: true,
            confirm_task: Some(confirm_task),
        })
    }

    fn spawn_confirm_forwarder(
        partition: String,
        mut confirmations: tokio_stream::wrappers::BroadcastStream<Confirmation>,
        confirm_handler: ConfirmHandler,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(Ok(confirmation)) = confirmations.next().await {
                if confirmation.partition != partition {
                    continue;
                }
                confirm_handler(confirmation);
            }
        })
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Called by the reconnect glue on a `connection_closed` signal for
    /// this partition.
    pub fn mark_reconnecting(&self) {
        if self.state() != ProducerState::Closed {
            logging::reconnect::connection_lost(&self.partition);
            self.set_state(ProducerState::Reconnecting);
        }
    }

    /// Redeclares the publisher after a metadata lookup has confirmed the
    /// partition is still routable.
    pub async fn reopen(&self) -> Result<()> {
        self.transport
            .declare_publisher(&self.partition, self.reference.as_deref())
            .await?;
        self.set_state(ProducerState::Open);
        logging::reconnect::succeeded(&self.partition);
        Ok(())
    }

    fn ensure_sendable(&self) -> Result<()> {
        match self.state() {
            ProducerState::Closed => Err(StreamError::AlreadyDisposed),
            ProducerState::Reconnecting if self.fail_fast => {
                Err(TransportError::NotConnected.into())
            }
            _ => Ok(()),
        }
    }

    pub async fn send(&self, publishing_id: u64, message: Message) -> Result<()> {
        self.ensure_sendable()?;
        self.transport.send(&self.partition, publishing_id, message).await
    }

    /// One frame carrying every `(publishing_id, message)` pair, preserving
    /// input order.
    pub async fn batch_send(&self, messages: Vec<(u64, Message)>) -> Result<()> {
        self.ensure_sendable()?;
        self.transport.send_batch(&self.partition, messages).await
    }

    /// One publishing-id covers the entire sub-entry batch.
    pub async fn sub_entry_send(
        &self,
        publishing_id: u64,
        messages: Vec<Message>,
        compression: CompressionType,
        compressor: &dyn Compress,
    ) -> Result<()> {
        self.ensure_sendable()?;

        let record_count = messages.len() as u16;
        let (payload, uncompressed_size) = encode_sub_entry_payload(&messages);
        let compressed = compressor
            .compress(payload.freeze())
            .map_err(stream_std::errors::CodecError::CompressFailure)?;

        self.transport
            .send_sub_entry(
                &self.partition,
                publishing_id,
                compressed,
                uncompressed_size,
                record_count,
                compression,
            )
            .await
    }

    /// The broker-acknowledged highwater for `(reference, partition)`; `0`
    /// when this producer has no reference.
    pub async fn get_last_publishing_id(&self) -> Result<u64> {
        match &self.reference {
            Some(reference) => {
                let id = self
                    .transport
                    .get_last_publishing_id(&self.partition, reference)
                    .await?;
                self.last_publishing_id.store(id, Ordering::Release);
                Ok(id)
            }
            None => Ok(0),
        }
    }

    /// Idempotent close: a second call on an already-closed producer
    /// returns `Ok` without touching the transport.
    pub async fn close(&self) -> Result<ResponseCode> {
        if self.state() == ProducerState::Closed {
            return Ok(ResponseCode::OK);
        }

        self.set_state(ProducerState::Closed);
        if let Some(task) = &self.confirm_task {
            task.abort();
        }

        self.transport.close_publisher(&self.partition).await
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), ProducerState::Open)
    }
}

impl Drop for PartitionProducer {
    fn drop(&mut self) {
        if let Some(task) = &self.confirm_task {
            task.abort();
        }
    }
}
