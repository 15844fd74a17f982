//! The stateful chunk-consuming reader. A `Consumer` owns one
//! broker subscription, grants credit before each chunk is parsed, filters
//! by the caller's starting offset, and dispatches decoded messages through
//! a user handler.

use super::chunk_reader::{parse_chunk, ParsedEntry};
use crate::backoff::BackoffStrategy;
use crate::logging;
use crate::transport::{SubscribeConfig, Transport};
use futures::StreamExt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use stream_protocol::{Chunk, CompressionType, OffsetMessage, OffsetSpecification};
use stream_std::errors::{Result, StreamError};
use stream_std::traits::Decompress;
use tokio_util::sync::CancellationToken;

const STATE_OPEN: u8 = 0;
const STATE_CLOSED: u8 = 1;

pub type MessageHandler = Arc<dyn Fn(OffsetMessage) + Send + Sync>;
pub type DecompressorResolver = Arc<dyn Fn(CompressionType) -> Option<Arc<dyn Decompress>> + Send + Sync>;

/// A single-partition (or plain-stream) subscription. Construct through
/// [`crate::consumer::ConsumerBuilder`].
pub struct Consumer {
    stream: String,
    subscriber_id: u8,
    offset_spec: OffsetSpecification,
    transport: Arc<dyn Transport>,
    handler: MessageHandler,
    resolve_decompressor: DecompressorResolver,
    cancellation_token: CancellationToken,
    state: AtomicU8,
    credit_granted: u16,
}

impl Consumer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn open(
        stream: String,
        offset_spec: OffsetSpecification,
        handler: MessageHandler,
        resolve_decompressor: DecompressorResolver,
        single_active_consumer: bool,
        consumer_reference: Option<String>,
        super_stream: Option<String>,
        credit_granted: u16,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let config = SubscribeConfig {
            offset: offset_spec,
            initial_credit: credit_granted,
            single_active_consumer,
            super_stream,
            consumer_reference,
        };

        let (subscriber_id, code) = transport.subscribe(&stream, config).await?;
        if !code.is_ok() {
            return Err(StreamError::CreateConsumerException(format!(
                "broker rejected subscribe for {stream:?} with code {code:?}"
            )));
        }

        Ok(Self {
            stream,
            subscriber_id,
            offset_spec,
            transport,
            handler,
            resolve_decompressor,
            cancellation_token: CancellationToken::new(),
            state: AtomicU8::new(STATE_OPEN),
            credit_granted,
        })
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn subscriber_id(&self) -> u8 {
        self.subscriber_id
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_OPEN
    }

    /// Drives one delivered chunk through the credit/parse/filter/dispatch
    /// pipeline. Grants one credit *before* parsing, so the network path
    /// stays busy while this chunk is being handled.
    pub async fn deliver(&self, chunk: Chunk) -> Result<()> {
        if !self.is_open() {
            return Err(StreamError::AlreadyDisposed);
        }

        self.transport.credit(self.subscriber_id, self.credit_granted).await?;
        logging::chunk::credit_granted(&self.stream, self.subscriber_id, self.credit_granted);

        let floor = self.offset_spec.floor();
        let resolve_decompressor = self.resolve_decompressor.clone();
        let entries = parse_chunk(&chunk, move |ty| resolve_decompressor(ty));

        for entry in entries {
            if self.cancellation_token.is_cancelled() {
                logging::chunk::cancelled(&self.stream);
                return Err(StreamError::Cancelled);
            }

            match entry {
                ParsedEntry::Message(offset_message) => {
                    if let Some(floor) = floor {
                        if offset_message.offset < floor {
                            continue;
                        }
                    }
                    (self.handler)(offset_message);
                }
                ParsedEntry::Skipped { offset, error } => {
                    logging::chunk::decode_skip(&self.stream, offset, &error.into());
                }
            }
        }

        Ok(())
    }

    pub async fn store_offset(&self, reference: &str, offset: u64) -> Result<()> {
        if !self.is_open() {
            return Err(StreamError::AlreadyDisposed);
        }
        self.transport.store_offset(reference, &self.stream, offset).await
    }

    /// Unsubscribes and marks the consumer closed; idempotent. Waits at most
    /// 3 seconds for the unsubscribe round trip since the stream may already
    /// be gone.
    pub async fn close(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        self.cancellation_token.cancel();

        let unsubscribe = self.transport.unsubscribe(self.subscriber_id);
        match tokio::time::timeout(std::time::Duration::from_secs(3), unsubscribe).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Ok(()),
        }
    }

    /// Forces `close` with a 1-second grace period.
    pub async fn dispose(&self) -> Result<()> {
        match tokio::time::timeout(std::time::Duration::from_secs(1), self.close()).await {
            Ok(result) => result,
            Err(_) => {
                self.state.store(STATE_CLOSED, Ordering::Release);
                self.cancellation_token.cancel();
                Ok(())
            }
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use bytes::{BufMut, Bytes, BytesMut};
    use std::sync::Mutex;

    fn encode_standard(body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32(body.len() as u32);
        buf.put_slice(body);
        buf
    }

    async fn open_consumer(
        offset_spec: OffsetSpecification,
        handler: MessageHandler,
    ) -> (Consumer, Arc<FakeTransport>) {
        let transport = FakeTransport::new();
        let consumer = Consumer::open(
            "invoices-0".to_string(),
            offset_spec,
            handler,
            Arc::new(|_| None),
            false,
            None,
            None,
            10,
            transport.as_transport(),
        )
        .await
        .unwrap();
        (consumer, transport)
    }

    #[tokio::test]
    async fn grants_one_credit_before_parsing_each_chunk() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let (consumer, transport) = open_consumer(
            OffsetSpecification::Next,
            Arc::new(move |m: OffsetMessage| received_clone.lock().unwrap().push(m.offset)),
        )
        .await;

        let mut data = BytesMut::new();
        data.extend(encode_standard(b"hello"));
        let chunk = Chunk::new(0, 0, 1, data.freeze());

        assert_eq!(transport.credit_granted(consumer.subscriber_id()), 10);
        consumer.deliver(chunk).await.unwrap();
        assert_eq!(transport.credit_granted(consumer.subscriber_id()), 20);
        assert_eq!(*received.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn offset_filter_drops_messages_below_the_floor() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let (consumer, _transport) = open_consumer(
            OffsetSpecification::Offset(2),
            Arc::new(move |m: OffsetMessage| received_clone.lock().unwrap().push(m.offset)),
        )
        .await;

        let mut data = BytesMut::new();
        data.extend(encode_standard(b"zero"));
        data.extend(encode_standard(b"one"));
        data.extend(encode_standard(b"two"));
        data.extend(encode_standard(b"three"));
        let chunk = Chunk::new(0, 0, 4, data.freeze());

        consumer.deliver(chunk).await.unwrap();
        assert_eq!(*received.lock().unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_unsubscribes_once() {
        let (consumer, _transport) = open_consumer(OffsetSpecification::Next, Arc::new(|_| {})).await;
        consumer.close().await.unwrap();
        consumer.close().await.unwrap();
        assert!(!consumer.is_open());
    }

    #[tokio::test]
    async fn delivery_after_close_is_already_disposed() {
        let (consumer, _transport) = open_consumer(OffsetSpecification::Next, Arc::new(|_| {})).await;
        consumer.close().await.unwrap();

        let mut data = BytesMut::new();
        data.extend(encode_standard(b"late"));
        let chunk = Chunk::new(0, 0, 1, data.freeze());

        let err = consumer.deliver(chunk).await.unwrap_err();
        assert!(matches!(err, StreamError::AlreadyDisposed));
    }

    #[tokio::test]
    async fn cancellation_stops_parsing_mid_chunk() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let (consumer, _transport) = open_consumer(
            OffsetSpecification::Next,
            Arc::new(move |m: OffsetMessage| received_clone.lock().unwrap().push(m.offset)),
        )
        .await;

        consumer.cancellation_token.cancel();

        let mut data = BytesMut::new();
        data.extend(encode_standard(b"a"));
        data.extend(encode_standard(b"b"));
        let chunk = Chunk::new(0, 0, 2, data.freeze());

        let err = consumer.deliver(chunk).await.unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));
        assert!(received.lock().unwrap().is_empty());
    }
}
