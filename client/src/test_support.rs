//! An in-memory fake broker used by this crate's own tests in place of a
//! real stream broker. Mirrors just enough of
//! [`Transport`] and [`MetadataClient`] to drive the producer/consumer state
//! machines end to end.

use crate::transport::{Confirmation, MetadataClient, SubscribeConfig, Transport, TransportSignal};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use stream_protocol::{CompressionType, Message, ResponseCode};
use stream_std::errors::Result;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Default)]
struct Inner {
    declared: HashMap<String, Option<String>>,
    closed: HashSet<String>,
    counts: HashMap<String, usize>,
    seen_ids: HashMap<(String, String), HashSet<u64>>,
    last_publishing_id: HashMap<String, u64>,
    partitions: Vec<String>,
    routing_table: HashMap<String, Vec<String>>,
    subscriber_credit: HashMap<u8, u16>,
    stored_offsets: HashMap<(String, String), u64>,
}

pub struct FakeTransport {
    inner: Mutex<Inner>,
    signal_tx: broadcast::Sender<TransportSignal>,
    confirm_tx: broadcast::Sender<Confirmation>,
    auto_confirm: AtomicBool,
    next_subscriber_id: AtomicU8,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Self::with_partitions(Vec::new())
    }

    pub fn with_partitions(partitions: Vec<String>) -> Arc<Self> {
        let (signal_tx, _) = broadcast::channel(64);
        let (confirm_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            inner: Mutex::new(Inner {
                partitions,
                ..Default::default()
            }),
            signal_tx,
            confirm_tx,
            auto_confirm: AtomicBool::new(true),
            next_subscriber_id: AtomicU8::new(0),
        })
    }

    pub fn as_transport(self: &Arc<Self>) -> Arc<dyn Transport> {
        self.clone()
    }

    pub fn as_metadata_client(self: &Arc<Self>) -> Arc<dyn MetadataClient> {
        self.clone()
    }

    pub fn set_auto_confirm(&self, value: bool) {
        self.auto_confirm.store(value, Ordering::Release);
    }

    pub fn declared_publishers(&self) -> Vec<String> {
        self.inner.lock().unwrap().declared.keys().cloned().collect()
    }

    pub fn closed_publishers(&self) -> HashSet<String> {
        self.inner.lock().unwrap().closed.clone()
    }

    pub fn count_for(&self, partition: &str) -> usize {
        *self.inner.lock().unwrap().counts.get(partition).unwrap_or(&0)
    }

    pub fn counts(&self) -> HashMap<String, usize> {
        self.inner.lock().unwrap().counts.clone()
    }

    pub fn set_partitions(&self, partitions: Vec<String>) {
        self.inner.lock().unwrap().partitions = partitions;
    }

    pub fn remove_partition(&self, partition: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.partitions.retain(|p| p != partition);
    }

    pub fn set_route(&self, key: &str, partitions: Vec<String>) {
        self.inner
            .lock()
            .unwrap()
            .routing_table
            .insert(key.to_string(), partitions);
    }

    pub fn push_confirmation(&self, partition: &str, publishing_id: u64, code: ResponseCode) {
        let _ = self.confirm_tx.send(Confirmation {
            partition: partition.to_string(),
            publishing_id,
            code,
        });
    }

    pub fn push_connection_closed(&self, stream: &str) {
        let _ = self.signal_tx.send(TransportSignal::ConnectionClosed {
            stream: stream.to_string(),
            reason: "simulated disconnect".to_string(),
        });
    }

    pub fn push_metadata_removed(&self, stream: &str) {
        self.remove_partition(stream);
        let _ = self.signal_tx.send(TransportSignal::MetadataUpdate {
            stream: stream.to_string(),
            code: ResponseCode::STREAM_DOES_NOT_EXIST,
        });
    }

    pub fn credit_granted(&self, subscriber_id: u8) -> u16 {
        *self
            .inner
            .lock()
            .unwrap()
            .subscriber_credit
            .get(&subscriber_id)
            .unwrap_or(&0)
    }

    fn record(&self, partition: &str, publishing_id: u64, count: usize) {
        let mut inner = self.inner.lock().unwrap();
        let reference = inner.declared.get(partition).cloned().flatten();

        let should_count = match reference {
            Some(reference) => {
                let key = (partition.to_string(), reference);
                inner.seen_ids.entry(key).or_default().insert(publishing_id)
            }
            None => true,
        };

        if should_count {
            *inner.counts.entry(partition.to_string()).or_default() += count;
        }

        let entry = inner.last_publishing_id.entry(partition.to_string()).or_insert(0);
        *entry = (*entry).max(publishing_id);
    }

    fn maybe_confirm(&self, partition: &str, publishing_id: u64) {
        if self.auto_confirm.load(Ordering::Acquire) {
            self.push_confirmation(partition, publishing_id, ResponseCode::OK);
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn declare_publisher(&self, partition: &str, reference: Option<&str>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.closed.remove(partition);
        inner
            .declared
            .insert(partition.to_string(), reference.map(str::to_owned));
        Ok(())
    }

    async fn send(&self, partition: &str, publishing_id: u64, _message: Message) -> Result<()> {
        self.record(partition, publishing_id, 1);
        self.maybe_confirm(partition, publishing_id);
        Ok(())
    }

    async fn send_batch(&self, partition: &str, messages: Vec<(u64, Message)>) -> Result<()> {
        for (publishing_id, _message) in messages {
            self.record(partition, publishing_id, 1);
            self.maybe_confirm(partition, publishing_id);
        }
        Ok(())
    }

    async fn send_sub_entry(
        &self,
        partition: &str,
        publishing_id: u64,
        _compressed: Bytes,
        _uncompressed_size: u32,
        record_count: u16,
        _compression: CompressionType,
    ) -> Result<()> {
        self.record(partition, publishing_id, record_count as usize);
        self.maybe_confirm(partition, publishing_id);
        Ok(())
    }

    async fn get_last_publishing_id(&self, partition: &str, _reference: &str) -> Result<u64> {
        Ok(*self.inner.lock().unwrap().last_publishing_id.get(partition).unwrap_or(&0))
    }

    async fn close_publisher(&self, partition: &str) -> Result<ResponseCode> {
        self.inner.lock().unwrap().closed.insert(partition.to_string());
        Ok(ResponseCode::OK)
    }

    async fn subscribe(&self, _stream: &str, config: SubscribeConfig) -> Result<(u8, ResponseCode)> {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::AcqRel);
        self.inner
            .lock()
            .unwrap()
            .subscriber_credit
            .insert(id, config.initial_credit);
        Ok((id, ResponseCode::OK))
    }

    async fn credit(&self, subscriber_id: u8, count: u16) -> Result<()> {
        *self
            .inner
            .lock()
            .unwrap()
            .subscriber_credit
            .entry(subscriber_id)
            .or_insert(0) += count;
        Ok(())
    }

    async fn unsubscribe(&self, _subscriber_id: u8) -> Result<ResponseCode> {
        Ok(ResponseCode::OK)
    }

    async fn store_offset(&self, reference: &str, stream: &str, offset: u64) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .stored_offsets
            .insert((reference.to_string(), stream.to_string()), offset);
        Ok(())
    }

    fn signals(&self) -> BroadcastStream<TransportSignal> {
        BroadcastStream::new(self.signal_tx.subscribe())
    }

    fn confirmations(&self) -> BroadcastStream<Confirmation> {
        BroadcastStream::new(self.confirm_tx.subscribe())
    }
}

#[async_trait]
impl MetadataClient for FakeTransport {
    async fn partitions(&self, _super_stream: &str) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().partitions.clone())
    }

    async fn route(&self, _super_stream: &str, routing_key: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .routing_table
            .get(routing_key)
            .cloned()
            .unwrap_or_default())
    }
}
