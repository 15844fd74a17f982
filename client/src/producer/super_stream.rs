//! The hard part: a single logical producer multiplexed over per-partition
//! producers, created lazily and rebuilt as metadata changes.

use super::partition::{ConfirmHandler, PartitionProducer};
use crate::backoff::BackoffStrategy;
use crate::logging;
use crate::reconnect;
use crate::routing::RoutingStrategy;
use crate::transport::{MetadataClient, Transport};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stream_protocol::{CompressionType, Message, ResponseCode};
use stream_std::errors::{ConfigError, Result, RoutingError, StreamError};
use stream_std::traits::Compress;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Multiplexes a logical super-stream producer over the partition producers
/// backing its individual partition streams.
pub struct SuperStreamProducer {
    super_stream: String,
    routing: Box<dyn RoutingStrategy>,
    reference: Option<String>,
    confirm_handler: ConfirmHandler,
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataClient>,
    partitions: Arc<RwLock<Vec<String>>>,
    producers: Arc<DashMap<String, Arc<PartitionProducer>>>,
    creation_locks: DashMap<String, Arc<Mutex<()>>>,
    backoff_strategy: BackoffStrategy,
    closed: AtomicBool,
    cancellation_token: CancellationToken,
    watcher: tokio::task::JoinHandle<()>,
}

impl SuperStreamProducer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn open(
        super_stream: String,
        routing: Box<dyn RoutingStrategy>,
        reference: Option<String>,
        confirm_handler: ConfirmHandler,
        transport: Arc<dyn Transport>,
        metadata: Arc<dyn MetadataClient>,
        backoff_strategy: BackoffStrategy,
    ) -> Result<Self> {
        if super_stream.is_empty() {
            return Err(ConfigError::EmptySuperStreamName.into());
        }

        let initial_partitions = metadata.partitions(&super_stream).await.map_err(|_| {
            StreamError::CreateProducerException(format!(
                "metadata lookup for super-stream {super_stream:?} failed"
            ))
        })?;

        if initial_partitions.is_empty() {
            return Err(StreamError::CreateProducerException(format!(
                "super-stream {super_stream:?} has no partitions"
            )));
        }

        let partitions = Arc::new(RwLock::new(initial_partitions));
        let producers = Arc::new(DashMap::new());
        let cancellation_token = CancellationToken::new();

        let watcher = reconnect::spawn_producer_watcher(
            super_stream.clone(),
            transport.clone(),
            metadata.clone(),
            producers.clone(),
            partitions.clone(),
            cancellation_token.clone(),
        );

        Ok(Self {
            super_stream,
            routing,
            reference,
            confirm_handler,
            transport,
            metadata,
            partitions,
            producers,
            creation_locks: DashMap::new(),
            backoff_strategy,
            closed: AtomicBool::new(false),
            cancellation_token,
            watcher,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StreamError::AlreadyDisposed);
        }
        Ok(())
    }

    async fn partitions_snapshot(&self) -> Vec<String> {
        self.partitions.read().await.clone()
    }

    /// Returns the cached producer for `partition`, reopening it if it was
    /// marked reconnecting, or creates and caches a new one. A per-partition
    /// mutex serializes creation so a race between two sends to a
    /// newly-seen partition only declares it once.
    async fn get_or_create(&self, partition: &str) -> Result<Arc<PartitionProducer>> {
        if let Some(entry) = self.producers.get(partition) {
            let producer = entry.value().clone();
            drop(entry);

            if producer.state() == crate::producer::ProducerState::Reconnecting {
                self.reopen_with_backoff(&producer).await?;
            }
            return Ok(producer);
        }

        let lock = self
            .creation_locks
            .entry(partition.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(entry) = self.producers.get(partition) {
            return Ok(entry.value().clone());
        }

        let producer = Arc::new(
            PartitionProducer::create(
                partition.to_string(),
                self.reference.clone(),
                self.transport.clone(),
                self.confirm_handler.clone(),
            )
            .await?,
        );

        logging::producer::partition_created(&self.super_stream, partition);
        self.producers.insert(partition.to_string(), producer.clone());
        Ok(producer)
    }

    /// Redeclares a partition producer, retrying per the configured
    /// [`BackoffStrategy`] on failure.
    async fn reopen_with_backoff(&self, producer: &Arc<PartitionProducer>) -> Result<()> {
        let mut attempts = self.backoff_strategy.iter();

        loop {
            match producer.reopen().await {
                Ok(()) => return Ok(()),
                Err(err) => match attempts.next() {
                    Some(next) => {
                        logging::reconnect::attempt(producer.partition(), next);
                        tokio::time::sleep(next.duration).await;
                    }
                    None => {
                        logging::reconnect::exhausted(producer.partition());
                        return Err(err);
                    }
                },
            }
        }
    }

    fn route_one(&self, message: &Message, partitions: &[String]) -> Result<String> {
        let routed = self.routing.route(message, &partitions.to_vec())?;
        routed.into_iter().next().ok_or_else(|| {
            logging::producer::route_empty(&self.super_stream, "");
            RoutingError::NoPartitions.into()
        })
    }

    /// Routes, selects one partition, and delegates `send` to its producer,
    /// creating the producer on first use.
    pub async fn send(&self, publishing_id: u64, message: Message) -> Result<()> {
        self.ensure_open()?;
        let partitions = self.partitions_snapshot().await;
        let partition = self.route_one(&message, &partitions)?;
        let producer = self.get_or_create(&partition).await?;
        producer.send(publishing_id, message).await
    }

    /// Groups by destination partition, preserving each partition's
    /// relative input order, then issues one batch per partition — the
    /// invariant the 9/7/4 distribution tests rely on.
    pub async fn batch_send(&self, entries: Vec<(u64, Message)>) -> Result<()> {
        self.ensure_open()?;
        let partitions = self.partitions_snapshot().await;

        let mut order = Vec::new();
        let mut groups: HashMap<String, Vec<(u64, Message)>> = HashMap::new();

        for (publishing_id, message) in entries {
            let partition = self.route_one(&message, &partitions)?;
            if !groups.contains_key(&partition) {
                order.push(partition.clone());
            }
            groups.entry(partition).or_default().push((publishing_id, message));
        }

        for partition in order {
            let producer = self.get_or_create(&partition).await?;
            let batch = groups.remove(&partition).unwrap_or_default();
            producer.batch_send(batch).await?;
        }

        Ok(())
    }

    /// Same grouping as `batch_send`, but issues one sub-entry frame per
    /// partition, reusing the single caller-supplied `publishing_id` across
    /// all of them (see the cross-partition id reuse this preserves in
    /// `DESIGN.md`).
    pub async fn sub_entry_send(
        &self,
        publishing_id: u64,
        messages: Vec<Message>,
        compression: CompressionType,
        compressor: Arc<dyn Compress + Send + Sync>,
    ) -> Result<()> {
        self.ensure_open()?;
        let partitions = self.partitions_snapshot().await;

        let mut order = Vec::new();
        let mut groups: HashMap<String, Vec<Message>> = HashMap::new();

        for message in messages {
            let partition = self.route_one(&message, &partitions)?;
            if !groups.contains_key(&partition) {
                order.push(partition.clone());
            }
            groups.entry(partition).or_default().push(message);
        }

        for partition in order {
            let producer = self.get_or_create(&partition).await?;
            let group = groups.remove(&partition).unwrap_or_default();
            producer
                .sub_entry_send(publishing_id, group, compression, compressor.as_ref())
                .await?;
        }

        Ok(())
    }

    /// The max across partitions' acknowledged highwaters; `0` for an empty
    /// producer reference.
    pub async fn get_last_publishing_id(&self) -> Result<u64> {
        if self.reference.is_none() {
            return Ok(0);
        }

        let mut max = 0u64;
        for entry in self.producers.iter() {
            max = max.max(entry.value().get_last_publishing_id().await?);
        }
        Ok(max)
    }

    /// Closes every cached partition producer. Returns `Ok` only if all
    /// succeeded; the first non-`Ok` otherwise.
    pub async fn close(&self) -> Result<ResponseCode> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(ResponseCode::OK);
        }

        self.cancellation_token.cancel();

        let mut first_failure = None;
        for entry in self.producers.iter() {
            match entry.value().close().await {
                Ok(code) if code.is_ok() => {}
                Ok(code) if first_failure.is_none() => first_failure = Some(code),
                Err(err) => return Err(err),
                _ => {}
            }
        }

        Ok(first_failure.unwrap_or(ResponseCode::OK))
    }

    /// Forces `close` with a short grace period.
    pub async fn dispose(&self) {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), self.close()).await;
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    pub fn super_stream(&self) -> &str {
        &self.super_stream
    }
}

impl Drop for SuperStreamProducer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
        self.watcher.abort();
    }
}
