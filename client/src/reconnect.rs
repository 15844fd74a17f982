//! Metadata/reconnect glue.
//!
//! A single background task per super-stream producer watches the
//! transport's signal stream and reacts to `connection_closed` /
//! `metadata_update` without the hot send path ever touching the signal
//! channel itself: a `CancellationToken` raced against the watched stream
//! inside `tokio::select!`, cancelled from `Drop`.

use crate::logging;
use crate::producer::partition::PartitionProducer;
use crate::transport::{MetadataClient, Transport, TransportSignal};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Spawns the watcher task for a super-stream producer. Removing a
/// partition from `producers` on a `MetadataUpdate` removal and refreshing
/// `partitions` is what lets sends to surviving partitions keep working
/// after one partition is deleted: the next `send` simply recreates a
/// producer against the refreshed list.
pub fn spawn_producer_watcher(
    super_stream: String,
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataClient>,
    producers: Arc<DashMap<String, Arc<PartitionProducer>>>,
    partitions: Arc<RwLock<Vec<String>>>,
    cancellation_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut signals = transport.signals();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                signal = signals.next() => {
                    match signal {
                        Some(Ok(signal)) => {
                            handle_signal(&super_stream, signal, &metadata, &producers, &partitions).await;
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = cancellation_token.cancelled() => break,
            }
        }
    })
}

async fn handle_signal(
    super_stream: &str,
    signal: TransportSignal,
    metadata: &Arc<dyn MetadataClient>,
    producers: &DashMap<String, Arc<PartitionProducer>>,
    partitions: &RwLock<Vec<String>>,
) {
    match signal {
        TransportSignal::ConnectionClosed { stream, .. } => {
            if let Some(producer) = producers.get(&stream) {
                producer.mark_reconnecting();
            }
        }
        TransportSignal::MetadataUpdate { stream, .. } => {
            producers.remove(&stream);
            logging::metadata::partition_removed(super_stream, &stream);

            match metadata.partitions(super_stream).await {
                Ok(refreshed) => {
                    let count = refreshed.len();
                    *partitions.write().await = refreshed;
                    logging::metadata::partition_list_refreshed(super_stream, count);
                }
                Err(_) => {
                    let mut guard = partitions.write().await;
                    guard.retain(|p| p != &stream);
                }
            }
        }
    }
}
