//! Demonstrates routing, deduplication and sub-entry compression against an
//! in-memory [`DemoTransport`] standing in for a real broker connection
//! (TCP framing and connection lifecycle are out of scope for this crate).
//!
//! Run with: `cargo run --example super_stream_producer --features compression`

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stream_client::{
    routing::{HashRouting, MessageIdKey},
    transport::{Confirmation, MetadataClient, SubscribeConfig, Transport, TransportSignal},
    SuperStreamProducerBuilder,
};
use stream_protocol::{CompressionType, Message, MessageProperties, ResponseCode};
use stream_std::errors::Result;
use stream_std::traits::gzip::GzipCompression;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Stands in for a real broker connection: records publisher declarations
/// and acknowledges every send immediately.
struct DemoTransport {
    partitions: Vec<String>,
    counts: Mutex<HashMap<String, usize>>,
    confirm_tx: broadcast::Sender<Confirmation>,
    signal_tx: broadcast::Sender<TransportSignal>,
}

impl DemoTransport {
    fn new(partitions: Vec<String>) -> Arc<Self> {
        let (confirm_tx, _) = broadcast::channel(64);
        let (signal_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            partitions,
            counts: Mutex::new(HashMap::new()),
            confirm_tx,
            signal_tx,
        })
    }

    fn record(&self, partition: &str, n: usize) {
        *self.counts.lock().unwrap().entry(partition.to_string()).or_default() += n;
    }
}

#[async_trait]
impl Transport for DemoTransport {
    async fn declare_publisher(&self, partition: &str, reference: Option<&str>) -> Result<()> {
        println!("declared publisher on {partition} (reference={reference:?})");
        Ok(())
    }

    async fn send(&self, partition: &str, publishing_id: u64, _message: Message) -> Result<()> {
        self.record(partition, 1);
        let _ = self.confirm_tx.send(Confirmation {
            partition: partition.to_string(),
            publishing_id,
            code: ResponseCode::OK,
        });
        Ok(())
    }

    async fn send_batch(&self, partition: &str, messages: Vec<(u64, Message)>) -> Result<()> {
        self.record(partition, messages.len());
        for (publishing_id, _) in messages {
            let _ = self.confirm_tx.send(Confirmation {
                partition: partition.to_string(),
                publishing_id,
                code: ResponseCode::OK,
            });
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
        self.record(partition, record_count as usize);
        let _ = self.confirm_tx.send(Confirmation {
            partition: partition.to_string(),
            publishing_id,
            code: ResponseCode::OK,
        });
        Ok(())
    }

    async fn get_last_publishing_id(&self, _partition: &str, _reference: &str) -> Result<u64> {
        Ok(0)
    }

    async fn close_publisher(&self, partition: &str) -> Result<ResponseCode> {
        println!("closed publisher on {partition}");
        Ok(ResponseCode::OK)
    }

    async fn subscribe(&self, _stream: &str, _config: SubscribeConfig) -> Result<(u8, ResponseCode)> {
        unimplemented!("this demo only exercises the producer side")
    }

    async fn credit(&self, _subscriber_id: u8, _count: u16) -> Result<()> {
        unimplemented!("this demo only exercises the producer side")
    }

    async fn unsubscribe(&self, _subscriber_id: u8) -> Result<ResponseCode> {
        unimplemented!("this demo only exercises the producer side")
    }

    async fn store_offset(&self, _reference: &str, _stream: &str, _offset: u64) -> Result<()> {
        unimplemented!("this demo only exercises the producer side")
    }

    fn signals(&self) -> BroadcastStream<TransportSignal> {
        BroadcastStream::new(self.signal_tx.subscribe())
    }

    fn confirmations(&self) -> BroadcastStream<Confirmation> {
        BroadcastStream::new(self.confirm_tx.subscribe())
    }
}

#[async_trait]
impl MetadataClient for DemoTransport {
    async fn partitions(&self, _super_stream: &str) -> Result<Vec<String>> {
        Ok(self.partitions.clone())
    }

    async fn route(&self, _super_stream: &str, _routing_key: &str) -> Result<Vec<String>> {
        Ok(self.partitions.clone())
    }
}

fn message(id: String) -> Message {
    Message::new(Bytes::from(format!("invoice body for {id}")))
        .with_properties(MessageProperties::new().with_message_id(id))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let partitions = vec![
        "invoices-0".to_string(),
        "invoices-1".to_string(),
        "invoices-2".to_string(),
    ];
    let transport = DemoTransport::new(partitions);

    let producer = SuperStreamProducerBuilder::new(
        "invoices",
        transport.clone() as Arc<dyn Transport>,
        transport.clone() as Arc<dyn MetadataClient>,
    )
    .routing(HashRouting::new(MessageIdKey))
    .reference("example-producer")
    .confirm_handler(|confirmation| {
        println!(
            "confirmed publishing_id={} on {}",
            confirmation.publishing_id, confirmation.partition
        );
    })
    .open()
    .await?;

    for i in 0..10u64 {
        producer.send(i, message(format!("hello{i}"))).await?;
    }

    let batch: Vec<_> = (10..20u64).map(|i| (i, message(format!("hello{i}")))).collect();
    producer.batch_send(batch).await?;

    let batch_of_messages: Vec<_> = (20..30u64).map(|i| message(format!("hello{i}"))).collect();
    let jitter_ms: u64 = rand::thread_rng().gen_range(1..=5);
    tokio::time::sleep(std::time::Duration::from_millis(jitter_ms)).await;
    producer
        .sub_entry_send(
            30,
            batch_of_messages,
            CompressionType::Gzip,
            Arc::new(GzipCompression),
        )
        .await?;

    producer.close().await?;
    Ok(())
}
