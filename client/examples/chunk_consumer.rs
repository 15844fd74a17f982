//! Demonstrates subscribing, credit-based flow control and offset filtering
//! against an in-memory [`DemoTransport`] standing in for a real broker
//! connection.
//!
//! Run with: `cargo run --example chunk_consumer`

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use stream_client::{
    transport::{Confirmation, SubscribeConfig, Transport, TransportSignal},
    ConsumerBuilder,
};
use stream_protocol::{Chunk, Message, OffsetSpecification, ResponseCode};
use stream_std::errors::Result;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::BroadcastStream;

/// Stands in for a real broker connection: records the credit the consumer
/// has been granted so the demo can show the "one credit per chunk" policy
/// taking effect.
struct DemoTransport {
    credit: Mutex<u16>,
    confirm_tx: broadcast::Sender<Confirmation>,
    signal_tx: broadcast::Sender<TransportSignal>,
}

impl DemoTransport {
    fn new() -> Arc<Self> {
        let (confirm_tx, _) = broadcast::channel(8);
        let (signal_tx, _) = broadcast::channel(8);
        Arc::new(Self {
            credit: Mutex::new(0),
            confirm_tx,
            signal_tx,
        })
    }
}

#[async_trait]
impl Transport for DemoTransport {
    async fn declare_publisher(&self, _partition: &str, _reference: Option<&str>) -> Result<()> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn send(&self, _partition: &str, _publishing_id: u64, _message: Message) -> Result<()> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn send_batch(&self, _partition: &str, _messages: Vec<(u64, Message)>) -> Result<()> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn send_sub_entry(
        &self,
        _partition: &str,
        _publishing_id: u64,
        _compressed: Bytes,
        _uncompressed_size: u32,
        _record_count: u16,
        _compression: stream_protocol::CompressionType,
    ) -> Result<()> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn get_last_publishing_id(&self, _partition: &str, _reference: &str) -> Result<u64> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn close_publisher(&self, _partition: &str) -> Result<ResponseCode> {
        unimplemented!("this demo only exercises the consumer side")
    }

    async fn subscribe(&self, stream: &str, config: SubscribeConfig) -> Result<(u8, ResponseCode)> {
        println!("subscribed to {stream} with initial credit {}", config.initial_credit);
        *self.credit.lock().await = config.initial_credit;
        Ok((0, ResponseCode::OK))
    }

    async fn credit(&self, subscriber_id: u8, count: u16) -> Result<()> {
        let mut credit = self.credit.lock().await;
        *credit += count;
        println!("granted {count} credit to subscriber {subscriber_id}, total now {credit}");
        Ok(())
    }

    async fn unsubscribe(&self, subscriber_id: u8) -> Result<ResponseCode> {
        println!("unsubscribed {subscriber_id}");
        Ok(ResponseCode::OK)
    }

    async fn store_offset(&self, reference: &str, stream: &str, offset: u64) -> Result<()> {
        println!("stored offset {offset} for {reference}@{stream}");
        Ok(())
    }

    fn signals(&self) -> BroadcastStream<TransportSignal> {
        BroadcastStream::new(self.signal_tx.subscribe())
    }

    fn confirmations(&self) -> BroadcastStream<Confirmation> {
        BroadcastStream::new(self.confirm_tx.subscribe())
    }
}

fn encode_standard(body: &[u8]) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u32(body.len() as u32);
    buf.put_slice(body);
    buf
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let transport = DemoTransport::new();

    let consumer = ConsumerBuilder::new("invoices-0", transport.clone() as Arc<dyn Transport>)
        .offset(OffsetSpecification::Offset(2))
        .message_handler(|message| {
            println!(
                "delivered offset={} body={:?}",
                message.offset,
                String::from_utf8_lossy(&message.message.body)
            );
        })
        .open()
        .await?;

    let mut data = BytesMut::new();
    for body in ["zero", "one", "two", "three", "four"] {
        data.extend(encode_standard(body.as_bytes()));
    }
    let chunk = Chunk::new(0, 0, 5, data.freeze());

    // offsets 0 and 1 are filtered out by the Offset(2) starting point.
    consumer.deliver(chunk).await?;

    consumer.close().await?;
    Ok(())
}
