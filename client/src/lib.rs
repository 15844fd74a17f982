//! Routing, producer and consumer core for a log-structured message broker
//! super-stream client. TCP framing, the outer wire codec and connection
//! lifecycle are deliberately excluded; this crate drives them
//! through the [`transport::Transport`] and [`transport::MetadataClient`]
//! traits so the whole core is testable without a broker.

pub mod backoff;
pub mod consumer;
pub mod logging;
pub mod producer;
pub mod reconnect;
pub mod routing;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer::{Consumer, ConsumerBuilder};
pub use producer::{SuperStreamProducer, SuperStreamProducerBuilder};
pub use routing::{HashRouting, KeyRouting, KeyExtractor, MessageIdKey, RoutingStrategy};
pub use transport::{Confirmation, MetadataClient, SubscribeConfig, Transport, TransportSignal};
