//! Routing strategies: pure functions from a message and an ordered
//! partition list to the subset of partitions it should be sent to.

mod murmur3;

use murmur3::murmur3_32;
use stream_protocol::{Message, PartitionList, RoutingTable};
use stream_std::errors::{Result, RoutingError};

/// The fixed seed the broker also uses when computing routing for queries,
/// so client and broker agree on which partition a key maps to.
const MURMUR3_SEED: u32 = 104729;

/// Extracts the routing key from a message. Usually reads
/// [`MessageProperties::message_id`](stream_protocol::MessageProperties::message_id),
/// but is left generic so callers can route on any derived string.
pub trait KeyExtractor: Send + Sync {
    fn extract(&self, message: &Message) -> Option<String>;
}

impl<F> KeyExtractor for F
where
    F: Fn(&Message) -> Option<String> + Send + Sync,
{
    fn extract(&self, message: &Message) -> Option<String> {
        self(message)
    }
}

/// Extracts the routing key from a message's `message-id` property, the
/// extractor used throughout this crate's tests and examples.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageIdKey;

impl KeyExtractor for MessageIdKey {
    fn extract(&self, message: &Message) -> Option<String> {
        message.properties.message_id().map(str::to_owned)
    }
}

/// `route(message, partitions) -> subset of partitions`: pure, deterministic,
/// no I/O.
pub trait RoutingStrategy: Send + Sync {
    fn route(&self, message: &Message, partitions: &PartitionList) -> Result<Vec<String>>;
}

/// Hash routing: `partitions[ murmur3(key, 104729) mod len(partitions) ]`.
pub struct HashRouting {
    extractor: Box<dyn KeyExtractor>,
}

impl HashRouting {
    pub fn new(extractor: impl KeyExtractor + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
        }
    }
}

impl RoutingStrategy for HashRouting {
    fn route(&self, message: &Message, partitions: &PartitionList) -> Result<Vec<String>> {
        let key = self
            .extractor
            .extract(message)
            .filter(|k| !k.is_empty())
            .ok_or(RoutingError::RoutingKeyMissing)?;

        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let hash = murmur3_32(key.as_bytes(), MURMUR3_SEED);
        let index = (hash as usize) % partitions.len();
        Ok(vec![partitions[index].clone()])
    }
}

/// Key routing: exact-match the extracted key against a [`RoutingTable`].
/// Unknown keys route to no partition; the super-stream producer surfaces
/// this as a per-send [`RoutingError`] rather than silently dropping.
pub struct KeyRouting {
    extractor: Box<dyn KeyExtractor>,
    table: RoutingTable,
}

impl KeyRouting {
    pub fn new(extractor: impl KeyExtractor + 'static, table: RoutingTable) -> Self {
        Self {
            extractor: Box::new(extractor),
            table,
        }
    }
}

impl RoutingStrategy for KeyRouting {
    fn route(&self, message: &Message, _partitions: &PartitionList) -> Result<Vec<String>> {
        let key = self
            .extractor
            .extract(message)
            .filter(|k| !k.is_empty())
            .ok_or(RoutingError::RoutingKeyMissing)?;

        Ok(self.table.route(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_protocol::MessageProperties;

    fn message(id: &str) -> Message {
        Message::new(bytes::Bytes::new()).with_properties(MessageProperties::new().with_message_id(id))
    }

    fn invoices() -> PartitionList {
        vec![
            "invoices-0".to_string(),
            "invoices-1".to_string(),
            "invoices-2".to_string(),
        ]
    }

    #[test]
    fn hash_routing_is_deterministic() {
        let strategy = HashRouting::new(MessageIdKey);
        let partitions = invoices();
        let a = strategy.route(&message("hello1"), &partitions).unwrap();
        let b = strategy.route(&message("hello1"), &partitions).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_routing_distribution_matches_spec_table() {
        let strategy = HashRouting::new(MessageIdKey);
        let partitions = invoices();
        let mut counts = [0usize; 3];
        for i in 0..20 {
            let routed = strategy.route(&message(&format!("hello{i}")), &partitions).unwrap();
            let index = partitions.iter().position(|p| p == &routed[0]).unwrap();
            counts[index] += 1;
        }
        assert_eq!(counts, [9, 7, 4]);
    }

    #[test]
    fn hash_routing_rejects_empty_key() {
        let strategy = HashRouting::new(MessageIdKey);
        let err = strategy.route(&message(""), &invoices()).unwrap_err();
        assert!(matches!(
            err,
            stream_std::errors::StreamError::Routing(RoutingError::RoutingKeyMissing)
        ));
    }

    #[test]
    fn key_routing_returns_empty_for_unknown_key() {
        let table = RoutingTable::new();
        let strategy = KeyRouting::new(MessageIdKey, table);
        let routed = strategy.route(&message("eu"), &invoices()).unwrap();
        assert!(routed.is_empty());
    }

    #[test]
    fn key_routing_returns_table_entry() {
        let mut table = RoutingTable::new();
        table.insert("eu", vec!["invoices-1".to_string()]);
        let strategy = KeyRouting::new(MessageIdKey, table);
        let routed = strategy.route(&message("eu"), &invoices()).unwrap();
        assert_eq!(routed, vec!["invoices-1"]);
    }
}
