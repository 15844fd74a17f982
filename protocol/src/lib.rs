//! Wire-independent data model shared by `stream-std` and `stream-client`.
//!
//! None of the types in this crate know how to reach a broker; they describe
//! what a message, a chunk, or a routing table *is*, leaving transport and
//! the outer RPC framing to the caller (see `stream-client::transport`).

mod chunk;
mod error_codes;
mod message;
mod offset;
mod routing_table;

pub use chunk::{Chunk, CompressionType, OffsetMessage};
pub use error_codes::ResponseCode;
pub use message::{Message, MessageProperties};
pub use offset::OffsetSpecification;
pub use routing_table::RoutingTable;

/// A super-stream's partitions, in broker-assigned order. Order is
/// significant: hash routing indexes into this list directly.
pub type PartitionList = Vec<String>;
