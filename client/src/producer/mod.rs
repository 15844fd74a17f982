pub mod builder;
pub mod partition;
pub mod super_stream;

pub use builder::SuperStreamProducerBuilder;
pub use partition::{ConfirmHandler, PartitionProducer, ProducerState};
pub use super_stream::SuperStreamProducer;
