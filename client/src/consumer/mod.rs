pub mod builder;
pub mod chunk_reader;
pub mod consumer;

pub use builder::ConsumerBuilder;
pub use chunk_reader::{parse_chunk, ParsedEntry};
pub use consumer::{Consumer, DecompressorResolver, MessageHandler};
