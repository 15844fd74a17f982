use thiserror::Error;

pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Synchronous, pre-open configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("super-stream name must not be empty")]
    EmptySuperStreamName,

    #[error("a routing strategy must be provided")]
    MissingRouting,

    #[error("stream name must not be empty")]
    EmptyStreamName,

    #[error("a reference is required when single-active-consumer is enabled")]
    MissingReferenceForSingleActiveConsumer,

    #[error("a message handler must be provided before opening the consumer")]
    MissingMessageHandler,
}

/// Routing key extraction / lookup failures.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("routing key extractor returned an empty key")]
    RoutingKeyMissing,

    #[error("routing produced no destination partition")]
    NoPartitions,
}

/// Transport/broker interaction failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("broker returned non-OK response code {0}")]
    NonOkResponse(u16),

    #[error("metadata lookup for {0:?} failed")]
    MetadataLookupFailed(String),

    #[error("producer or consumer is not connected")]
    NotConnected,

    #[error("producer or consumer is reconnecting")]
    Reconnecting,

    #[error("transport signal channel closed unexpectedly")]
    SignalStreamClosed,
}

/// Chunk/sub-entry framing failures, including the compression path.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to compress sub-entry batch")]
    CompressFailure(#[source] anyhow::Error),

    #[error("failed to decompress sub-entry batch")]
    DecompressFailure(#[source] anyhow::Error),

    #[error("unknown compression type {0}")]
    UnknownCompressionType(u8),

    #[error("chunk entry declared length {0}, but only {1} bytes remained")]
    RecordLengthOutOfRange(usize, usize),

    #[error("unexpected end of chunk data while decoding entry header")]
    TruncatedEntry,
}

/// Per-message decode failure; logged and skipped, never fatal.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed chunk entry: {0}")]
    MalformedEntry(#[from] CodecError),
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("broker rejected create: {0}")]
    CreateProducerException(String),

    #[error("broker rejected create: {0}")]
    CreateConsumerException(String),

    #[error("handle is already disposed")]
    AlreadyDisposed,

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Whether this failure is one the keep-alive/reconnect glue should retry,
    /// as opposed to one that should be surfaced straight to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::Transport(TransportError::NotConnected)
                | StreamError::Transport(TransportError::Reconnecting)
                | StreamError::Transport(TransportError::SignalStreamClosed)
        )
    }
}
