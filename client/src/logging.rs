//! Structured logging helpers, grouped by subsystem (`logging::reconnect::*`,
//! `logging::chunk::*`, ...) rather than inlining `tracing::warn!`/
//! `tracing::info!` at each call site.

pub mod reconnect {
    use crate::backoff::NextAttempt;

    pub fn connection_lost(partition: &str) {
        tracing::warn!(partition, "partition producer connection lost");
    }

    pub fn attempt(partition: &str, next: NextAttempt) {
        tracing::info!(
            partition,
            attempt = next.attempt_num,
            max_attempts = ?next.max_attempts,
            wait_ms = next.duration.as_millis() as u64,
            "attempting reconnect"
        );
    }

    pub fn succeeded(partition: &str) {
        tracing::info!(partition, "reconnect succeeded");
    }

    pub fn exhausted(partition: &str) {
        tracing::error!(partition, "exhausted reconnect attempts, giving up");
    }
}

pub mod metadata {
    pub fn partition_removed(super_stream: &str, partition: &str) {
        tracing::info!(super_stream, partition, "partition removed from metadata, pruning route");
    }

    pub fn partition_list_refreshed(super_stream: &str, count: usize) {
        tracing::debug!(super_stream, partition_count = count, "partition list refreshed");
    }
}

pub mod chunk {
    pub fn decode_skip(stream: &str, offset: u64, error: &stream_std::errors::StreamError) {
        tracing::warn!(stream, offset, error = %error, "skipping undecodable chunk entry");
    }

    pub fn credit_granted(stream: &str, subscriber_id: u8, count: u16) {
        tracing::debug!(stream, subscriber_id, count, "granted consumer credit");
    }

    pub fn cancelled(stream: &str) {
        tracing::info!(stream, "chunk parsing cancelled mid-handler");
    }
}

pub mod producer {
    pub fn route_empty(super_stream: &str, key: &str) {
        tracing::warn!(super_stream, key, "routing produced no destination partition");
    }

    pub fn partition_created(super_stream: &str, partition: &str) {
        tracing::debug!(super_stream, partition, "lazily opened partition producer");
    }
}
