use bytes::Bytes;
use std::collections::HashMap;

/// The only property the core reads from a message; callers are free to set
/// more, but routing key extractors and application code generally key off
/// this one.
const MESSAGE_ID: &str = "message-id";

/// A free-form property bag attached to a [`Message`].
///
/// The core treats this as opaque except for the `message-id` entry, which
/// routing key extractors commonly read (see `stream-client::routing`).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageProperties(HashMap<String, String>);

impl MessageProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.0.insert(MESSAGE_ID.to_string(), id.into());
        self
    }

    pub fn message_id(&self) -> Option<&str> {
        self.0.get(MESSAGE_ID).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// An immutable byte record with a pre-known serialized length, plus a
/// property sub-record.
///
/// `Message` is opaque payload as far as the core is concerned: it never
/// interprets `body`, only ever measures and forwards it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub properties: MessageProperties,
    pub body: Bytes,
}

impl Message {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            properties: MessageProperties::new(),
            body: body.into(),
        }
    }

    pub fn with_properties(mut self, properties: MessageProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Length of `body` once placed on the wire as a standard chunk entry:
    /// a `u32` length prefix followed by the raw bytes.
    pub fn serialized_length(&self) -> usize {
        4 + self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_round_trips() {
        let props = MessageProperties::new().with_message_id("hello1");
        assert_eq!(props.message_id(), Some("hello1"));
    }

    #[test]
    fn missing_message_id_is_none() {
        let props = MessageProperties::new();
        assert_eq!(props.message_id(), None);
    }

    #[test]
    fn serialized_length_includes_length_prefix() {
        let msg = Message::new(Bytes::from_static(b"hello"));
        assert_eq!(msg.serialized_length(), 4 + 5);
    }
}
