use std::collections::HashMap;

/// Maps a routing-key string to the partition(s) it should be sent to, used
/// by the key routing strategy (`stream-client::routing::key`).
///
/// Unknown keys resolve to no partition; the caller sees this as an empty
/// result, not a missing-entry error, so that a super-stream producer can
/// apply a uniform "no route" failure regardless of routing strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable(HashMap<String, Vec<String>>);

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, partitions: Vec<String>) {
        self.0.insert(key.into(), partitions);
    }

    pub fn route(&self, key: &str) -> Vec<String> {
        self.0.get(key).cloned().unwrap_or_default()
    }
}

impl FromIterator<(String, Vec<String>)> for RoutingTable {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
