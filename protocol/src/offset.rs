/// Where a consumer should start reading a stream.
///
/// `Next`, `First`, `Last` and `Timestamp` are resolved broker-side; only
/// `Offset` requires client-side filtering once chunks start arriving (see
/// `stream-client::consumer::chunk_reader`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OffsetSpecification {
    Next,
    First,
    Last,
    Offset(u64),
    Timestamp(i64),
}

impl OffsetSpecification {
    /// The minimum message offset this spec permits through to the handler,
    /// if it imposes one at all.
    pub fn floor(&self) -> Option<u64> {
        match self {
            Self::Offset(offset) => Some(*offset),
            _ => None,
        }
    }
}

impl Default for OffsetSpecification {
    fn default() -> Self {
        Self::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_offset_spec_imposes_a_floor() {
        assert_eq!(OffsetSpecification::Offset(42).floor(), Some(42));
        assert_eq!(OffsetSpecification::Next.floor(), None);
        assert_eq!(OffsetSpecification::First.floor(), None);
        assert_eq!(OffsetSpecification::Last.floor(), None);
        assert_eq!(OffsetSpecification::Timestamp(0).floor(), None);
    }
}
