/// A broker response code, as carried on confirmations, subscribe replies
/// and close/unsubscribe acknowledgements.
///
/// This is intentionally a thin new-type over `u16` rather than a closed
/// enum: the set of codes a broker can return evolves independently of this
/// crate, and callers only ever need to compare against the handful of named
/// constants below or treat the value as opaque for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ResponseCode(pub u16);

impl ResponseCode {
    pub const OK: ResponseCode = ResponseCode(1);
    pub const STREAM_DOES_NOT_EXIST: ResponseCode = ResponseCode(2);
    pub const SUBSCRIPTION_ID_ALREADY_EXISTS: ResponseCode = ResponseCode(3);
    pub const PUBLISHER_DOES_NOT_EXIST: ResponseCode = ResponseCode(4);
    pub const UNKNOWN_ERROR: ResponseCode = ResponseCode(u16::MAX);

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
