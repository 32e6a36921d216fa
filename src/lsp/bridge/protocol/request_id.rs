//! JSON-RPC request ID type for downstream communication.

/// JSON-RPC request ID for messages sent to the downstream server.
///
/// Wraps `i64` so request IDs cannot be confused with line numbers or other
/// integers, and so the pending-request map has a dedicated key type. LSP
/// allows string IDs as well, but the bridge generates every downstream ID
/// itself, so numeric IDs are sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestId(i64);

impl RequestId {
    /// Create a new RequestId from an i64 value.
    #[inline]
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying i64 value for wire transmission.
    #[inline]
    pub(crate) fn as_i64(self) -> i64 {
        self.0
    }

    /// Extract a RequestId from a JSON-RPC message.
    ///
    /// Returns `None` if the message has no numeric "id" field, which is the
    /// case for notifications.
    pub(crate) fn from_json(message: &serde_json::Value) -> Option<Self> {
        message.get("id")?.as_i64().map(Self)
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
