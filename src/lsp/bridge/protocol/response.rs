//! Response handling for the relayed workspace command.
//!
//! The downstream command returns an array of completion-item records whose
//! shape the relay does not own. Items are deserialized only to pass them
//! through; nothing is reordered, filtered, or rewritten.

use tower_lsp_server::ls_types::CompletionItem;

use crate::error::{RelayError, RelayResult};

/// Parse a JSON-RPC response envelope into the relayed completion items.
///
/// * A `null` or absent result means the command had nothing to say and maps
///   to an empty list.
/// * A JSON-RPC `error` member or a non-array result is a failure of the
///   external capability.
///
/// Item order is preserved exactly as received.
pub(crate) fn parse_completion_items(
    mut response: serde_json::Value,
) -> RelayResult<Vec<CompletionItem>> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        return Err(RelayError::Command { code, message });
    }

    let Some(result) = response.get_mut("result").map(serde_json::Value::take) else {
        return Ok(Vec::new());
    };
    if result.is_null() {
        return Ok(Vec::new());
    }
    if !result.is_array() {
        return Err(RelayError::protocol(format!(
            "completion command returned a non-array result: {}",
            result
        )));
    }

    serde_json::from_value(result)
        .map_err(|e| RelayError::protocol(format!("malformed completion items: {}", e)))
}
