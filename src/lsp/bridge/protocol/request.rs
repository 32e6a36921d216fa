//! Request builder for the relayed workspace command.

use super::request_id::RequestId;

/// Build the JSON-RPC `workspace/executeCommand` request that carries a
/// completion lookup to the downstream server.
///
/// The argument order is part of the command's contract: the document
/// locator string, then the zero-based line, then the zero-based character
/// offset.
pub(crate) fn build_execute_command_request(
    request_id: RequestId,
    command: &str,
    locator: &str,
    line: u32,
    character: u32,
) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": request_id.as_i64(),
        "method": "workspace/executeCommand",
        "params": {
            "command": command,
            "arguments": [locator, line, character]
        }
    })
}
