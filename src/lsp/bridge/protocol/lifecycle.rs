//! LSP lifecycle message builders for the downstream connection.
//!
//! The downstream server must complete the initialize handshake before it
//! accepts `workspace/executeCommand`, and expects the shutdown/exit pair on
//! teardown.

use super::request_id::RequestId;

/// Build the downstream initialize request.
///
/// The workspace root observed in our own `initialize` is forwarded so the
/// downstream server resolves documents against the same projects the editor
/// has open.
pub(crate) fn build_initialize_request(
    request_id: RequestId,
    root_uri: Option<&str>,
    initialization_options: Option<serde_json::Value>,
) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": request_id.as_i64(),
        "method": "initialize",
        "params": {
            "processId": std::process::id(),
            "clientInfo": {
                "name": "mixin-ls",
                "version": env!("CARGO_PKG_VERSION")
            },
            "rootUri": root_uri,
            "capabilities": {},
            "initializationOptions": initialization_options
        }
    })
}

/// Build the initialized notification that completes the handshake.
pub(crate) fn build_initialized_notification() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "initialized",
        "params": {}
    })
}

/// Build a shutdown request.
pub(crate) fn build_shutdown_request(request_id: RequestId) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": request_id.as_i64(),
        "method": "shutdown",
        "params": null
    })
}

/// Build the exit notification sent after the shutdown response.
pub(crate) fn build_exit_notification() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "exit",
        "params": null
    })
}

/// Validate a JSON-RPC initialize response.
///
/// Lenient on shape to maximize compatibility: a non-null error member wins
/// over any result, and a missing or null result is rejected.
pub(crate) fn validate_initialize_response(
    response: &serde_json::Value,
) -> crate::error::RelayResult<()> {
    use crate::error::RelayError;

    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(RelayError::protocol(format!(
            "downstream initialize failed (code {}): {}",
            code, message
        )));
    }

    if response.get("result").filter(|r| !r.is_null()).is_none() {
        return Err(RelayError::protocol(
            "downstream initialize response missing valid result",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn initialize_request_has_correct_structure() {
        let request = build_initialize_request(RequestId::new(1), None, None);

        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["id"], 1);
        assert_eq!(request["method"], "initialize");
        assert!(request["params"]["processId"].as_u64().is_some());
        assert_eq!(request["params"]["clientInfo"]["name"], "mixin-ls");
        assert!(request["params"]["rootUri"].is_null());
        assert!(request["params"]["capabilities"].is_object());
        assert!(request["params"]["initializationOptions"].is_null());
    }

    #[test]
    fn initialize_request_forwards_root_uri() {
        let request =
            build_initialize_request(RequestId::new(3), Some("file:///home/user/project"), None);

        assert_eq!(request["params"]["rootUri"], "file:///home/user/project");
    }

    #[test]
    fn initialize_request_includes_initialization_options() {
        let options = serde_json::json!({
            "bundles": ["/path/to/mixin-plugin.jar"]
        });
        let request = build_initialize_request(RequestId::new(42), None, Some(options.clone()));

        assert_eq!(request["id"], 42);
        assert_eq!(request["params"]["initializationOptions"], options);
    }

    #[test]
    fn initialized_notification_has_no_id() {
        let notification = build_initialized_notification();

        assert_eq!(notification["jsonrpc"], "2.0");
        assert_eq!(notification["method"], "initialized");
        assert!(notification.get("id").is_none());
    }

    #[test]
    fn shutdown_request_has_correct_structure() {
        let request = build_shutdown_request(RequestId::new(99));

        assert_eq!(request["id"], 99);
        assert_eq!(request["method"], "shutdown");
        assert!(request["params"].is_null());
    }

    #[test]
    fn exit_notification_has_correct_structure() {
        let notification = build_exit_notification();

        assert_eq!(notification["method"], "exit");
        assert!(notification.get("id").is_none());
    }

    #[rstest]
    #[case::result_without_error(serde_json::json!({"result": {"capabilities": {}}}))]
    #[case::result_with_null_error(serde_json::json!({"result": {"capabilities": {}}, "error": null}))]
    #[case::complex_result(serde_json::json!({
        "result": {
            "capabilities": { "executeCommandProvider": { "commands": ["spongepowered.mixin.completion"] } },
            "serverInfo": { "name": "Eclipse JDT Language Server" }
        }
    }))]
    fn validate_accepts_valid_response(#[case] response: serde_json::Value) {
        assert!(validate_initialize_response(&response).is_ok());
    }

    #[rstest]
    #[case::null_result(serde_json::json!({"result": null}))]
    #[case::missing_result(serde_json::json!({}))]
    #[case::null_result_and_error(serde_json::json!({"result": null, "error": null}))]
    fn validate_rejects_missing_result(#[case] response: serde_json::Value) {
        let result = validate_initialize_response(&response);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("missing valid result")
        );
    }

    #[rstest]
    #[case::error_response(
        serde_json::json!({"error": {"code": -32600, "message": "Invalid Request"}}),
        "code -32600",
        "Invalid Request"
    )]
    #[case::error_wins_over_result(
        serde_json::json!({"result": {"capabilities": {}}, "error": {"code": -32603, "message": "Internal error"}}),
        "code -32603",
        "Internal error"
    )]
    #[case::error_missing_fields(
        serde_json::json!({"error": {}}),
        "code -1",
        "unknown error"
    )]
    fn validate_rejects_error_response(
        #[case] response: serde_json::Value,
        #[case] expected_code: &str,
        #[case] expected_message: &str,
    ) {
        let result = validate_initialize_response(&response);
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains(expected_code), "message: {}", message);
        assert!(message.contains(expected_message), "message: {}", message);
    }
}
