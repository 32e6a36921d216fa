//! JSON-RPC message builders and parsers for the downstream connection.

pub(crate) mod lifecycle;
pub(crate) mod request;
pub(crate) mod request_id;
pub(crate) mod response;

pub(crate) use lifecycle::{
    build_exit_notification, build_initialize_request, build_initialized_notification,
    build_shutdown_request, validate_initialize_response,
};
pub(crate) use request::build_execute_command_request;
pub(crate) use request_id::RequestId;
pub(crate) use response::parse_completion_items;
