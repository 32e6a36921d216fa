//! Bridge to the downstream Java language server.
//!
//! Owns everything between the relay's backend port and the spawned jdtls
//! process: process lifecycle, base-protocol framing, response routing, and
//! the `workspace/executeCommand` dispatch itself.

pub(crate) mod backend;
pub(crate) mod connection;
pub(crate) mod protocol;
pub(crate) mod router;

pub(crate) use backend::WorkspaceCommandBackend;
