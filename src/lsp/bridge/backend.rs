//! Production [`CompletionBackend`]: workspace-command dispatch over a
//! lazily created downstream connection.

use std::future::Future;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use log::{info, warn};
use tokio::sync::Mutex;
use tower_lsp_server::ls_types::CompletionItem;

use super::connection::BridgeConnection;
use super::protocol::parse_completion_items;
use crate::config::MixinLsSettings;
use crate::error::RelayResult;
use crate::lsp::relay::CompletionBackend;

/// Adapter that satisfies the relay's backend port by invoking the
/// configured workspace command on a downstream Java language server.
///
/// The connection is spawned and initialized on the first lookup and reused
/// afterwards. A dead connection is replaced on the next lookup; the failed
/// request itself surfaces as an error, which the relay maps to an empty
/// list.
pub struct WorkspaceCommandBackend {
    settings: Arc<ArcSwap<MixinLsSettings>>,
    /// Workspace root observed in our own initialize, forwarded downstream.
    root_uri: ArcSwapOption<String>,
    connection: Mutex<Option<Arc<BridgeConnection>>>,
}

impl WorkspaceCommandBackend {
    pub(crate) fn new(settings: Arc<ArcSwap<MixinLsSettings>>) -> Self {
        Self {
            settings,
            root_uri: ArcSwapOption::empty(),
            connection: Mutex::new(None),
        }
    }

    pub(crate) fn set_root_uri(&self, root_uri: Option<String>) {
        self.root_uri.store(root_uri.map(Arc::new));
    }

    /// Get the live connection, spawning and initializing one if needed.
    ///
    /// The lock is held across the handshake so overlapping first requests
    /// share a single downstream process instead of racing to spawn.
    async fn connection(&self) -> RelayResult<Arc<BridgeConnection>> {
        let mut guard = self.connection.lock().await;

        if let Some(conn) = guard.as_ref() {
            if !conn.is_closed() {
                return Ok(Arc::clone(conn));
            }
            warn!(
                target: "mixin_ls::bridge",
                "downstream server connection lost, respawning"
            );
            *guard = None;
        }

        let settings = self.settings.load_full();
        let conn =
            BridgeConnection::spawn(&settings.server.command, &settings.server.args).await?;

        let root_uri = self.root_uri.load_full();
        conn.initialize(
            root_uri.as_deref().map(String::as_str),
            settings.server.initialization_options.clone(),
        )
        .await?;

        info!(
            target: "mixin_ls::bridge",
            "downstream server `{}` initialized",
            settings.server.command
        );

        *guard = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// Tear the downstream connection down, if one was ever created.
    pub(crate) async fn shutdown(&self) {
        let conn = self.connection.lock().await.take();
        if let Some(conn) = conn {
            conn.shutdown().await;
        }
    }
}

impl CompletionBackend for WorkspaceCommandBackend {
    fn fetch(
        &self,
        locator: &str,
        line: u32,
        character: u32,
    ) -> impl Future<Output = RelayResult<Vec<CompletionItem>>> + Send {
        async move {
            let conn = self.connection().await?;
            let command = self.settings.load().completion.command.clone();
            let response = conn.execute_command(&command, locator, line, character).await?;
            parse_completion_items(response)
        }
    }
}
