//! LSP server implementation for mixin-ls.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;
use tower_lsp_server::{Client, LanguageServer};
use url::Url;

use crate::config::{self, MixinLsSettings, SettingsOverlay};
use crate::lsp::bridge::WorkspaceCommandBackend;
use crate::lsp::relay::CompletionRelay;

/// The mixin-ls language server.
///
/// Holds the completion relay and the settings snapshot it runs against.
/// Document content is never tracked: the downstream server resolves
/// documents from the workspace itself, so this server only needs the URI
/// and position each completion request carries.
pub struct MixinLs {
    client: Client,
    settings: Arc<ArcSwap<MixinLsSettings>>,
    relay: CompletionRelay<WorkspaceCommandBackend>,
    /// Overlay read from a `--config` file; replaces the workspace lookup
    file_overlay: Option<SettingsOverlay>,
    /// Overlay from command-line flags; applied last
    cli_overlay: SettingsOverlay,
}

impl std::fmt::Debug for MixinLs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixinLs")
            .field("settings", &self.settings.load())
            .finish_non_exhaustive()
    }
}

impl MixinLs {
    pub fn new(client: Client) -> Self {
        Self::with_overrides(client, None, SettingsOverlay::default())
    }

    /// Create a server with pre-parsed configuration overlays from the CLI.
    pub fn with_overrides(
        client: Client,
        file_overlay: Option<SettingsOverlay>,
        cli_overlay: SettingsOverlay,
    ) -> Self {
        let settings = Arc::new(ArcSwap::from_pointee(MixinLsSettings::default()));
        let backend = WorkspaceCommandBackend::new(Arc::clone(&settings));
        Self {
            client,
            settings,
            relay: CompletionRelay::new(backend),
            file_overlay,
            cli_overlay,
        }
    }

    /// Workspace root from workspace folders, the deprecated rootUri, or
    /// nothing.
    fn workspace_root(params: &InitializeParams) -> Option<Uri> {
        if let Some(folders) = &params.workspace_folders
            && let Some(folder) = folders.first()
        {
            return Some(folder.uri.clone());
        }
        #[allow(deprecated)] // Support for older LSP clients
        let root_uri = params.root_uri.clone();
        root_uri
    }

    /// Compose the settings snapshot from defaults, the config file, the
    /// initialization options, and CLI overrides, in that order.
    async fn load_settings(&self, params: &InitializeParams, root_path: Option<&PathBuf>) {
        let mut settings = MixinLsSettings::default();

        if let Some(overlay) = self.file_overlay.clone() {
            settings.apply(overlay);
        } else if let Some(root) = root_path {
            let config_path = root.join(config::CONFIG_FILE_NAME);
            if config_path.exists() {
                match config::load_overlay_from_toml(&config_path) {
                    Ok(overlay) => {
                        self.client
                            .log_message(
                                MessageType::INFO,
                                format!("Loaded {}", config_path.display()),
                            )
                            .await;
                        settings.apply(overlay);
                    }
                    Err(e) => {
                        self.client
                            .log_message(MessageType::WARNING, e.to_string())
                            .await;
                    }
                }
            }
        }

        if let Some(options) = params.initialization_options.clone() {
            match config::overlay_from_init_options(options) {
                Ok(overlay) => settings.apply(overlay),
                Err(e) => {
                    self.client
                        .log_message(MessageType::WARNING, e.to_string())
                        .await;
                }
            }
        }

        settings.apply(self.cli_overlay.clone());
        self.settings.store(Arc::new(settings));
    }
}

impl LanguageServer for MixinLs {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root_uri = Self::workspace_root(&params);
        let root_path = root_uri
            .as_ref()
            .and_then(|uri| Url::parse(uri.as_str()).ok())
            .and_then(|url| url.to_file_path().ok())
            .or_else(|| std::env::current_dir().ok());

        if let Some(ref path) = root_path {
            self.client
                .log_message(
                    MessageType::INFO,
                    format!("Using workspace root: {}", path.display()),
                )
                .await;
        }

        self.load_settings(&params, root_path.as_ref()).await;
        self.relay
            .backend()
            .set_root_uri(root_uri.map(|uri| uri.as_str().to_string()));

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // No trigger characters: completions are relayed only on
                // explicit completion requests
                completion_provider: Some(CompletionOptions::default()),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "mixin-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let settings = self.settings.load_full();
        self.client
            .log_message(
                MessageType::INFO,
                format!(
                    "mixin-ls ready: relaying completions to `{}` via `{}`",
                    settings.server.command, settings.completion.command
                ),
            )
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.relay.backend().shutdown().await;
        Ok(())
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let list = self.relay.provide(&uri, position).await;

        Ok(Some(CompletionResponse::List(list)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_lsp_server::LspService;

    #[tokio::test]
    async fn initialize_declares_completion_provider() {
        let (service, _socket) = LspService::new(MixinLs::new);

        let result = service
            .inner()
            .initialize(InitializeParams::default())
            .await
            .unwrap();

        assert!(result.capabilities.completion_provider.is_some());
        let info = result.server_info.unwrap();
        assert_eq!(info.name, "mixin-ls");
    }

    #[tokio::test]
    async fn initialize_applies_initialization_options() {
        let (service, _socket) = LspService::new(MixinLs::new);

        let params = InitializeParams {
            initialization_options: Some(json!({
                "server": { "command": "custom-jdtls" },
                "completion": { "command": "custom.mixin.completion" }
            })),
            ..InitializeParams::default()
        };
        service.inner().initialize(params).await.unwrap();

        let settings = service.inner().settings.load();
        assert_eq!(settings.server.command, "custom-jdtls");
        assert_eq!(settings.completion.command, "custom.mixin.completion");
    }

    #[tokio::test]
    async fn cli_overlay_wins_over_initialization_options() {
        let cli_overlay = SettingsOverlay {
            server: Some(crate::config::ServerOverlay {
                command: Some("cli-jdtls".to_string()),
                args: None,
                initialization_options: None,
            }),
            completion: None,
        };
        let (service, _socket) =
            LspService::new(move |client| MixinLs::with_overrides(client, None, cli_overlay));

        let params = InitializeParams {
            initialization_options: Some(json!({
                "server": { "command": "options-jdtls" }
            })),
            ..InitializeParams::default()
        };
        service.inner().initialize(params).await.unwrap();

        assert_eq!(service.inner().settings.load().server.command, "cli-jdtls");
    }

    #[tokio::test]
    async fn shutdown_without_downstream_connection_succeeds() {
        let (service, _socket) = LspService::new(MixinLs::new);

        assert!(service.inner().shutdown().await.is_ok());
    }
}
