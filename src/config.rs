//! Configuration for mixin-ls.
//!
//! Settings come from up to three layers, applied in order on top of the
//! built-in defaults: a `mixin-ls.toml` in the workspace root (or a file
//! named with `--config`), the LSP `initializationOptions`, and command-line
//! overrides. Later layers win per field.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Workspace command the downstream server resolves completions with.
pub const DEFAULT_COMPLETION_COMMAND: &str = "spongepowered.mixin.completion";

/// Launcher for the downstream Java language server.
pub const DEFAULT_SERVER_COMMAND: &str = "jdtls";

/// File name looked up in the workspace root during `initialize`.
pub const CONFIG_FILE_NAME: &str = "mixin-ls.toml";

/// How to launch and initialize the downstream server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Command used to spawn the downstream server process.
    pub command: String,
    /// Arguments passed to the command.
    pub args: Vec<String>,
    /// Forwarded verbatim as the downstream `initializationOptions`.
    pub initialization_options: Option<serde_json::Value>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_SERVER_COMMAND.to_string(),
            args: Vec::new(),
            initialization_options: None,
        }
    }
}

/// Which workspace command completion requests are relayed to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub command: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMPLETION_COMMAND.to_string(),
        }
    }
}

/// Resolved settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MixinLsSettings {
    pub server: ServerSettings,
    pub completion: CompletionSettings,
}

impl MixinLsSettings {
    /// Apply a partial overlay on top of this snapshot, field by field.
    pub fn apply(&mut self, overlay: SettingsOverlay) {
        if let Some(server) = overlay.server {
            if let Some(command) = server.command {
                self.server.command = command;
            }
            if let Some(args) = server.args {
                self.server.args = args;
            }
            if let Some(options) = server.initialization_options {
                self.server.initialization_options = Some(options);
            }
        }
        if let Some(completion) = overlay.completion {
            if let Some(command) = completion.command {
                self.completion.command = command;
            }
        }
    }
}

/// Partial settings as they appear in a config file or initialization
/// options. Every field is optional so layers only override what they name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsOverlay {
    pub server: Option<ServerOverlay>,
    pub completion: Option<CompletionOverlay>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerOverlay {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub initialization_options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompletionOverlay {
    pub command: Option<String>,
}

/// Read and parse a `mixin-ls.toml` file.
pub fn load_overlay_from_toml(path: &Path) -> RelayResult<SettingsOverlay> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RelayError::config(format!("failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| RelayError::config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Parse LSP `initializationOptions` into a settings overlay.
pub fn overlay_from_init_options(options: serde_json::Value) -> RelayResult<SettingsOverlay> {
    serde_json::from_value(options)
        .map_err(|e| RelayError::config(format!("failed to parse initialization options: {}", e)))
}
