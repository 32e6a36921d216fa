pub mod config;
pub mod error;
pub mod lsp;

// Re-export config types for embedders and the CLI
pub use config::{MixinLsSettings, SettingsOverlay};
pub use error::{RelayError, RelayResult};

// Re-export the main server implementation
pub use lsp::MixinLs;
