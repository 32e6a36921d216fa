use std::path::PathBuf;

use clap::Parser;
use mixin_ls::config::{self, ServerOverlay, SettingsOverlay};
use mixin_ls::lsp::MixinLs;
use tokio::io::{stdin, stdout};
use tower_lsp_server::{LspService, Server};

/// A completion relay that forwards SpongePowered Mixin completion requests
/// to an Eclipse JDT language server over LSP
#[derive(Parser)]
#[command(name = "mixin-ls")]
#[command(version)]
#[command(about = "Relays Mixin completion requests to a jdtls workspace command")]
struct Cli {
    /// Command used to launch the downstream jdtls process
    #[arg(long, value_name = "COMMAND")]
    jdtls: Option<String>,

    /// Argument passed to the downstream jdtls process (repeatable)
    #[arg(long = "jdtls-arg", value_name = "ARG")]
    jdtls_args: Vec<String>,

    /// Path to a mixin-ls.toml (replaces the workspace-root lookup)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let file_overlay = cli.config.map(|path| {
        config::load_overlay_from_toml(&path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        })
    });

    let cli_overlay = SettingsOverlay {
        server: (cli.jdtls.is_some() || !cli.jdtls_args.is_empty()).then(|| ServerOverlay {
            command: cli.jdtls,
            args: (!cli.jdtls_args.is_empty()).then_some(cli.jdtls_args),
            initialization_options: None,
        }),
        completion: None,
    };

    let stdin = stdin();
    let stdout = stdout();

    let (service, socket) =
        LspService::new(move |client| MixinLs::with_overrides(client, file_overlay, cli_overlay));
    Server::new(stdin, stdout, socket).serve(service).await;
}
