pub(crate) mod bridge;
mod lsp_impl;
pub mod relay;

pub use lsp_impl::MixinLs;
