pub mod api;
pub mod app;
pub mod config;
pub mod models;

pub use app::state::{LoadState, RenderRow};
pub use app::tree::CommentTree;
pub use app::ThreadViewer;
pub use config::RenderConfig;

/// Installs the `env_logger` backend for the `log` facade. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(false).try_init();
}
