//! PaperSearch Serve Library
//!
//! HTTP interface exposing `POST /search`, `POST /generate` and `GET /health`.

pub mod handlers;
pub mod server;

pub use handlers::*;
pub use server::*;

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
