//! PaperSearch CLI Library
//!
//! Command implementations behind the `papersearch` binary.

use papersearch_core::PaperSearchError;

pub mod commands;
pub mod output;

pub use commands::*;
pub use output::*;

/// CLI version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the appropriate exit code for an error
pub fn exit_code_for_error(error: &PaperSearchError) -> i32 {
    match error {
        PaperSearchError::Validation { .. }
        | PaperSearchError::InvalidRequest { .. }
        | PaperSearchError::Config(_) => 2,
        PaperSearchError::DataUnavailable { .. } | PaperSearchError::Database(_) => 3,
        PaperSearchError::Network { .. } | PaperSearchError::Http(_) => 5,
        PaperSearchError::Provider { .. } | PaperSearchError::Generation { .. } => 6,
        PaperSearchError::DimensionMismatch { .. } | PaperSearchError::ModelMismatch { .. } => 7,
        PaperSearchError::Timeout { .. } => 8,
        _ => 1,
    }
}
