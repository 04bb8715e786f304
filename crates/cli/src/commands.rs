//! CLI commands module

use crate::output::OutputFormat;
use papersearch_core::{AppConfig, Result};

pub mod cache;
pub mod generate;
pub mod search;
pub mod serve;

pub use cache::*;
pub use generate::*;
pub use search::*;
pub use serve::*;

/// Settings resolved by the binary before a command runs
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub config: AppConfig,
    pub output: OutputFormat,
}

impl CommandContext {
    pub fn new(config: AppConfig, output: OutputFormat) -> Self {
        Self { config, output }
    }
}

/// Base trait for CLI commands
#[allow(async_fn_in_trait)]
pub trait CliCommand {
    /// Execute the command
    async fn execute(&self) -> Result<()>;

    /// Get command name for logging
    fn name(&self) -> &'static str;

    /// Validate command arguments
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Common command execution wrapper
pub async fn execute_command<T: CliCommand>(command: T) -> Result<()> {
    tracing::info!("Executing command: {}", command.name());

    command.validate()?;
    command.execute().await?;

    tracing::info!("Command {} completed successfully", command.name());
    Ok(())
}
