//! Corpus embedding cache management

use crate::commands::{CliCommand, CommandContext};
use crate::output::OutputFormatter;
use clap::{Args, Subcommand};
use papersearch_core::{CacheSource, Components, Result};
use tracing::info;

/// Build, inspect or discard the persisted corpus embedding cache
#[derive(Debug, Clone, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,

    #[arg(skip)]
    pub context: CommandContext,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CacheAction {
    /// Embed the corpus and write the cache file; fails if the file cannot be written
    Build {
        /// Discard any existing cache before building
        #[arg(short, long)]
        force: bool,
    },

    /// Delete the cache file so the next load recomputes it
    Invalidate,

    /// Show the cache header and whether the corpus has changed since
    Status,
}

impl CacheCommand {
    pub fn with_context(mut self, context: CommandContext) -> Self {
        self.context = context;
        self
    }

    async fn build(&self, components: &Components, force: bool) -> Result<()> {
        if force {
            components.cache.invalidate().await?;
        }

        let outcome = components.cache.load().await?;
        let mut formatter = OutputFormatter::new(self.context.output);

        if let Some(error) = outcome.persist_warning {
            formatter.warning(&format!(
                "Embeddings computed but not saved to {}",
                components.cache.path().display()
            ))?;
            return Err(error);
        }

        let verb = match outcome.source {
            CacheSource::Computed => "Built",
            CacheSource::Persisted | CacheSource::Memory => "Loaded existing",
        };
        formatter.success(&format!(
            "{} cache with {} papers at {}",
            verb,
            outcome.table.len(),
            components.cache.path().display()
        ))
    }

    async fn invalidate(&self, components: &Components) -> Result<()> {
        components.cache.invalidate().await?;
        OutputFormatter::new(self.context.output).success(&format!(
            "Removed {}",
            components.cache.path().display()
        ))
    }

    async fn status(&self, components: &Components) -> Result<()> {
        let info = components.cache.inspect().await?;
        let stale = components.cache.is_stale().await?;
        OutputFormatter::new(self.context.output).cache_info(info.as_ref(), stale)
    }
}

impl CliCommand for CacheCommand {
    async fn execute(&self) -> Result<()> {
        let components = Components::from_config(&self.context.config)?;
        info!(
            "Cache file: {} (model {})",
            components.cache.path().display(),
            components.cache.model_name()
        );

        match self.action {
            CacheAction::Build { force } => self.build(&components, force).await,
            CacheAction::Invalidate => self.invalidate(&components).await,
            CacheAction::Status => self.status(&components).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.action {
            CacheAction::Build { .. } => "cache build",
            CacheAction::Invalidate => "cache invalidate",
            CacheAction::Status => "cache status",
        }
    }

    fn validate(&self) -> Result<()> {
        self.context.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        let cmd = CacheCommand {
            action: CacheAction::Build { force: false },
            context: CommandContext::default(),
        };
        assert_eq!(cmd.name(), "cache build");

        let cmd = CacheCommand {
            action: CacheAction::Status,
            context: CommandContext::default(),
        };
        assert_eq!(cmd.name(), "cache status");
    }

    #[tokio::test]
    async fn test_invalidate_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = CommandContext::default();
        context.config.cache.path = dir.path().join("missing.json");

        let cmd = CacheCommand {
            action: CacheAction::Invalidate,
            context,
        };
        assert!(cmd.execute().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut context = CommandContext::default();
        context.config.cache.batch_size = 0;

        let cmd = CacheCommand {
            action: CacheAction::Status,
            context,
        };
        assert!(cmd.validate().is_err());
    }
}
