//! Serve command implementation

use crate::commands::{CliCommand, CommandContext};
use clap::Args;
use papersearch_core::{Components, PaperSearchError, Result};
use papersearch_serve::PaperSearchServer;

/// Start the PaperSearch HTTP server
#[derive(Debug, Clone, Args)]
pub struct ServeCommand {
    /// Host address to bind to (overrides `server.host`)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to bind to (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Disable CORS headers
    #[arg(long)]
    pub no_cors: bool,

    /// Maximum request body size in bytes
    #[arg(long)]
    pub max_body_size: Option<usize>,

    #[arg(skip)]
    pub context: CommandContext,
}

impl ServeCommand {
    pub fn with_context(mut self, context: CommandContext) -> Self {
        self.context = context;
        self
    }

    /// Configuration with command-line overrides applied
    fn effective_config(&self) -> papersearch_core::AppConfig {
        let mut config = self.context.config.clone();
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_cors {
            config.server.cors_enabled = false;
        }
        if let Some(size) = self.max_body_size {
            config.server.max_request_size = size;
        }
        config
    }
}

impl CliCommand for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let config = self.effective_config();
        tracing::info!("Ollama URL: {}", config.ollama.url);
        tracing::info!("Corpus: {}", config.corpus.database_url);

        let components = Components::from_config(&config)?;
        let server = PaperSearchServer::from_components(&components).await?;

        tracing::info!("PaperSearch listening on http://{}", config.bind_address());
        server.start().await
    }

    fn name(&self) -> &'static str {
        "serve"
    }

    fn validate(&self) -> Result<()> {
        let config = self.effective_config();

        if config.server.port == 0 {
            return Err(PaperSearchError::validation("Port cannot be 0"));
        }

        if config.server.max_request_size == 0 {
            return Err(PaperSearchError::validation("Max body size cannot be 0"));
        }

        config.validate()
    }
}
