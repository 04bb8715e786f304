//! Search command for ranking papers against a free-text query

use crate::commands::{CliCommand, CommandContext};
use crate::output::OutputFormatter;
use clap::Args;
use papersearch_core::{Components, PaperSearchError, Result, SearchRequest};
use tracing::info;

/// Search paper abstracts using semantic similarity
///
/// The query is embedded with the configured model and compared against
/// every cached paper embedding. The corpus cache is built on first use.
///
/// # Examples
///
/// ```bash
/// papersearch search "graph neural networks"
/// papersearch search "protein folding" --top-k 10 --year-min 2019
/// papersearch --output json search "diffusion models"
/// ```
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Search query text
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of results to return (defaults to `search.default_top_k`)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Only include papers published in or after this year
    #[arg(long)]
    pub year_min: Option<i32>,

    /// Only include papers published in or before this year
    #[arg(long)]
    pub year_max: Option<i32>,

    #[arg(skip)]
    pub context: CommandContext,
}

impl SearchCommand {
    pub fn with_context(mut self, context: CommandContext) -> Self {
        self.context = context;
        self
    }

    fn request(&self) -> SearchRequest {
        let mut request =
            SearchRequest::new(self.query.clone()).with_years(self.year_min, self.year_max);
        if let Some(top_k) = self.top_k {
            request = request.with_top_k(top_k);
        }
        request
    }
}

impl CliCommand for SearchCommand {
    async fn execute(&self) -> Result<()> {
        info!("Query: '{}'", self.query);

        let components = Components::from_config(&self.context.config)?;
        let (service, outcome) = components.search_service().await?;
        if let Some(warning) = &outcome.persist_warning {
            tracing::warn!("Corpus cache was not saved: {}", warning);
        }

        let response = service.search(&self.request()).await?;

        let mut formatter = OutputFormatter::new(self.context.output);
        formatter.hits(&self.query, &response.results)?;

        info!("Search completed with {} results", response.count);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(PaperSearchError::invalid_request("Query is required"));
        }

        if self.top_k == Some(0) {
            return Err(PaperSearchError::invalid_request(
                "top_k must be greater than 0",
            ));
        }

        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            if min > max {
                return Err(PaperSearchError::invalid_request(format!(
                    "year_min ({}) is after year_max ({})",
                    min, max
                )));
            }
        }

        Ok(())
    }
}
