//! Generate command: draft a paper section grounded on related papers

use crate::commands::{CliCommand, CommandContext};
use crate::output::OutputFormatter;
use clap::Args;
use papersearch_core::{Components, PaperSearchError, PaperSection, Result, SearchRequest};
use tracing::info;

/// Draft a paper section on a topic
///
/// Related papers are retrieved by semantic search and passed to the
/// generation model as numbered references.
///
/// # Examples
///
/// ```bash
/// papersearch generate "contrastive learning" --section related-work
/// papersearch generate "graph transformers" -s intro --related 8
/// ```
#[derive(Args, Debug, Clone)]
pub struct GenerateCommand {
    /// Topic of the paper
    #[arg(value_name = "TOPIC")]
    pub topic: String,

    /// Section to draft: abstract, introduction, related_work, methodology, conclusion
    #[arg(short, long, default_value = "introduction")]
    pub section: String,

    /// Number of related papers to ground the draft on
    #[arg(short, long)]
    pub related: Option<usize>,

    #[arg(skip)]
    pub context: CommandContext,
}

impl GenerateCommand {
    pub fn with_context(mut self, context: CommandContext) -> Self {
        self.context = context;
        self
    }

    fn related_count(&self) -> usize {
        self.related
            .unwrap_or(self.context.config.generation.related_count)
    }
}

impl CliCommand for GenerateCommand {
    async fn execute(&self) -> Result<()> {
        let section: PaperSection = self.section.parse()?;
        let components = Components::from_config(&self.context.config)?;

        let generator = components.generator.clone().ok_or_else(|| {
            PaperSearchError::generation("Text generation is disabled in the configuration")
        })?;

        let related = match self.related_count() {
            0 => Vec::new(),
            count => {
                let (service, _) = components.search_service().await?;
                service
                    .search(&SearchRequest::new(self.topic.clone()).with_top_k(count))
                    .await?
                    .results
            }
        };
        info!("Grounding {} on {} related papers", section, related.len());

        let generated = generator
            .generate_section(&self.topic, section, &related)
            .await?;

        OutputFormatter::new(self.context.output).section(&generated)
    }

    fn name(&self) -> &'static str {
        "generate"
    }

    fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(PaperSearchError::invalid_request("Topic is required"));
        }
        self.section.parse::<PaperSection>()?;
        Ok(())
    }
}
