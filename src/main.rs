//! PaperSearch - semantic search over research-paper abstracts
//!
//! Embeds a corpus of paper abstracts with an Ollama model, caches the
//! embeddings on disk, and ranks papers against free-text queries. Can also
//! draft paper sections grounded on the retrieved papers.

use clap::{Parser, Subcommand};
use papersearch_cli::{
    execute_command, exit_code_for_error, CacheCommand, CommandContext, GenerateCommand,
    OutputFormat, SearchCommand, ServeCommand,
};
use papersearch_core::{AppConfig, Result};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "papersearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Semantic search over research-paper abstracts")]
#[command(long_about = r#"
PaperSearch embeds paper titles and abstracts with an Ollama embedding model
and ranks them by cosine similarity against your query.

The corpus embeddings are computed once and cached on disk; use
`papersearch cache status` to check whether the cache still matches the
corpus. Configuration comes from an optional YAML/JSON file and
PAPERSEARCH_* environment variables (e.g. PAPERSEARCH_SEARCH__MAX_TOP_K=50).
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, yaml, pretty)
    #[arg(short, long, default_value = "pretty", global = true)]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search papers by semantic similarity
    Search(SearchCommand),

    /// Start the HTTP server
    Serve(ServeCommand),

    /// Manage the corpus embedding cache
    Cache(CacheCommand),

    /// Draft a paper section grounded on related papers
    Generate(GenerateCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(category = %e.category(), "{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(exit_code_for_error(&e));
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let output: OutputFormat = cli.output.parse()?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    papersearch_core::init_logging_with_config(log_level, &config.logging.format)?;

    info!("Starting PaperSearch v{}", env!("CARGO_PKG_VERSION"));

    let context = CommandContext::new(config, output);
    match cli.command {
        Commands::Search(args) => execute_command(args.with_context(context)).await,
        Commands::Serve(args) => execute_command(args.with_context(context)).await,
        Commands::Cache(args) => execute_command(args.with_context(context)).await,
        Commands::Generate(args) => execute_command(args.with_context(context)).await,
        Commands::Version => {
            println!("{}", papersearch_core::version_info());
            println!("serve v{}", papersearch_serve::VERSION);
            println!("cli v{}", papersearch_cli::VERSION);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_filters() {
        let cli = Cli::try_parse_from([
            "papersearch",
            "--output",
            "json",
            "search",
            "graph neural networks",
            "--top-k",
            "3",
            "--year-min",
            "2019",
        ])
        .unwrap();

        assert_eq!(cli.output, "json");
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "graph neural networks");
                assert_eq!(args.top_k, Some(3));
                assert_eq!(args.year_min, Some(2019));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_cache_subcommands() {
        let cli = Cli::try_parse_from(["papersearch", "cache", "build", "--force"]).unwrap();
        match cli.command {
            Commands::Cache(args) => assert!(matches!(
                args.action,
                papersearch_cli::CacheAction::Build { force: true }
            )),
            _ => panic!("expected cache"),
        }

        assert!(Cli::try_parse_from(["papersearch", "cache", "status"]).is_ok());
        assert!(Cli::try_parse_from(["papersearch", "cache", "invalidate"]).is_ok());
        assert!(Cli::try_parse_from(["papersearch", "cache", "rebuild"]).is_err());
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "papersearch",
            "generate",
            "contrastive learning",
            "--section",
            "related-work",
            "--related",
            "8",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.section, "related-work");
                assert_eq!(args.related, Some(8));
            }
            _ => panic!("expected generate"),
        }
    }
}
