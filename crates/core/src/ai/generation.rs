//! Paper section drafting on top of a text generation model
//!
//! Generation is strictly optional. Nothing on the retrieval path depends on
//! this module, and every failure surfaces as [`PaperSearchError::Generation`].

use crate::ai::client::{GenerateOptions, GenerateRequest, OllamaClient};
use crate::error::{PaperSearchError, Result};
use crate::search::SearchHit;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Longest abstract excerpt placed into a prompt, in characters
const MAX_ABSTRACT_CHARS: usize = 600;

const SECTION_TEMPLATE_NAME: &str = "section";

const SECTION_TEMPLATE: &str = r#"You are drafting the {{section_title}} section of a research paper on "{{topic}}".
{{instructions}}
{{#if references}}
Ground the section in the following related work and cite it by number in square brackets:
{{#each references}}
[{{this.number}}] {{this.title}}{{#if this.year}} ({{this.year}}){{/if}}: {{this.excerpt}}
{{/each}}
{{else}}
No related papers were retrieved. Do not invent citations.
{{/if}}
Write only the body of the section in academic prose, without a heading."#;

/// Sections the generator knows how to draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSection {
    Abstract,
    Introduction,
    RelatedWork,
    Methodology,
    Conclusion,
}

impl PaperSection {
    /// All supported sections in paper order
    pub fn all() -> &'static [PaperSection] {
        &[
            Self::Abstract,
            Self::Introduction,
            Self::RelatedWork,
            Self::Methodology,
            Self::Conclusion,
        ]
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Abstract => "Abstract",
            Self::Introduction => "Introduction",
            Self::RelatedWork => "Related Work",
            Self::Methodology => "Methodology",
            Self::Conclusion => "Conclusion",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Self::Abstract => {
                "Summarize the problem, the approach and the main findings in at most 250 words."
            }
            Self::Introduction => {
                "Motivate the problem, state the research question and outline the contributions."
            }
            Self::RelatedWork => {
                "Compare and contrast the prior work below, grouping papers by approach."
            }
            Self::Methodology => {
                "Describe a plausible methodology, including data, models and evaluation."
            }
            Self::Conclusion => {
                "Restate the contributions, discuss limitations and suggest future work."
            }
        }
    }
}

impl fmt::Display for PaperSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::RelatedWork => "related_work",
            Self::Methodology => "methodology",
            Self::Conclusion => "conclusion",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PaperSection {
    type Err = PaperSearchError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();

        match normalized.as_str() {
            "abstract" => Ok(Self::Abstract),
            "introduction" | "intro" => Ok(Self::Introduction),
            "relatedwork" => Ok(Self::RelatedWork),
            "methodology" | "methods" => Ok(Self::Methodology),
            "conclusion" | "conclusions" => Ok(Self::Conclusion),
            _ => Err(PaperSearchError::invalid_request(format!(
                "Unknown section '{}'; expected one of abstract, introduction, related_work, methodology, conclusion",
                s
            ))),
        }
    }
}

/// Sampling parameters passed to the text generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: i32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl From<&GenerationParams> for GenerateOptions {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: Some(params.temperature),
            num_predict: Some(params.max_tokens),
            top_p: None,
        }
    }
}

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Identifier of the underlying model
    fn model_name(&self) -> &str;
}

/// [`TextGenerator`] backed by Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaTextGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaTextGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaTextGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(params.into()),
        };

        self.client.generate(request).await.map_err(|e| match e {
            PaperSearchError::Generation { .. } => e,
            other => PaperSearchError::generation(other.to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// A drafted section with the papers it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub section: PaperSection,
    pub topic: String,
    pub content: String,
    pub references: Vec<SearchHit>,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// Drafts paper sections from a topic and related search hits
pub struct SectionGenerator {
    generator: Arc<dyn TextGenerator>,
    templates: Handlebars<'static>,
    params: GenerationParams,
}

impl SectionGenerator {
    /// Create a section generator with default sampling parameters
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.register_escape_fn(handlebars::no_escape);
        templates
            .register_template_string(SECTION_TEMPLATE_NAME, SECTION_TEMPLATE)
            .map_err(|e| {
                PaperSearchError::validation(format!("Invalid section prompt template: {}", e))
            })?;

        Ok(Self {
            generator,
            templates,
            params: GenerationParams::default(),
        })
    }

    /// Override sampling parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Model used for generation
    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Render the prompt for one section
    pub fn build_prompt(
        &self,
        topic: &str,
        section: PaperSection,
        related: &[SearchHit],
    ) -> Result<String> {
        let references: Vec<_> = related
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                json!({
                    "number": i + 1,
                    "title": hit.title,
                    "year": hit.year,
                    "excerpt": excerpt(&hit.abstract_text, MAX_ABSTRACT_CHARS),
                })
            })
            .collect();

        let data = json!({
            "topic": topic,
            "section_title": section.title(),
            "instructions": section.instructions(),
            "references": references,
        });

        self.templates
            .render(SECTION_TEMPLATE_NAME, &data)
            .map_err(|e| PaperSearchError::generation(format!("Failed to render prompt: {}", e)))
    }

    /// Draft `section` for `topic`, citing `related`
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank topic; `Generation` when the model call
    /// fails or returns nothing.
    pub async fn generate_section(
        &self,
        topic: &str,
        section: PaperSection,
        related: &[SearchHit],
    ) -> Result<GeneratedSection> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PaperSearchError::invalid_request("Topic is required"));
        }

        let prompt = self.build_prompt(topic, section, related)?;
        debug!(
            "Generating {} for '{}' with {} references ({} prompt chars)",
            section,
            topic,
            related.len(),
            prompt.len()
        );

        let content = self
            .generator
            .generate(&prompt, &self.params)
            .await
            .map_err(|e| match e {
                PaperSearchError::Generation { .. } => e,
                other => PaperSearchError::generation(format!(
                    "Failed to generate {} section: {}",
                    section.title(),
                    other
                )),
            })?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(PaperSearchError::generation(format!(
                "Model returned an empty {} section",
                section.title()
            )));
        }

        info!("Generated {} section ({} chars)", section, content.len());

        Ok(GeneratedSection {
            section,
            topic: topic.to_string(),
            content,
            references: related.to_vec(),
            model: self.generator.model_name().to_string(),
            generated_at: Utc::now(),
        })
    }
}

impl fmt::Debug for SectionGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionGenerator")
            .field("model", &self.generator.model_name())
            .field("params", &self.params)
            .finish()
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        reply: String,
    }

    impl RecordingGenerator {
        fn new(reply: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Err(PaperSearchError::network("connection refused"))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn hit(id: &str, title: &str, year: Option<i32>) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: format!("Abstract of {}", title),
            year,
            url: String::new(),
            similarity: 0.9,
        }
    }

    #[test]
    fn test_section_parsing() {
        assert_eq!(
            "related_work".parse::<PaperSection>().unwrap(),
            PaperSection::RelatedWork
        );
        assert_eq!(
            "Related Work".parse::<PaperSection>().unwrap(),
            PaperSection::RelatedWork
        );
        assert_eq!(
            "INTRO".parse::<PaperSection>().unwrap(),
            PaperSection::Introduction
        );
        assert!(matches!(
            "appendix".parse::<PaperSection>(),
            Err(PaperSearchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_section_serde_names() {
        let json = serde_json::to_string(&PaperSection::RelatedWork).unwrap();
        assert_eq!(json, "\"related_work\"");
        for section in PaperSection::all() {
            assert_eq!(
                section.to_string().parse::<PaperSection>().unwrap(),
                *section
            );
        }
    }

    #[test]
    fn test_prompt_lists_references() {
        let generator = SectionGenerator::new(Arc::new(RecordingGenerator::new("ok"))).unwrap();
        let related = vec![
            hit("p1", "Attention Is All You Need", Some(2017)),
            hit("p2", "Graph Networks", None),
        ];

        let prompt = generator
            .build_prompt("transformers", PaperSection::RelatedWork, &related)
            .unwrap();

        assert!(prompt.contains("Related Work section"));
        assert!(prompt.contains("\"transformers\""));
        assert!(prompt.contains("[1] Attention Is All You Need (2017)"));
        assert!(prompt.contains("[2] Graph Networks: Abstract of Graph Networks"));
        assert!(!prompt.contains("Do not invent citations"));
    }

    #[test]
    fn test_prompt_without_references() {
        let generator = SectionGenerator::new(Arc::new(RecordingGenerator::new("ok"))).unwrap();
        let prompt = generator
            .build_prompt("quantum & co", PaperSection::Abstract, &[])
            .unwrap();
        assert!(prompt.contains("Do not invent citations"));
        assert!(prompt.contains("quantum & co"));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 2), "éé...");
    }

    #[tokio::test]
    async fn test_generate_section() {
        let recorder = Arc::new(RecordingGenerator::new("  Drafted text.  "));
        let generator = SectionGenerator::new(recorder.clone()).unwrap();
        let related = vec![hit("p1", "Paper One", Some(2020))];

        let section = generator
            .generate_section("  vector search ", PaperSection::Introduction, &related)
            .await
            .unwrap();

        assert_eq!(section.content, "Drafted text.");
        assert_eq!(section.topic, "vector search");
        assert_eq!(section.references.len(), 1);
        assert_eq!(section.model, "recording");
        assert_eq!(recorder.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected_without_call() {
        let recorder = Arc::new(RecordingGenerator::new("text"));
        let generator = SectionGenerator::new(recorder.clone()).unwrap();

        let result = generator
            .generate_section("   ", PaperSection::Abstract, &[])
            .await;

        assert!(matches!(result, Err(PaperSearchError::InvalidRequest { .. })));
        assert!(recorder.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_maps_to_generation_error() {
        let generator = SectionGenerator::new(Arc::new(FailingGenerator)).unwrap();
        let result = generator
            .generate_section("topic", PaperSection::Conclusion, &[])
            .await;

        match result {
            Err(PaperSearchError::Generation { message }) => {
                assert!(message.contains("Conclusion"));
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected generation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_model_output_is_generation_error() {
        let generator = SectionGenerator::new(Arc::new(RecordingGenerator::new("   "))).unwrap();
        let result = generator
            .generate_section("topic", PaperSection::Methodology, &[])
            .await;
        assert!(matches!(result, Err(PaperSearchError::Generation { .. })));
    }

    #[tokio::test]
    async fn test_ollama_text_generator() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama3",
                "stream": false,
                "options": {"num_predict": 256}
            })))
            .with_status(200)
            .with_body(r#"{"response":"A section.","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url()).unwrap();
        let generator = OllamaTextGenerator::new(client, "llama3");
        let params = GenerationParams {
            temperature: 0.2,
            max_tokens: 256,
        };

        let text = generator.generate("prompt", &params).await.unwrap();
        assert_eq!(text, "A section.");
        assert_eq!(generator.model_name(), "llama3");
    }
}
