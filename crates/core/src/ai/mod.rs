//! Ollama integration and LLM-backed paper section drafting

pub mod client;
pub mod generation;

pub use client::{
    EmbedBatchRequest, EmbedRequest, GenerateOptions, GenerateRequest, ModelInfo, OllamaClient,
};
pub use generation::{
    GeneratedSection, GenerationParams, OllamaTextGenerator, PaperSection, SectionGenerator,
    TextGenerator,
};
