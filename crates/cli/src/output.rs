//! CLI output formatting module

use papersearch_core::search::CacheInfo;
use papersearch_core::{GeneratedSection, PaperSearchError, Result, SearchHit};
use serde::Serialize;
use std::io::{self, Write};

/// Abstracts longer than this are cut in pretty output
const EXCERPT_CHARS: usize = 240;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Pretty,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Pretty => write!(f, "pretty"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = PaperSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(PaperSearchError::validation(format!(
                "Invalid output format: {}",
                s
            ))),
        }
    }
}

/// Check whether stdout should receive ANSI colors
pub fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    atty::is(atty::Stream::Stdout)
}

/// Output formatter for CLI results
pub struct OutputFormatter {
    format: OutputFormat,
    use_colors: bool,
    writer: Box<dyn Write + Send>,
}

impl OutputFormatter {
    /// Formatter writing to stdout
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            use_colors: supports_color(),
            writer: Box::new(io::stdout()),
        }
    }

    /// Formatter with a custom writer and no colors
    pub fn with_writer<W: Write + Send + 'static>(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            use_colors: false,
            writer: Box::new(writer),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a value in a structured format
    ///
    /// Pretty output falls back to indented JSON for types without a
    /// dedicated renderer.
    pub fn output<T: Serialize>(&mut self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Json | OutputFormat::Pretty => {
                let json = serde_json::to_string_pretty(value)?;
                writeln!(self.writer, "{}", json)?;
            }
            OutputFormat::Yaml => {
                let yaml = serde_yaml::to_string(value)?;
                write!(self.writer, "{}", yaml)?;
            }
        }
        Ok(())
    }

    /// Render ranked search hits
    pub fn hits(&mut self, query: &str, hits: &[SearchHit]) -> Result<()> {
        if self.format != OutputFormat::Pretty {
            return self.output(&hits);
        }

        if hits.is_empty() {
            writeln!(self.writer, "No results found for query: '{}'", query)?;
            return Ok(());
        }

        writeln!(self.writer, "{} results for '{}'\n", hits.len(), query)?;
        for (rank, hit) in hits.iter().enumerate() {
            let year = hit
                .year
                .map(|y| format!(" ({})", y))
                .unwrap_or_default();
            let title = self.bold(&format!("{}. {}{}", rank + 1, hit.title, year));
            writeln!(self.writer, "{}", title)?;
            writeln!(
                self.writer,
                "   id: {}  similarity: {:.4}",
                hit.id, hit.similarity
            )?;
            if !hit.url.is_empty() {
                writeln!(self.writer, "   {}", hit.url)?;
            }
            writeln!(self.writer, "   {}\n", excerpt(&hit.abstract_text, EXCERPT_CHARS))?;
        }
        Ok(())
    }

    /// Render a generated section followed by its references
    pub fn section(&mut self, section: &GeneratedSection) -> Result<()> {
        if self.format != OutputFormat::Pretty {
            return self.output(section);
        }

        let heading = self.bold(&format!("{}: {}", section.section.title(), section.topic));
        writeln!(self.writer, "{}\n", heading)?;
        writeln!(self.writer, "{}\n", section.content.trim())?;

        if !section.references.is_empty() {
            writeln!(self.writer, "References")?;
            for (i, hit) in section.references.iter().enumerate() {
                let year = hit.year.map(|y| format!(", {}", y)).unwrap_or_default();
                writeln!(self.writer, "[{}] {}{}", i + 1, hit.title, year)?;
            }
        }
        Ok(())
    }

    /// Render the header of a persisted cache file
    pub fn cache_info(&mut self, info: Option<&CacheInfo>, stale: bool) -> Result<()> {
        if self.format != OutputFormat::Pretty {
            #[derive(Serialize)]
            struct Status<'a> {
                cache: Option<&'a CacheInfo>,
                stale: bool,
            }
            return self.output(&Status { cache: info, stale });
        }

        match info {
            None => self.warning("No persisted cache file"),
            Some(info) => {
                writeln!(self.writer, "path:        {}", info.path.display())?;
                writeln!(self.writer, "format:      v{}", info.format_version)?;
                writeln!(self.writer, "model:       {}", info.model)?;
                writeln!(self.writer, "dimension:   {}", info.dimension)?;
                writeln!(self.writer, "entries:     {}", info.entries)?;
                writeln!(self.writer, "created:     {}", info.created_at.to_rfc3339())?;
                writeln!(self.writer, "fingerprint: {}", info.corpus_fingerprint)?;
                if stale {
                    self.warning("Corpus has changed since the cache was built")
                } else {
                    self.success("Cache matches the current corpus")
                }
            }
        }
    }

    pub fn message(&mut self, msg: &str) -> Result<()> {
        writeln!(self.writer, "{}", msg)?;
        Ok(())
    }

    pub fn success(&mut self, msg: &str) -> Result<()> {
        if self.use_colors {
            writeln!(self.writer, "\x1b[32m✓\x1b[0m {}", msg)?;
        } else {
            writeln!(self.writer, "✓ {}", msg)?;
        }
        Ok(())
    }

    pub fn warning(&mut self, msg: &str) -> Result<()> {
        if self.use_colors {
            writeln!(self.writer, "\x1b[33m⚠\x1b[0m {}", msg)?;
        } else {
            writeln!(self.writer, "⚠ {}", msg)?;
        }
        Ok(())
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            format!("\x1b[1m{}\x1b[0m", text)
        } else {
            text.to_string()
        }
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", trimmed[..cut].trim_end()),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that can be read back after the formatter is done
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn hit(id: &str, title: &str, similarity: f32) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: "Short abstract.".to_string(),
            year: Some(2020),
            url: String::new(),
            similarity,
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_pretty_hits() {
        let buffer = SharedBuffer::default();
        let mut formatter = OutputFormatter::with_writer(OutputFormat::Pretty, buffer.clone());
        formatter
            .hits("attention", &[hit("p1", "Attention", 0.91234), hit("p2", "Graphs", 0.5)])
            .unwrap();

        let out = buffer.contents();
        assert!(out.contains("2 results for 'attention'"));
        assert!(out.contains("1. Attention (2020)"));
        assert!(out.contains("similarity: 0.9123"));
        assert!(out.contains("2. Graphs"));
    }

    #[test]
    fn test_empty_hits() {
        let buffer = SharedBuffer::default();
        let mut formatter = OutputFormatter::with_writer(OutputFormat::Pretty, buffer.clone());
        formatter.hits("nothing", &[]).unwrap();
        assert!(buffer.contents().contains("No results found"));
    }

    #[test]
    fn test_json_hits_keep_wire_names() {
        let buffer = SharedBuffer::default();
        let mut formatter = OutputFormatter::with_writer(OutputFormat::Json, buffer.clone());
        formatter.hits("q", &[hit("p1", "Attention", 0.9)]).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(parsed[0]["id"], "p1");
        assert_eq!(parsed[0]["abstract"], "Short abstract.");
    }

    #[test]
    fn test_missing_cache_status() {
        let buffer = SharedBuffer::default();
        let mut formatter = OutputFormatter::with_writer(OutputFormat::Yaml, buffer.clone());
        formatter.cache_info(None, true).unwrap();

        let out = buffer.contents();
        assert!(out.contains("cache: null"));
        assert!(out.contains("stale: true"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
    }
}
