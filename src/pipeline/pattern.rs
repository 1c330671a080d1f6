//! Regex-driven extraction pipeline
//!
//! Parses plain text, Markdown and HTML documents into sections and emits
//! one record per regex match. Each named capture group becomes a record
//! field; a pattern without named groups records the whole match under
//! the `match` field.

use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::pipeline::types::{Document, Record, RecordSet};
use crate::pipeline::Pipeline;
use regex::Regex;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

/// HTML heading tags, rewritten as Markdown headings before stripping
static HTML_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]>").expect("Invalid heading regex")
});

/// Tags that end a paragraph
static HTML_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</p>|<br\s*/?>|</div>|</li>|</tr>").expect("Invalid break regex")
});

/// Script and style bodies are dropped entirely
static HTML_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("Invalid script regex")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// A named extraction pattern
#[derive(Debug, Clone)]
pub struct RecordModel {
    /// Model name, stored on every record it produces
    pub name: String,

    /// Pattern applied to each section
    pub pattern: Regex,
}

impl RecordModel {
    /// Create a model from a compiled pattern
    pub fn new(name: impl Into<String>, pattern: Regex) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }

    /// Parse a `NAME=REGEX` model definition
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (name, pattern) = spec.split_once('=').ok_or_else(|| ConfigError::InvalidModel {
            spec: spec.to_string(),
            reason: "expected NAME=REGEX".into(),
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidModel {
                spec: spec.to_string(),
                reason: "model name is empty".into(),
            });
        }

        let pattern = Regex::new(pattern).map_err(|e| ConfigError::InvalidModel {
            spec: spec.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(name, pattern))
    }

    /// Apply this model to one section of text
    fn extract_from(&self, text: &str, section: usize, out: &mut RecordSet) {
        let named: Vec<&str> = self.pattern.capture_names().flatten().collect();

        for caps in self.pattern.captures_iter(text) {
            let mut record = Record::new(&self.name, section);

            if named.is_empty() {
                if let Some(m) = caps.get(0) {
                    record = record.with_field("match", m.as_str().trim());
                }
            } else {
                for name in &named {
                    if let Some(m) = caps.name(name) {
                        record = record.with_field(*name, m.as_str().trim());
                    }
                }
            }

            if !record.fields.is_empty() {
                out.push(record);
            }
        }
    }
}

/// Pipeline that sections a document and applies a list of record models
#[derive(Debug, Clone, Default)]
pub struct PatternPipeline {
    models: Vec<RecordModel>,
}

impl PatternPipeline {
    /// Create a pipeline with the given models
    pub fn new(models: Vec<RecordModel>) -> Self {
        Self { models }
    }

    /// Configured models
    pub fn models(&self) -> &[RecordModel] {
        &self.models
    }
}

impl Pipeline for PatternPipeline {
    fn parse(&self, path: &Path) -> PipelineResult<Document> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::InvalidData => PipelineError::Parse {
                path: path.to_path_buf(),
                reason: "document is not valid UTF-8".into(),
            },
            _ => PipelineError::Read {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let text = if is_markup(path, &raw) {
            html_to_text(&raw)
        } else {
            raw
        };

        Ok(sectionize(path, &text))
    }

    fn extract(&self, document: &Document) -> PipelineResult<RecordSet> {
        let mut records = RecordSet::new();
        for (idx, section) in document.sections.iter().enumerate() {
            for model in &self.models {
                model.extract_from(&section.text, idx, &mut records);
            }
        }
        Ok(records)
    }
}

/// Decide whether a document should be treated as HTML/XML
fn is_markup(path: &Path, raw: &str) -> bool {
    let by_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "html" | "htm" | "xml" | "xhtml"))
        .unwrap_or(false);

    by_ext || raw.trim_start().starts_with('<')
}

/// Flatten markup into Markdown-ish plain text
fn html_to_text(raw: &str) -> String {
    let text = HTML_SCRIPT.replace_all(raw, "");
    let text = HTML_HEADING.replace_all(&text, "\n\n# $1\n\n");
    let text = HTML_BREAK.replace_all(&text, "\n\n");
    let text = HTML_TAG.replace_all(&text, "");

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Split text into sections on blank lines, tracking `#` headings
fn sectionize(path: &Path, text: &str) -> Document {
    let mut doc = Document::new(path);
    let mut heading: Option<String> = None;

    for block in text.split("\n\n") {
        let mut body = Vec::new();

        for line in block.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(h) = trimmed.strip_prefix('#') {
                // A heading closes the paragraph collected so far
                if !body.is_empty() {
                    push_paragraph(&mut doc, &heading, &body);
                    body.clear();
                }
                let h = collapse(h.trim_start_matches('#'));
                heading = if h.is_empty() { None } else { Some(h) };
            } else {
                body.push(trimmed);
            }
        }

        if !body.is_empty() {
            push_paragraph(&mut doc, &heading, &body);
        }
    }

    doc
}

fn push_paragraph(doc: &mut Document, heading: &Option<String>, lines: &[&str]) {
    let text = collapse(&lines.join(" "));
    if !text.is_empty() {
        doc.push_section(heading.clone(), text);
    }
}

fn collapse(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline(specs: &[&str]) -> PatternPipeline {
        PatternPipeline::new(specs.iter().map(|s| RecordModel::parse(s).unwrap()).collect())
    }

    #[test]
    fn test_parse_model_spec() {
        let model = RecordModel::parse(r"yield=(?P<value>\d+(\.\d+)?)\s*%").unwrap();
        assert_eq!(model.name, "yield");

        assert!(RecordModel::parse("no-equals-sign").is_err());
        assert!(RecordModel::parse("=abc").is_err());
        assert!(RecordModel::parse("bad=(unclosed").is_err());
    }

    #[test]
    fn test_sectionize_markdown() {
        let doc = sectionize(
            Path::new("p.md"),
            "# Abstract\nFirst line\nsecond line\n\nAnother   paragraph\n\n## Methods\nStirred.",
        );

        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].heading.as_deref(), Some("Abstract"));
        assert_eq!(doc.sections[0].text, "First line second line");
        assert_eq!(doc.sections[1].text, "Another paragraph");
        assert_eq!(doc.sections[2].heading.as_deref(), Some("Methods"));
    }

    #[test]
    fn test_html_is_flattened() {
        let text = html_to_text(
            "<html><style>p{}</style><h2>Results</h2><p>Rate was 5 &amp; rising</p><p>Done</p></html>",
        );
        let doc = sectionize(Path::new("p.html"), &text);

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].heading.as_deref(), Some("Results"));
        assert_eq!(doc.sections[0].text, "Rate was 5 & rising");
        assert!(!doc.sections.iter().any(|s| s.text.contains("p{}")));
    }

    #[test]
    fn test_extract_named_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        fs::write(
            &path,
            "TiO2 reached 12.5 % yield.\n\nZnO reached 3 % yield and CdS 7 %.",
        )
        .unwrap();

        let p = pipeline(&[r"yield=(?P<value>\d+(?:\.\d+)?)\s*%"]);
        let doc = p.parse(&path).unwrap();
        let records = p.extract(&doc).unwrap();

        let values: Vec<_> = records.iter().map(|r| r.field("value").unwrap()).collect();
        assert_eq!(values, vec!["12.5", "3", "7"]);
        assert_eq!(records.iter().last().unwrap().section, 1);
    }

    #[test]
    fn test_extract_whole_match_without_groups() {
        let p = pipeline(&[r"compound=\b[A-Z][a-z]?\d*[A-Z][a-z]?\d*\b"]);
        let mut doc = Document::new("x.txt");
        doc.push_section(None, "We used TiO2 here.");

        let records = p.extract(&doc).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.iter().next().unwrap().field("match"), Some("TiO2"));
    }

    #[test]
    fn test_parse_missing_file() {
        let p = pipeline(&[]);
        let err = p.parse(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::Read { .. }));
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binary.pdf");
        fs::write(&path, [0xffu8, 0xfe, 0x00, 0x81]).unwrap();

        let err = pipeline(&[]).parse(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }
}
