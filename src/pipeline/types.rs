//! Document and record types
//!
//! A [`Document`] is the parsed form of one corpus file and is what the
//! cache stores. A [`RecordSet`] is what extraction produces and what the
//! output store persists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One contiguous block of document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Nearest preceding heading, if any
    pub heading: Option<String>,

    /// Paragraph text with internal whitespace collapsed
    pub text: String,
}

/// A parsed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Path the document was parsed from
    pub source: PathBuf,

    /// Sections in document order
    pub sections: Vec<Section>,
}

impl Document {
    /// Create a document with no sections
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            sections: Vec::new(),
        }
    }

    /// Append a section
    pub fn push_section(&mut self, heading: Option<String>, text: impl Into<String>) {
        self.sections.push(Section {
            heading,
            text: text.into(),
        });
    }

    /// Path the document was parsed from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns true if the document has no text at all
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.text.is_empty())
    }

    /// Total number of characters across all sections
    pub fn text_len(&self) -> usize {
        self.sections.iter().map(|s| s.text.len()).sum()
    }
}

/// One structured record extracted from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the model that produced this record
    pub model: String,

    /// Field name -> extracted value
    pub fields: BTreeMap<String, String>,

    /// Index of the section the record came from
    pub section: usize,
}

impl Record {
    /// Create a record with no fields
    pub fn new(model: impl Into<String>, section: usize) -> Self {
        Self {
            model: model.into(),
            fields: BTreeMap::new(),
            section,
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field value
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// All records extracted from one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet(Vec<Record>);

impl RecordSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, record: Record) {
        self.0.push(record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    /// Keep only records matching the predicate
    pub fn retain<F: FnMut(&Record) -> bool>(&mut self, f: F) {
        self.0.retain(f);
    }

    pub fn into_inner(self) -> Vec<Record> {
        self.0
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
