//! Document Extractor: turns an uploaded file into one normalized line of text.
//!
//! Format dispatch is a lookup table from format tag to a `FormatExtractor`.
//! Adding a format means registering one more strategy; call sites never change.
//!
//! Normalization is lossy on purpose: newlines, tabs and runs of spaces all
//! collapse to a single space, so section breaks do not survive. The parsers
//! recover sections from heading keywords instead (see `parsing::sections`).

pub mod docx;
pub mod pdf;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::extraction::docx::DocxExtractor;
use crate::extraction::pdf::PdfExtractor;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document format '{0}'")]
    UnsupportedFormat(String),

    #[error("document is unreadable: {0}")]
    Unreadable(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("document has no pages")]
    NoPages,

    #[error("document contains no extractable text")]
    Empty,
}

/// Extraction knobs shared by every format strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Only the first N pages are read. `None` reads the whole document.
    /// Formats without a page model (DOCX) ignore it.
    pub page_limit: Option<usize>,
}

/// Plain text produced by extraction. Never contains tabs, newlines or
/// leading/trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn from_raw(raw: &str) -> Self {
        Self(normalize_whitespace(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for ExtractedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapses every whitespace run (including `\n`, `\r`, `\t`) to one space.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One extraction strategy for one file format. Returns raw, un-normalized text.
pub trait FormatExtractor: Send + Sync {
    fn extract_raw(&self, content: &[u8], options: &ExtractOptions)
        -> Result<String, ExtractionError>;
}

/// Table-driven dispatcher over the registered format strategies.
#[derive(Clone)]
pub struct DocumentExtractor {
    strategies: HashMap<String, Arc<dyn FormatExtractor>>,
    options: ExtractOptions,
}

impl DocumentExtractor {
    /// An extractor with no formats registered.
    pub fn empty(options: ExtractOptions) -> Self {
        Self {
            strategies: HashMap::new(),
            options,
        }
    }

    /// PDF and DOCX, the formats accepted by the upload endpoint.
    pub fn with_default_formats(options: ExtractOptions) -> Self {
        Self::empty(options)
            .register("pdf", PdfExtractor)
            .register("docx", DocxExtractor)
    }

    pub fn register(mut self, tag: &str, extractor: impl FormatExtractor + 'static) -> Self {
        self.strategies
            .insert(normalize_tag(tag), Arc::new(extractor));
        self
    }

    pub fn supports(&self, tag: &str) -> bool {
        self.strategies.contains_key(&normalize_tag(tag))
    }

    /// Extracts and normalizes text from `content` declared as `format`.
    pub fn extract(&self, content: &[u8], format: &str) -> Result<ExtractedText, ExtractionError> {
        let tag = normalize_tag(format);
        let strategy = self
            .strategies
            .get(&tag)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(format.to_string()))?;

        let raw = strategy.extract_raw(content, &self.options)?;
        let text = ExtractedText::from_raw(&raw);
        debug!(
            format = %tag,
            bytes = content.len(),
            chars = text.as_str().len(),
            "document text extracted"
        );

        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('.').to_ascii_lowercase()
}
