//! Field Parser: plain text to a structured `ResumeRecord`.
//!
//! Two strategies sit behind the one `ResumeParser` trait:
//! - `GenerativeParser`: prompts a text model for the full JSON schema and
//!   repairs what comes back. This is the complete parser.
//! - `EntityParser`: buckets recognised entities. Degraded mode only: it never
//!   fills `experience_level`, `recommended_roles` or `ats_feedback`.
//!
//! `ResumePipeline` holds an `Arc<dyn ResumeParser>` chosen at startup via
//! `PARSER_STRATEGY`.

pub mod entity;
pub mod experience;
pub mod generative;
pub mod models;
pub mod prompts;
pub mod sections;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractedText;
use crate::parsing::models::{ExperienceLevel, ResumeRecord};
use crate::parsing::sections::SkillBucket;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("text generation failed: {0}")]
    Generation(String),
}

/// An in-place fix applied while normalizing parser output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRepair {
    /// Key missing or null; the type's empty value was used.
    Defaulted { field: String },
    /// Value of the wrong JSON type converted to the declared type.
    Coerced { field: String },
    /// Numeric value clamped into its allowed range.
    Clamped { field: String, from: f64, to: u8 },
    /// Experience band replaced (invalid label or inferred from history).
    Remapped {
        field: String,
        from: String,
        to: ExperienceLevel,
    },
    /// Skill term moved to the bucket its position in the text dictates.
    MovedSkill { term: String, to: SkillBucket },
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub record: ResumeRecord,
    pub repairs: Vec<FieldRepair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserStrategy {
    Generative,
    Entity,
}

impl ParserStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "generative" | "llm" => Some(Self::Generative),
            "entity" | "ner" => Some(Self::Entity),
            _ => None,
        }
    }
}

/// The résumé parser trait. Implement this to add a strategy without touching
/// the pipeline.
#[async_trait]
pub trait ResumeParser: Send + Sync {
    fn strategy(&self) -> ParserStrategy;

    async fn parse(&self, text: &ExtractedText) -> Result<ParseOutcome, ParseError>;
}
