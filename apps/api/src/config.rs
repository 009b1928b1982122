use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::embedding::HASHING_MODEL;
use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::parsing::generative::DEFAULT_TEMPERATURE;
use crate::parsing::ParserStrategy;

/// Application configuration loaded from environment variables.
/// Startup fails if a value is malformed or a required key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory resume store.
    pub database_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub parser_strategy: ParserStrategy,
    /// `None` reads every page.
    pub pdf_page_limit: Option<usize>,
    /// `None` disables stage timeouts.
    pub stage_timeout: Option<Duration>,
    pub embedding_model: String,
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_dimensions: usize,
    pub embedding_max_chars: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let parser_strategy = match get("PARSER_STRATEGY") {
            Some(name) => ParserStrategy::from_name(&name).with_context(|| {
                format!("PARSER_STRATEGY must be 'generative' or 'entity', got '{name}'")
            })?,
            None => ParserStrategy::Generative,
        };

        let llm_api_key = get("LLM_API_KEY");
        if parser_strategy == ParserStrategy::Generative && llm_api_key.is_none() {
            bail!("Required environment variable 'LLM_API_KEY' is not set (PARSER_STRATEGY=generative)");
        }

        let embedding_model = get("EMBEDDING_MODEL").unwrap_or_else(|| HASHING_MODEL.to_string());
        let embedding_api_url = get("EMBEDDING_API_URL");
        let embedding_api_key = get("EMBEDDING_API_KEY");
        if embedding_model != HASHING_MODEL
            && (embedding_api_url.is_none() || embedding_api_key.is_none())
        {
            bail!("EMBEDDING_API_URL and EMBEDDING_API_KEY are required for embedding model '{embedding_model}'");
        }

        let embedding_dimensions: usize = parse_or(&get, "EMBEDDING_DIMENSIONS", 384)?;
        if embedding_dimensions == 0 {
            bail!("EMBEDDING_DIMENSIONS must be greater than zero");
        }

        let page_limit: usize = parse_or(&get, "PDF_PAGE_LIMIT", 2)?;
        let timeout_secs: u64 = parse_or(&get, "STAGE_TIMEOUT_SECS", 60)?;

        Ok(Config {
            database_url: get("DATABASE_URL"),
            llm_api_key,
            llm_api_url: get("LLM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_temperature: parse_or(&get, "LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            parser_strategy,
            pdf_page_limit: (page_limit > 0).then_some(page_limit),
            stage_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            embedding_model,
            embedding_api_url,
            embedding_api_key,
            embedding_dimensions,
            embedding_max_chars: parse_or(&get, "EMBEDDING_MAX_CHARS", 32_000)?,
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("LLM_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.parser_strategy, ParserStrategy::Generative);
        assert_eq!(config.llm_model, DEFAULT_MODEL);
        assert_eq!(config.pdf_page_limit, Some(2));
        assert_eq!(config.stage_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.embedding_model, HASHING_MODEL);
        assert_eq!(config.embedding_dimensions, 384);
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_generative_requires_api_key() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn test_entity_strategy_needs_no_key() {
        let config = config(&[("PARSER_STRATEGY", "entity")]).unwrap();
        assert_eq!(config.parser_strategy, ParserStrategy::Entity);
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn test_zero_disables_limits() {
        let config = config(&[
            ("PARSER_STRATEGY", "entity"),
            ("PDF_PAGE_LIMIT", "0"),
            ("STAGE_TIMEOUT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.pdf_page_limit, None);
        assert_eq!(config.stage_timeout, None);
    }

    #[test]
    fn test_remote_embedding_model_needs_endpoint() {
        let err = config(&[
            ("PARSER_STRATEGY", "entity"),
            ("EMBEDDING_MODEL", "text-embedding-3-small"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("EMBEDDING_API_URL"));
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = config(&[("PARSER_STRATEGY", "entity"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(config(&[("PARSER_STRATEGY", "regex")]).is_err());
    }
}
