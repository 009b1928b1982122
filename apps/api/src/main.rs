mod config;
mod embedding;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod parsing;
mod pipeline;
mod routes;
mod state;
mod store;
mod vector_index;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::{Embedder, HashingEmbedder, HttpEmbedder, HASHING_MODEL};
use crate::extraction::{DocumentExtractor, ExtractOptions};
use crate::llm_client::LlmClient;
use crate::parsing::entity::{EntityParser, LexiconRecognizer};
use crate::parsing::generative::GenerativeParser;
use crate::parsing::{ParserStrategy, ResumeParser};
use crate::pipeline::ResumePipeline;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{InMemoryResumeStore, PgResumeStore, ResumeStore};

/// HTTP client timeout for outbound model calls when stage timeouts are off.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume pipeline v{}", env!("CARGO_PKG_VERSION"));

    let client_timeout = config.stage_timeout.unwrap_or(CLIENT_TIMEOUT);

    let extractor = DocumentExtractor::with_default_formats(ExtractOptions {
        page_limit: config.pdf_page_limit,
    });
    info!("Document extractor ready (page limit: {:?})", config.pdf_page_limit);

    let parser = build_parser(&config, client_timeout)?;
    info!("Parser strategy: {:?}", parser.strategy());

    let embedder = build_embedder(&config, client_timeout)?;
    info!(
        "Embedder initialized (model: {}, dimension: {})",
        embedder.model(),
        embedder.dimension()
    );

    let store: Arc<dyn ResumeStore> = match &config.database_url {
        Some(url) => Arc::new(PgResumeStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set; resumes are kept in memory only");
            Arc::new(InMemoryResumeStore::new())
        }
    };

    let pipeline = ResumePipeline::new(extractor, parser, embedder, store, config.stage_timeout);
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_parser(config: &Config, timeout: Duration) -> Result<Arc<dyn ResumeParser>> {
    Ok(match config.parser_strategy {
        ParserStrategy::Generative => {
            let api_key = config
                .llm_api_key
                .clone()
                .context("LLM_API_KEY is required for the generative parser")?;
            let llm = LlmClient::new(
                api_key,
                config.llm_api_url.clone(),
                config.llm_model.clone(),
                timeout,
            )?;
            info!("LLM client initialized (model: {})", llm.model());
            Arc::new(GenerativeParser::new(Arc::new(llm), config.llm_temperature))
        }
        ParserStrategy::Entity => Arc::new(EntityParser::new(Arc::new(
            LexiconRecognizer::default(),
        ))),
    })
}

fn build_embedder(config: &Config, timeout: Duration) -> Result<Arc<dyn Embedder>> {
    if config.embedding_model == HASHING_MODEL {
        return Ok(Arc::new(HashingEmbedder::new(
            config.embedding_dimensions,
            config.embedding_max_chars,
        )));
    }

    let (Some(url), Some(key)) = (&config.embedding_api_url, &config.embedding_api_key) else {
        anyhow::bail!("EMBEDDING_API_URL and EMBEDDING_API_KEY are required for remote embeddings");
    };
    Ok(Arc::new(HttpEmbedder::new(
        key.clone(),
        url,
        config.embedding_model.clone(),
        config.embedding_dimensions,
        config.embedding_max_chars,
        timeout,
    )?))
}
