use debt_navigator::{
    api::{start_server, ApiState},
    composer::AnswerComposer,
    config::AppConfig,
    extraction::ParameterExtractor,
    llm::LlmRouter,
    orchestrator::QuestionRouter,
    retrieval::{DocumentContext, RetrievalAnswerer},
    store::build_store,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Debt Navigator - API Server");
    info!("Port: {}", config.port);

    if config.llm.gemini_api_key.is_none() && config.llm.openai_api_key.is_none() {
        warn!("No hosted LLM keys set; relying on Ollama only");
    }

    // Create components
    let llm = Arc::new(
        LlmRouter::new(config.llm.build_provider_chain()?)?
            .with_unconfigured(config.llm.unconfigured_providers()),
    );

    let documents = match &config.documents_csv {
        Some(path) => DocumentContext::from_csv(path, config.documents_chunk_rows)?,
        None => DocumentContext::empty(),
    };

    let question_router = Arc::new(
        QuestionRouter::new(
            ParameterExtractor::new(llm.clone()),
            AnswerComposer::new(config.answer_style, llm.clone()),
            Arc::new(RetrievalAnswerer::new(llm.clone(), Arc::new(documents))),
        )
        .with_off_topic_policy(config.off_topic_policy, llm.clone()),
    );

    let state = ApiState {
        question_router,
        llm,
        store: build_store(config.database_url.as_deref()),
    };

    info!(
        answer_style = ?config.answer_style,
        off_topic_policy = ?config.off_topic_policy,
        "Question router initialized"
    );
    info!("Starting API server...");

    start_server(state, &config.cors_origins, config.port).await?;

    Ok(())
}
