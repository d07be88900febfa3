#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance
// Run with: cargo test --test integration_ollama -- --ignored

use chat_rag::chat::{ChatProvider, ChatRequest};
use chat_rag::config::OllamaConfig;
use chat_rag::embeddings::EmbeddingProvider;
use chat_rag::ollama::OllamaClient;
use std::env;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_OLLAMA_HOST: &str = "localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

fn create_integration_test_client() -> OllamaClient {
    let defaults = OllamaConfig::default();
    let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    let port = env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_OLLAMA_PORT);
    let embedding_model =
        env::var("OLLAMA_EMBEDDING_MODEL").unwrap_or_else(|_| defaults.embedding_model.clone());
    let chat_model = env::var("OLLAMA_CHAT_MODEL").unwrap_or_else(|_| defaults.chat_model.clone());

    let config = OllamaConfig {
        host,
        port,
        embedding_model,
        chat_model,
        ..defaults
    };

    OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(120))
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore error if already initialized
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();

    let client = create_integration_test_client();

    info!("Testing health check against real Ollama instance");
    let result = client.health_check();

    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_list_models() {
    init_test_tracing();

    let client = create_integration_test_client();
    let models = client.list_models().expect("model listing should succeed");

    assert!(
        !models.is_empty(),
        "Should have at least one model available"
    );

    for model in &models {
        debug!("Available model: {} (size: {:?})", model.name, model.size);
    }
}

#[tokio::test]
#[ignore = "requires a local Ollama instance"]
async fn real_ollama_embedding_dimension() {
    init_test_tracing();

    let client = create_integration_test_client();
    let embedding = client
        .embed("search_document: This is a test document about machine learning.")
        .await
        .expect("embedding should succeed");

    info!("Embedding has {} dimensions", embedding.len());
    assert_eq!(
        embedding.len(),
        OllamaConfig::default().embedding_dimension as usize
    );
    assert!(embedding.iter().all(|v| v.is_finite()));
}

#[tokio::test]
#[ignore = "requires a local Ollama instance"]
async fn real_ollama_similar_texts_are_closer() {
    init_test_tracing();

    let client = create_integration_test_client();
    let cat = client.embed("The cat sat on the mat.").await.expect("embed");
    let kitten = client.embed("A kitten rested on the rug.").await.expect("embed");
    let finance = client
        .embed("Quarterly revenue exceeded analyst expectations.")
        .await
        .expect("embed");

    let metric = chat_rag::database::DistanceMetric::Cosine;
    assert!(metric.distance(&cat, &kitten) < metric.distance(&cat, &finance));
}

#[tokio::test]
#[ignore = "requires a local Ollama instance"]
async fn real_ollama_chat_answer() {
    init_test_tracing();

    let client = create_integration_test_client();
    let answer = client
        .chat(ChatRequest::with_context(
            "Where do the birds fly?",
            "Birds fly south.",
        ))
        .await
        .expect("chat should succeed");

    info!("Answer: {}", answer);
    assert!(!answer.trim().is_empty());
}
