
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::chat::{ChatMessage, ChatProvider, ChatRequest};
use crate::config::OllamaConfig;
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::{RagError, Result};

/// Blocking HTTP client for an Ollama server.
///
/// Requests are never retried; every failure is a [`RagError::Provider`].
/// The async trait impls move the blocking call onto the tokio blocking pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    chat_model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| RagError::Configuration(e.to_string()))?;

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            agent: build_agent(config.request_timeout_secs.map(Duration::from_secs)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(Some(timeout));
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Test connection to the server and verify both configured models exist
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        for model in [&self.embedding_model, &self.chat_model] {
            Self::ensure_model_listed(&models, model)?;
        }

        info!(
            "Health check passed for Ollama at {} (embedding {}, chat {})",
            self.base_url, self.embedding_model, self.chat_model
        );
        Ok(())
    }

    /// Ping the server to check that it is responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        self.list_models().map(|_| ())
    }

    /// Validate that `model` is available on the server
    #[inline]
    pub fn validate_model(&self, model: &str) -> Result<()> {
        let models = self.list_models()?;
        Self::ensure_model_listed(&models, model)
    }

    fn ensure_model_listed(models: &[ModelInfo], model: &str) -> Result<()> {
        if models.iter().any(|m| m.name == model) {
            debug!("Model {} is available", model);
            return Ok(());
        }

        let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        warn!("Model {} not found. Available models: {:?}", model, available);
        Err(RagError::Provider(format!(
            "Model '{}' is not available. Available models: {:?}",
            model, available
        )))
    }

    /// List all models the server has pulled
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self.get_json("/api/tags")?;
        debug!("Found {} models", response.models.len());
        Ok(response.models)
    }

    /// Embed a single text with the embedding model
    #[inline]
    pub fn embed_blocking(&self, text: &str) -> Result<Embedding> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbedResponse = self.post_json("/api/embed", &request)?;

        let embedding = response.embeddings.into_iter().next().unwrap_or_default();
        if embedding.is_empty() {
            return Err(RagError::Provider(
                "embedding response contained no vector".to_string(),
            ));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Run one non-streaming chat completion with the chat model
    #[inline]
    pub fn chat_blocking(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!("Sending {} chat messages to {}", messages.len(), self.chat_model);

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            stream: false,
        };
        let response: ChatCompletionResponse = self.post_json("/api/chat", &request)?;

        debug!(
            "Received answer ({} chars)",
            response.message.content.len()
        );
        Ok(response.message.content)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::Configuration(format!("Failed to build URL {}: {}", path, e)))
    }

    fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let response = self.agent.get(url.as_str()).call();
        Self::read_response(&url, response)
    }

    fn post_json<T: Serialize, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R> {
        let url = self.endpoint(path)?;
        let body = serde_json::to_string(body)
            .map_err(|e| RagError::Provider(format!("Failed to serialize request: {}", e)))?;
        debug!("POST {}", url);

        let response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&body);
        Self::read_response(&url, response)
    }

    fn read_response<R: DeserializeOwned>(
        url: &Url,
        response: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<R> {
        let mut response = response
            .map_err(|e| RagError::Provider(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RagError::Provider(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map_or(text, |e| e.error);
            warn!("Ollama returned HTTP {} for {}: {}", status.as_u16(), url, detail);
            return Err(RagError::Provider(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                detail
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| RagError::Provider(format!("Failed to decode response from {}: {}", url, e)))
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RagError::Provider(format!("Ollama request task failed: {}", e)))?
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let client = self.clone();
        let text = text.to_string();
        run_blocking(move || client.embed_blocking(&text)).await
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let client = self.clone();
        let messages = request.to_messages();
        run_blocking(move || client.chat_blocking(&messages)).await
    }
}
