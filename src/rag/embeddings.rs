//! Embedding backends
//!
//! OpenAI embeddings when an API key is configured, otherwise a
//! deterministic local embedder so the pipeline stays usable offline. Both
//! produce one fixed-length vector per input text, in input order.

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::extract::cap_chars;

const MAX_EMBED_CHARS: usize = 8000;

/// OpenAI embedding service.
pub struct EmbeddingService {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl EmbeddingService {
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Embedding("OPENAI_API_KEY not set".to_string()))?;

        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = OpenAIClient::with_config(config);

        Ok(Self {
            client,
            model: "text-embedding-3-small".to_string(),
        })
    }

    pub fn with_model(model: impl Into<String>) -> Result<Self> {
        let mut service = Self::new()?;
        service.model = model.into();
        Ok(service)
    }

    /// Generate embeddings for multiple texts in one request. Empty inputs
    /// map to empty vectors at their original positions.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let processed: Vec<String> = texts
            .iter()
            .map(|t| cap_chars(t.trim(), MAX_EMBED_CHARS))
            .filter(|t| !t.is_empty())
            .collect();

        if processed.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(processed))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        debug!(
            "Generated {} embeddings, tokens used: {}",
            response.data.len(),
            response.usage.total_tokens
        );

        let mut result = Vec::with_capacity(texts.len());
        let mut embed_iter = response.data.into_iter();
        for text in texts {
            if text.trim().is_empty() {
                result.push(Vec::new());
            } else if let Some(embed) = embed_iter.next() {
                result.push(embed.embedding);
            }
        }

        Ok(result)
    }

    /// Embedding dimension for the current model.
    pub fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }
}

/// Deterministic hashed bag-of-words embedding for offline use.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vec = vec![0.0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            vec[idx] += 1.0;
        }

        normalize_l2(&mut vec);
        vec
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}

/// The embedding adapter the pipeline calls.
pub enum EmbedBackend {
    OpenAI(EmbeddingService),
    Local(LocalEmbedder),
}

impl EmbedBackend {
    /// OpenAI when credentials are available, local otherwise.
    pub fn from_env(local_dim: usize) -> Self {
        match EmbeddingService::new() {
            Ok(service) => {
                info!("Embeddings: using OpenAI model");
                EmbedBackend::OpenAI(service)
            }
            Err(err) => {
                warn!("Embeddings: falling back to local embedder ({err})");
                EmbedBackend::Local(LocalEmbedder::new(local_dim))
            }
        }
    }

    /// One vector per input text, same order. The local path is CPU-bound
    /// and runs on the blocking pool so it never stalls the scheduler.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            EmbedBackend::OpenAI(service) => service.embed_batch(texts).await,
            EmbedBackend::Local(local) => {
                let local = local.clone();
                let texts = texts.to_vec();
                tokio::task::spawn_blocking(move || {
                    texts.iter().map(|t| local.embed_one(t)).collect()
                })
                .await
                .map_err(|err| Error::Embedding(format!("embedding task failed: {err}")))
            }
        }
    }

    /// Embed a single query text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no embedding returned".to_string()))
    }

    pub fn dimension(&self) -> usize {
        match self {
            EmbedBackend::OpenAI(service) => service.dimension(),
            EmbedBackend::Local(local) => local.dimension(),
        }
    }
}

fn normalize_l2(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that touch OPENAI_API_KEY serialize through this lock so they
    // cannot race each other's env mutations.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct OpenAiKeyGuard {
        original: Option<String>,
    }

    impl OpenAiKeyGuard {
        fn set_dummy() -> Self {
            let original = std::env::var("OPENAI_API_KEY").ok();
            std::env::set_var("OPENAI_API_KEY", "test_key");
            Self { original }
        }
    }

    impl Drop for OpenAiKeyGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                std::env::set_var("OPENAI_API_KEY", value);
            } else {
                std::env::remove_var("OPENAI_API_KEY");
            }
        }
    }

    #[test]
    fn dimension_returns_expected_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = OpenAiKeyGuard::set_dummy();

        let default = EmbeddingService::new().unwrap();
        assert_eq!(default.dimension(), 1536);

        let large = EmbeddingService::with_model("text-embedding-3-large").unwrap();
        assert_eq!(large.dimension(), 3072);

        let custom = EmbeddingService::with_model("custom-model").unwrap();
        assert_eq!(custom.dimension(), 1536);
    }

    #[test]
    fn local_embedder_is_deterministic() {
        let embedder = LocalEmbedder::new(64);
        let a = embedder.embed_one("the quick brown fox");
        let b = embedder.embed_one("the quick brown fox");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn local_embedder_output_is_normalized() {
        let embedder = LocalEmbedder::new(32);
        let vec = embedder.embed_one("several words of content here");
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn local_embedder_minimum_dimension() {
        let embedder = LocalEmbedder::new(0);
        assert_eq!(embedder.dimension(), 8);
    }

    #[tokio::test]
    async fn local_backend_preserves_order_and_length() {
        let backend = EmbedBackend::Local(LocalEmbedder::new(16));
        let texts = vec![
            "first text".to_string(),
            "second text".to_string(),
            "third".to_string(),
        ];
        let vectors = backend.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        for v in &vectors {
            assert_eq!(v.len(), 16);
        }

        let single = backend.embed_one("first text").await.unwrap();
        assert_eq!(single, vectors[0]);
    }

    #[tokio::test]
    async fn local_backend_empty_input() {
        let backend = EmbedBackend::Local(LocalEmbedder::new(16));
        let vectors = backend.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn from_env_without_key_falls_back_to_local() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let backend = EmbedBackend::from_env(128);
        assert!(matches!(backend, EmbedBackend::Local(_)));
        assert_eq!(backend.dimension(), 128);

        if let Some(value) = original {
            std::env::set_var("OPENAI_API_KEY", value);
        }
    }
}
