//! Text embeddings for the vector store
//!
//! Providers:
//! - OpenAI (text-embedding-3-small, ...)
//! - Ollama (local models)
//! - `hashing`: an offline feature-hashing embedder, used when no remote
//!   provider is configured

pub mod client;
pub mod hashing;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use hashing::HashingEmbedder;

use crate::config::EmbeddingsConfig;
use crate::errors::ResearchError;
use crate::errors::Result;

/// Dimension used by the offline embedder when the configured provider is unavailable
pub const FALLBACK_EMBEDDING_DIM: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// One vector per input text, in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Build the configured embedder.
///
/// The OpenAI provider needs a key; without one the hashing embedder is used.
pub fn build_embedder(config: &EmbeddingsConfig, openai_api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => match openai_api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(Arc::new(EmbeddingClient::new(
                EmbeddingProvider::OpenAI,
                config.model.clone(),
                config.endpoint.clone(),
                Some(key.to_string()),
                config.dimension,
            )?)),
            None => {
                tracing::warn!("No OpenAI key for embeddings, using the hashing embedder");
                Ok(Arc::new(HashingEmbedder::new(FALLBACK_EMBEDDING_DIM)))
            }
        },
        "ollama" => Ok(Arc::new(EmbeddingClient::new(
            EmbeddingProvider::Ollama,
            config.model.clone(),
            config.endpoint.clone(),
            None,
            config.dimension,
        )?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        other => Err(ResearchError::ConfigError(format!(
            "Unknown embeddings provider: {other}"
        ))),
    }
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_build_embedder_without_key_falls_back() {
        let embedder = build_embedder(&EmbeddingsConfig::default(), None).unwrap();
        assert_eq!(embedder.dimension(), FALLBACK_EMBEDDING_DIM);
    }

    #[test]
    fn test_build_embedder_rejects_unknown_provider() {
        let config = EmbeddingsConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingsConfig::default()
        };
        assert!(build_embedder(&config, Some("sk")).is_err());
    }
}
