//! Vector storage of scraped content for semantic retrieval
//!
//! Documents are split into overlapping chunks, embedded with the caller's
//! [`Embedder`] and stored in either a local JSON-persisted collection or a
//! pgvector table.

pub mod chunking;
pub mod local;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

pub use local::LocalVectorStore;
pub use postgres::PgVectorStore;

use crate::config::VectorStoreConfig;
use crate::embeddings::Embedder;
use crate::errors::ResearchError;
use crate::models::ScrapedContent;
use crate::Result;

/// One embedded chunk of a scraped page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub url: String,
    pub title: Option<String>,
    pub chunk_index: usize,
    pub text: String,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Insert or replace chunks by id
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<()>;

    /// Nearest chunks to `embedding`, most similar first
    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievedChunk>>;

    async fn count(&self) -> Result<usize>;

    async fn clear(&self) -> Result<()>;
}

/// Chunking parameters plus a backend
pub struct DocumentIndex {
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentIndex {
    pub fn new(store: Arc<dyn VectorStore>, config: &VectorStoreConfig) -> Self {
        Self {
            store,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Chunk, embed and store successful documents. Returns the number of documents stored.
    pub async fn add_documents(&self, documents: &[ScrapedContent], embedder: &dyn Embedder) -> Result<usize> {
        let mut chunks = Vec::new();
        let mut stored_documents = 0;

        for doc in documents.iter().filter(|d| d.is_success() && !d.text.trim().is_empty()) {
            let pieces = chunking::chunk_text(&doc.text, self.chunk_size, self.chunk_overlap);
            if pieces.is_empty() {
                continue;
            }
            stored_documents += 1;
            for (index, text) in pieces.into_iter().enumerate() {
                chunks.push(StoredChunk {
                    id: chunking::document_id(&doc.url, index),
                    url: doc.url.clone(),
                    title: doc.title.clone(),
                    chunk_index: index,
                    text,
                    embedding: Vec::new(),
                    scraped_at: doc.scraped_at,
                });
            }
        }

        if chunks.is_empty() {
            info!("No documents to add to the vector store");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ResearchError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let chunk_count = chunks.len();
        self.store.upsert(chunks).await?;
        info!(
            "💾 Stored {} documents ({} chunks) in {} vector store",
            stored_documents,
            chunk_count,
            self.store.backend_name()
        );
        Ok(stored_documents)
    }

    pub async fn search(&self, query: &str, limit: usize, embedder: &dyn Embedder) -> Result<Vec<RetrievedChunk>> {
        let embedding = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::EmbeddingError("No embedding for query".to_string()))?;

        self.store.nearest(&embedding, limit).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

/// Open the configured backend
pub async fn open_store(config: &VectorStoreConfig, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "local" => Ok(Arc::new(
            LocalVectorStore::open(&config.persist_directory, &config.collection).await?,
        )),
        "postgres" => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                ResearchError::ConfigError("vector_store.database_url is required for postgres".to_string())
            })?;
            Ok(Arc::new(
                PgVectorStore::connect(url, config.max_connections, &config.collection, dimension).await?,
            ))
        }
        other => Err(ResearchError::ConfigError(format!(
            "Unknown vector store backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    #[tokio::test]
    async fn test_add_and_search_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            LocalVectorStore::open(dir.path().to_str().unwrap(), "test")
                .await
                .unwrap(),
        );
        let index = DocumentIndex::new(store, &VectorStoreConfig::default());
        let embedder = HashingEmbedder::new(128);

        let docs = vec![
            ScrapedContent::success(
                "https://rust.example.com",
                Some("Rust".into()),
                "Rust provides memory safety without garbage collection.".into(),
                1,
            ),
            ScrapedContent::success(
                "https://bread.example.com",
                None,
                "Sourdough bread needs a starter and patience.".into(),
                1,
            ),
            ScrapedContent::failure("https://down.example.com", "Failed to download URL", 3),
        ];

        let stored = index.add_documents(&docs, &embedder).await.unwrap();
        assert_eq!(stored, 2);
        assert_eq!(index.count().await.unwrap(), 2);

        let hits = index.search("memory safety in rust", 1, &embedder).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://rust.example.com");

        // Re-adding the same documents replaces chunks by id
        index.add_documents(&docs, &embedder).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_add() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            LocalVectorStore::open(dir.path().to_str().unwrap(), "empty")
                .await
                .unwrap(),
        );
        let index = DocumentIndex::new(store, &VectorStoreConfig::default());

        let stored = index
            .add_documents(&[], &HashingEmbedder::new(8))
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }
}
