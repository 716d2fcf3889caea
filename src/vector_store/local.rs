use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;

use super::RetrievedChunk;
use super::StoredChunk;
use super::VectorStore;
use crate::embeddings::cosine_similarity;
use crate::errors::ResearchError;
use crate::Result;

/// Collection persisted as one JSON file: `{persist_directory}/{collection}.json`
pub struct LocalVectorStore {
    path: PathBuf,
    chunks: RwLock<HashMap<String, StoredChunk>>,
}

impl LocalVectorStore {
    pub async fn open(persist_directory: &str, collection: &str) -> Result<Self> {
        let dir = PathBuf::from(persist_directory);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{collection}.json"));

        let chunks: HashMap<String, StoredChunk> = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<StoredChunk> = serde_json::from_slice(&bytes).map_err(|e| {
                    ResearchError::VectorStoreError(format!(
                        "Corrupt collection file {}: {e}",
                        path.display()
                    ))
                })?;
                list.into_iter().map(|c| (c.id.clone(), c)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Local vector store {} opened with {} chunks",
            path.display(),
            chunks.len()
        );

        Ok(Self {
            path,
            chunks: RwLock::new(chunks),
        })
    }

    async fn persist(&self, chunks: &HashMap<String, StoredChunk>) -> Result<()> {
        let mut list: Vec<&StoredChunk> = chunks.values().collect();
        list.sort_by(|a, b| a.url.cmp(&b.url).then(a.chunk_index.cmp(&b.chunk_index)));
        let json = serde_json::to_vec(&list)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Persisted {} chunks to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn upsert(&self, new_chunks: Vec<StoredChunk>) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        for chunk in new_chunks {
            chunks.insert(chunk.id.clone(), chunk);
        }
        self.persist(&chunks).await
    }

    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.chunks.read().await;

        let mut scored: Vec<RetrievedChunk> = chunks
            .values()
            .filter(|c| c.embedding.len() == embedding.len())
            .map(|c| RetrievedChunk {
                url: c.url.clone(),
                title: c.title.clone(),
                chunk_index: c.chunk_index,
                text: c.text.clone(),
                similarity: cosine_similarity(&c.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        chunks.clear();
        self.persist(&chunks).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            url: format!("https://{id}.example.com"),
            title: None,
            chunk_index: 0,
            text: format!("text {id}"),
            embedding,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        {
            let store = LocalVectorStore::open(path, "research_content").await.unwrap();
            store
                .upsert(vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
                .await
                .unwrap();
        }

        let reopened = LocalVectorStore::open(path, "research_content").await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);

        let hits = reopened.nearest(&[0.9, 0.1], 2).await.unwrap();
        assert_eq!(hits[0].url, "https://a.example.com");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path().to_str().unwrap(), "c").await.unwrap();
        store.upsert(vec![chunk("a", vec![1.0, 0.0, 0.0])]).await.unwrap();

        assert!(store.nearest(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path().to_str().unwrap(), "c").await.unwrap();
        store.upsert(vec![chunk("a", vec![1.0])]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{not json").unwrap();

        let result = LocalVectorStore::open(dir.path().to_str().unwrap(), "bad").await;
        assert!(matches!(result, Err(ResearchError::VectorStoreError(_))));
    }
}
