use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::RetrievedChunk;
use super::StoredChunk;
use super::VectorStore;
use crate::errors::ResearchError;
use crate::Result;

/// pgvector-backed collection, one table per collection
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
}

/// Collection names become table names; keep them to `[a-z0-9_]`
fn table_name(collection: &str) -> String {
    let cleaned: String = collection
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("chunks_{cleaned}")
}

impl PgVectorStore {
    pub async fn connect(database_url: &str, max_connections: u32, collection: &str, dimension: usize) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(database_url)
            .await?;

        let store = Self {
            pool,
            table: table_name(collection),
        };
        store.ensure_schema(dimension).await?;

        info!(
            "Database pool configured: max_connections={}, table={}",
            max_connections, store.table
        );
        Ok(store)
    }

    async fn ensure_schema(&self, dimension: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        let ddl = format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                title TEXT,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding vector({dimension}) NOT NULL,
                scraped_at TIMESTAMPTZ NOT NULL
            )
            ",
            table = self.table,
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    url: String,
    title: Option<String>,
    chunk_index: i32,
    content: String,
    similarity: f64,
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<()> {
        let sql = format!(
            r"
            INSERT INTO {} (id, url, title, chunk_index, content, embedding, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                title = EXCLUDED.title,
                embedding = EXCLUDED.embedding,
                scraped_at = EXCLUDED.scraped_at
            ",
            self.table
        );

        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            sqlx::query(&sql)
                .bind(&chunk.id)
                .bind(&chunk.url)
                .bind(&chunk.title)
                .bind(chunk.chunk_index as i32)
                .bind(&chunk.text)
                .bind(Vector::from(chunk.embedding))
                .bind(chunk.scraped_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievedChunk>> {
        let sql = format!(
            r"
            SELECT url, title, chunk_index, content,
                   1 - (embedding <=> $1) AS similarity
            FROM {}
            ORDER BY embedding <=> $1
            LIMIT $2
            ",
            self.table
        );

        let rows = sqlx::query_as::<_, ChunkRow>(&sql)
            .bind(Vector::from(embedding.to_vec()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| RetrievedChunk {
                url: r.url,
                title: r.title,
                chunk_index: r.chunk_index.max(0) as usize,
                text: r.content,
                similarity: r.similarity as f32,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        usize::try_from(count).map_err(|e| ResearchError::VectorStoreError(e.to_string()))
    }

    async fn clear(&self) -> Result<()> {
        let sql = format!("TRUNCATE {}", self.table);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_is_sanitized() {
        assert_eq!(table_name("research_content"), "chunks_research_content");
        assert_eq!(table_name("My-Docs; DROP"), "chunks_my_docs__drop");
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database with pgvector"]
    async fn test_roundtrip_against_database() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PgVectorStore::connect(&url, 2, "test_chunks", 3).await.unwrap();
        store.clear().await.unwrap();
        store
            .upsert(vec![StoredChunk {
                id: "a".into(),
                url: "https://a.example.com".into(),
                title: None,
                chunk_index: 0,
                text: "hello".into(),
                embedding: vec![1.0, 0.0, 0.0],
                scraped_at: chrono::Utc::now(),
            }])
            .await
            .unwrap();

        let hits = store.nearest(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity - 1.0).abs() < 1e-4);
    }
}
