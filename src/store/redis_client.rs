use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::RedisConfig;
use crate::errors::ResearchError;

/// Thin async wrapper over a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    url: String,
    connect_timeout: Duration,
}

impl RedisClient {
    pub fn connect(config: &RedisConfig) -> crate::Result<Self> {
        let url = config.url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| ResearchError::StorageError(format!("Redis open error: {e}")))?;

        Ok(Self {
            client,
            url,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }

    /// URL with the password masked, for logs
    pub fn display_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("****"));
                parsed.to_string()
            }
            _ => self.url.clone(),
        }
    }

    async fn conn(&self) -> crate::Result<MultiplexedConnection> {
        tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| {
            ResearchError::StorageError(format!(
                "Redis connect timed out after {:?}",
                self.connect_timeout
            ))
        })?
        .map_err(|e| ResearchError::StorageError(format!("Redis connect error: {e}")))
    }

    /// Connectivity probe
    pub async fn ping(&self) -> crate::Result<()> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(ResearchError::StorageError(format!(
                "Unexpected PING reply: {pong}"
            )))
        }
    }

    pub async fn get(&self, key: &str) -> crate::Result<Option<String>> {
        let mut conn = self.conn().await?;
        let val: Option<String> = conn.get(key).await?;
        Ok(val)
    }

    pub async fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> crate::Result<()> {
        let mut conn = self.conn().await?;
        redis::pipe()
            .set(key, value)
            .ignore()
            .expire(key, ttl.as_secs().max(1) as i64)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| ResearchError::StorageError(format!("Redis SET/EXPIRE error: {e}")))?;
        Ok(())
    }

    /// Delete keys, returning how many existed
    pub async fn del(&self, keys: &[String]) -> crate::Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }

    pub async fn ttl_secs(&self, key: &str) -> crate::Result<Option<i64>> {
        let mut conn = self.conn().await?;
        let ttl: i64 = conn.ttl(key).await?;
        if ttl < 0 {
            Ok(None)
        } else {
            Ok(Some(ttl))
        }
    }

    pub async fn strlen(&self, key: &str) -> crate::Result<usize> {
        let mut conn = self.conn().await?;
        let len: usize = conn.strlen(key).await?;
        Ok(len)
    }

    pub async fn zadd(&self, set: &str, member: &str, score: f64) -> crate::Result<()> {
        let mut conn = self.conn().await?;
        conn.zadd::<_, _, _, ()>(set, member, score).await?;
        Ok(())
    }

    pub async fn zrem(&self, set: &str, member: &str) -> crate::Result<()> {
        let mut conn = self.conn().await?;
        conn.zrem::<_, _, ()>(set, member).await?;
        Ok(())
    }

    /// Members from highest to lowest score
    pub async fn zrevrange_all(&self, set: &str) -> crate::Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.zrevrange(set, 0, -1).await?;
        Ok(members)
    }

    /// All keys starting with `prefix`, via incremental SCAN
    pub async fn scan_prefix(&self, prefix: &str) -> crate::Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let pattern = format!("{prefix}*");
        let mut iter = conn.scan_match::<_, String>(pattern).await?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}
