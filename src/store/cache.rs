//! TTL memoization of expensive calls (searches, page fetches)
//!
//! Values are stored as JSON under `{namespace}{function}:{sha256(args)}`.
//! The backend is chosen once at construction: Redis when it answers
//! `PING`, otherwise an in-process map for the lifetime of the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::RedisClient;
use crate::config::AppConfig;
use crate::config::CacheConfig;
use crate::Result;

/// Entry counts reported by a backend for one namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub estimated_size_bytes: usize,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn entry_stats(&self, prefix: &str) -> Result<EntryStats>;

    /// Remove every entry under `prefix`, returning the count removed
    async fn clear(&self, prefix: &str) -> Result<usize>;

    fn evictions(&self) -> u64 {
        0
    }
}

/// Cache entry with TTL support
#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: String, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-process backend with bounded size and lazy plus periodic expiry
#[derive(Clone)]
pub struct MemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: usize,
    evictions: Arc<AtomicU64>,
    expired_cleanups: Arc<AtomicU64>,
}

impl MemoryCacheBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
            evictions: Arc::new(AtomicU64::new(0)),
            expired_cleanups: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Drop expired entries, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_expired());
        let removed = before - cache.len();

        if removed > 0 {
            self.expired_cleanups
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Cleaned up {} expired cache entries", removed);
        }
        removed
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let backend = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                backend.cleanup_expired().await;
            }
        })
    }

    fn evict_some(&self, cache: &mut HashMap<String, CacheEntry>) {
        // Simple eviction: remove 10% of entries
        let evict_count = (cache.len() / 10).max(1);
        let keys_to_remove: Vec<String> = cache.keys().take(evict_count).cloned().collect();

        for key in keys_to_remove {
            cache.remove(&key);
        }

        self.evictions
            .fetch_add(evict_count as u64, Ordering::Relaxed);
        debug!("Evicted {} cache entries", evict_count);
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cache = self.entries.write().await;

        if let Some(entry) = cache.get(key) {
            if entry.is_expired() {
                cache.remove(key);
                self.expired_cleanups.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut cache = self.entries.write().await;

        if !cache.contains_key(key) && cache.len() >= self.max_entries {
            self.evict_some(&mut cache);
        }

        cache.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn entry_stats(&self, prefix: &str) -> Result<EntryStats> {
        let cache = self.entries.read().await;
        let mut stats = EntryStats::default();

        for (key, entry) in cache.iter().filter(|(k, _)| k.starts_with(prefix)) {
            stats.total += 1;
            if entry.is_expired() {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            stats.estimated_size_bytes += key.len() + entry.data.len();
        }
        Ok(stats)
    }

    async fn clear(&self, prefix: &str) -> Result<usize> {
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|k, _| !k.starts_with(prefix));
        Ok(before - cache.len())
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Redis backend; expiry is delegated to Redis
pub struct RedisCacheBackend {
    redis: RedisClient,
}

impl RedisCacheBackend {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.redis.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.redis.set_with_ttl(key, value, ttl).await
    }

    async fn entry_stats(&self, prefix: &str) -> Result<EntryStats> {
        let keys = self.redis.scan_prefix(prefix).await?;
        let mut stats = EntryStats {
            total: keys.len(),
            active: keys.len(),
            ..EntryStats::default()
        };
        for key in &keys {
            stats.estimated_size_bytes += key.len() + self.redis.strlen(key).await?;
        }
        Ok(stats)
    }

    async fn clear(&self, prefix: &str) -> Result<usize> {
        let keys = self.redis.scan_prefix(prefix).await?;
        self.redis.del(&keys).await
    }
}

/// Snapshot reported by `cache --stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub estimated_size_bytes: usize,
    pub expire_seconds: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            namespace: config.namespace.clone(),
            default_ttl: Duration::from_secs(config.expire_seconds),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new(config.max_entries)), config)
    }

    /// Probe Redis once; fall back to memory (with a cleanup task) when unreachable
    pub async fn connect(config: &AppConfig) -> Self {
        match RedisClient::connect(&config.redis) {
            Ok(redis) => match redis.ping().await {
                Ok(()) => {
                    info!("✅ Result cache using Redis at {}", redis.display_url());
                    return Self::new(Arc::new(RedisCacheBackend::new(redis)), &config.cache);
                }
                Err(e) => warn!("⚠️  Redis unavailable for caching: {}", e),
            },
            Err(e) => warn!("⚠️  Invalid Redis configuration for caching: {}", e),
        }

        info!("Falling back to in-memory result cache");
        let backend = MemoryCacheBackend::new(config.cache.max_entries);
        backend.start_cleanup_task(Duration::from_secs(config.cache.cleanup_interval_secs.max(1)));
        Self::new(Arc::new(backend), &config.cache)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn key_for<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> Result<String> {
        let encoded = serde_json::to_vec(args)?;
        let digest = Sha256::digest(&encoded);
        Ok(format!("{}{}:{}", self.namespace, function, hex::encode(digest)))
    }

    /// Return the cached value for `(function, args)` or compute and store it.
    ///
    /// Only `Ok` values are stored. Backend failures are logged and treated
    /// as a miss, so the cache can never fail a call that would otherwise work.
    pub async fn get_or_compute<T, A, F, Fut>(
        &self,
        function: &str,
        args: &A,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = match self.key_for(function, args) {
            Ok(key) => key,
            Err(e) => {
                warn!("Cache key for {} could not be built: {}", function, e);
                return compute().await;
            }
        };

        match self.backend.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for {}", function);
                    return Ok(value);
                }
                Err(e) => warn!("Discarding unreadable cache entry for {}: {}", function, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Cache read error for {}: {}", function, e),
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss for {}, executing", function);

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                let ttl = ttl.unwrap_or(self.default_ttl);
                if let Err(e) = self.backend.set(&key, &raw, ttl).await {
                    warn!("Cache write error for {}: {}", function, e);
                }
            }
            Err(e) => warn!("Result of {} is not cacheable: {}", function, e),
        }

        Ok(value)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.backend.entry_stats(&self.namespace).await?;
        Ok(CacheStats {
            backend: self.backend.name().to_string(),
            total: entries.total,
            active: entries.active,
            expired: entries.expired,
            estimated_size_bytes: entries.estimated_size_bytes,
            expire_seconds: self.default_ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.backend.evictions(),
        })
    }

    pub async fn clear(&self) -> Result<usize> {
        let removed = self.backend.clear(&self.namespace).await?;
        info!("Cleared {} cache entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::errors::ResearchError;

    fn cache_with(max_entries: usize) -> ResultCache {
        let config = CacheConfig {
            max_entries,
            ..CacheConfig::default()
        };
        ResultCache::in_memory(&config)
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = cache_with(100);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Vec<String> = cache
                .get_or_compute("search_images", &("rust", 5), None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["a".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["a".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.active, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache_with(100);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<String> = cache
                .get_or_compute("fetch", "https://example.com", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ResearchError::HttpError("timeout".into()))
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = cache_with(100);
        let calls = AtomicUsize::new(0);
        let ttl = Some(Duration::from_millis(20));

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ResearchError>(1u32)
        };
        cache.get_or_compute("f", &1, ttl, compute).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.get_or_compute("f", &1, ttl, compute).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_eviction_at_capacity() {
        let backend = MemoryCacheBackend::new(10);
        for i in 0..10 {
            backend
                .set(&format!("k{i}"), "v", Duration::from_secs(60))
                .await
                .unwrap();
        }
        backend.set("k10", "v", Duration::from_secs(60)).await.unwrap();

        let stats = backend.entry_stats("k").await.unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(backend.evictions(), 1);
        assert_eq!(backend.get("k10").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let backend = MemoryCacheBackend::new(10);
        backend.set("a", "1", Duration::from_millis(1)).await.unwrap();
        backend.set("b", "2", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(backend.cleanup_expired().await, 1);
        assert!(backend.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_key_depends_on_args() {
        let cache = cache_with(10);
        let a = cache.key_for("search", &("rust", 5)).unwrap();
        let b = cache.key_for("search", &("rust", 6)).unwrap();
        let c = cache.key_for("search", &("rust", 5)).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, c);
        assert!(a.starts_with("research:cache:search:"));
    }

    #[tokio::test]
    async fn test_clear_only_touches_namespace() {
        let backend = Arc::new(MemoryCacheBackend::new(10));
        backend.set("other:key", "x", Duration::from_secs(60)).await.unwrap();
        let cache = ResultCache::new(backend.clone(), &CacheConfig::default());

        cache
            .get_or_compute("f", &1, None, || async { Ok::<_, ResearchError>(1) })
            .await
            .unwrap();

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(backend.get("other:key").await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_backend_memoizes_under_namespace() {
        let redis = RedisClient::connect(&crate::config::RedisConfig {
            db: 15,
            ..crate::config::RedisConfig::default()
        })
        .unwrap();
        let config = CacheConfig {
            namespace: format!("test:{}:", uuid::Uuid::new_v4()),
            ..CacheConfig::default()
        };
        let cache = ResultCache::new(Arc::new(RedisCacheBackend::new(redis.clone())), &config);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Vec<String> = cache
                .get_or_compute("search_videos", &("rust", 5), Some(Duration::from_secs(60)), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["https://youtube.com/watch?v=1".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let key = cache.key_for("search_videos", &("rust", 5)).unwrap();
        let ttl = redis.ttl_secs(&key).await.unwrap().unwrap();
        assert!(ttl > 0 && ttl <= 60);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.backend, "redis");
        assert_eq!(stats.total, 1);

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(redis.get(&key).await.unwrap().is_none());
    }
}

