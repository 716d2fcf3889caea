//! Shared state stores: the result cache and job records, Redis-backed when available

pub mod cache;
pub mod jobs;
pub mod redis_client;

pub use cache::CacheBackend;
pub use cache::CacheStats;
pub use cache::MemoryCacheBackend;
pub use cache::ResultCache;
pub use jobs::JobBackend;
pub use jobs::JobStore;
pub use jobs::MemoryJobBackend;
pub use redis_client::RedisClient;
