//! Web, news, image and video search
//!
//! [`SearchProvider`] is the raw request/response contract with the search
//! backend. [`SearchService`] shapes provider items into typed
//! [`SearchResult`]s, retries transient failures and memoizes media searches.

pub mod google;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

pub use google::GoogleSearchClient;

use crate::config::SearchConfig;
use crate::errors::ResearchError;
use crate::models::SearchResult;
use crate::models::SourceType;
use crate::retry::RetryPolicy;
use crate::store::ResultCache;
use crate::Result;

const NEWS_SITES: &str =
    "site:news.google.com OR site:reuters.com OR site:apnews.com OR site:bbc.com OR site:cnn.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub num: usize,
    /// Image search instead of page search
    pub images: bool,
}

/// One provider hit before it is typed by source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
    pub thumbnail: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchItem>>;
}

pub struct SearchService {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<ResultCache>,
    retry: RetryPolicy,
    media_ttl: Duration,
    default_num: usize,
}

impl SearchService {
    pub fn new(provider: Arc<dyn SearchProvider>, cache: Arc<ResultCache>, config: &SearchConfig) -> Self {
        Self {
            provider,
            cache,
            retry: RetryPolicy::from_millis(
                config.retry_attempts,
                config.retry_min_wait_ms,
                config.retry_max_wait_ms,
            ),
            media_ttl: Duration::from_secs(config.media_cache_ttl_secs),
            default_num: config.max_results,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch(&self, request: SearchRequest) -> Result<Vec<SearchItem>> {
        let what = format!("search '{}'", request.query);
        self.retry
            .run(&what, || self.provider.search(&request))
            .await
    }

    fn num(&self, num: Option<usize>) -> usize {
        num.unwrap_or(self.default_num).max(1)
    }

    pub async fn search_web(&self, query: &str, num: Option<usize>) -> Result<Vec<SearchResult>> {
        let items = self
            .fetch(SearchRequest {
                query: query.to_string(),
                num: self.num(num),
                images: false,
            })
            .await?;

        let results = shape(items, SourceType::Web);
        info!("🔎 Web search found {} results", results.len());
        Ok(results)
    }

    pub async fn search_news(&self, query: &str, num: Option<usize>) -> Result<Vec<SearchResult>> {
        let items = self
            .fetch(SearchRequest {
                query: format!("{query} {NEWS_SITES}"),
                num: self.num(num),
                images: false,
            })
            .await?;

        let results = shape(items, SourceType::News);
        info!("📰 Found {} news articles", results.len());
        Ok(results)
    }

    /// Memoized for the media TTL
    pub async fn search_images(&self, query: &str, num: Option<usize>) -> Result<Vec<SearchResult>> {
        let request = SearchRequest {
            query: query.to_string(),
            num: self.num(num),
            images: true,
        };

        let results = self
            .cache
            .get_or_compute("search_images", &request, Some(self.media_ttl), || async {
                let items = self.fetch(request.clone()).await?;
                Ok::<_, ResearchError>(shape(items, SourceType::Image))
            })
            .await?;

        info!("🖼️  Found {} images", results.len());
        Ok(results)
    }

    /// YouTube-only, memoized for the media TTL
    pub async fn search_videos(&self, query: &str, num: Option<usize>) -> Result<Vec<SearchResult>> {
        let request = SearchRequest {
            query: format!("{query} video site:youtube.com"),
            num: self.num(num),
            images: false,
        };

        let results = self
            .cache
            .get_or_compute("search_videos", &request, Some(self.media_ttl), || async {
                let items = self.fetch(request.clone()).await?;
                Ok::<_, ResearchError>(shape(
                    items
                        .into_iter()
                        .filter(|item| item.link.contains("youtube.com"))
                        .collect(),
                    SourceType::Video,
                ))
            })
            .await?;

        info!("🎬 Found {} videos", results.len());
        Ok(results)
    }

    pub async fn search(
        &self,
        query: &str,
        source: SourceType,
        num: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        match source {
            SourceType::Web => self.search_web(query, num).await,
            SourceType::News => self.search_news(query, num).await,
            SourceType::Image => self.search_images(query, num).await,
            SourceType::Video => self.search_videos(query, num).await,
        }
    }
}

fn shape(items: Vec<SearchItem>, source_type: SourceType) -> Vec<SearchResult> {
    items
        .into_iter()
        .map(|item| SearchResult {
            source_type,
            title: item.title,
            url: item.link,
            snippet: item.snippet,
            display_link: item.display_link,
            thumbnail: item.thumbnail,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use super::*;
    use crate::config::CacheConfig;

    #[derive(Default)]
    struct RecordingProvider {
        calls: AtomicUsize,
        queries: Mutex<Vec<SearchRequest>>,
        fail_first: usize,
    }

    #[async_trait]
    impl SearchProvider for RecordingProvider {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchItem>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(request.clone());
            if n < self.fail_first {
                return Err(ResearchError::Upstream {
                    service: "Google Search",
                    status: 503,
                    message: "busy".into(),
                });
            }
            Ok(vec![
                SearchItem {
                    title: "Video".into(),
                    link: "https://www.youtube.com/watch?v=1".into(),
                    snippet: "s".into(),
                    display_link: "www.youtube.com".into(),
                    thumbnail: None,
                },
                SearchItem {
                    title: "Blog".into(),
                    link: "https://blog.example.com/post".into(),
                    snippet: "s".into(),
                    display_link: "blog.example.com".into(),
                    thumbnail: None,
                },
            ])
        }
    }

    fn service(provider: Arc<RecordingProvider>) -> SearchService {
        SearchService::new(
            provider,
            Arc::new(ResultCache::in_memory(&CacheConfig::default())),
            &SearchConfig::default(),
        )
        .with_retry(RetryPolicy::from_millis(3, 1, 2))
    }

    #[tokio::test]
    async fn test_image_search_is_memoized() {
        let provider = Arc::new(RecordingProvider::default());
        let service = service(provider.clone());

        let first = service.search_images("ferris", None).await.unwrap();
        let second = service.search_images("ferris", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(first.iter().all(|r| r.source_type == SourceType::Image));
        assert!(provider.queries.lock().unwrap()[0].images);
    }

    #[tokio::test]
    async fn test_video_search_keeps_only_youtube() {
        let provider = Arc::new(RecordingProvider::default());
        let service = service(provider.clone());

        let videos = service.search_videos("rust", Some(5)).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].source_type, SourceType::Video);
        assert_eq!(
            provider.queries.lock().unwrap()[0].query,
            "rust video site:youtube.com"
        );
    }

    #[tokio::test]
    async fn test_news_query_restricts_sites() {
        let provider = Arc::new(RecordingProvider::default());
        let service = service(provider.clone());

        let news = service.search_news("election", Some(3)).await.unwrap();
        assert!(news.iter().all(|r| r.source_type == SourceType::News));

        let request = provider.queries.lock().unwrap()[0].clone();
        assert!(request.query.starts_with("election site:news.google.com"));
        assert_eq!(request.num, 3);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = Arc::new(RecordingProvider {
            fail_first: 2,
            ..RecordingProvider::default()
        });
        let service = service(provider.clone());

        let web = service.search_web("rust", None).await.unwrap();
        assert_eq!(web.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.queries.lock().unwrap()[0].num, 5);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces() {
        let provider = Arc::new(RecordingProvider {
            fail_first: 10,
            ..RecordingProvider::default()
        });
        let service = service(provider.clone());

        assert!(service.search_web("rust", None).await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }
}
