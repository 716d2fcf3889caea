//! Page fetching and text extraction
//!
//! Every attempted URL yields exactly one [`ScrapedContent`]; failures are
//! recorded with an error message instead of being dropped.

pub mod extract;

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::info;
use tracing::warn;

use crate::config::ScraperConfig;
use crate::errors::ResearchError;
use crate::models::ScrapedContent;
use crate::retry::RetryPolicy;
use crate::store::ResultCache;
use crate::Result;

const NO_TEXT_EXTRACTED: &str = "No text content extracted";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the page body as text
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Upstream {
                service: "Page fetch",
                status: status.as_u16(),
                message: format!("HTTP {status} for {url}"),
            });
        }

        Ok(response.text().await?)
    }
}

pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<ResultCache>,
    retry: RetryPolicy,
    max_concurrent: usize,
    cache_ttl: Duration,
}

impl Scraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<ResultCache>, config: &ScraperConfig) -> Self {
        Self {
            fetcher,
            cache,
            retry: RetryPolicy::from_millis(
                config.retry_attempts,
                config.retry_min_wait_ms,
                config.retry_max_wait_ms,
            ),
            max_concurrent: config.max_concurrent.max(1),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch and extract one page. Successful results are cached.
    pub async fn scrape_url(&self, url: &str) -> ScrapedContent {
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                warn!("Skipping invalid URL: {}", url);
                return ScrapedContent::failure(url, format!("Failed to download URL: invalid URL '{url}'"), 0);
            }
        }

        let attempts = AtomicU32::new(0);
        let outcome = self
            .cache
            .get_or_compute("scrape_url", url, Some(self.cache_ttl), || async {
                let html = self
                    .retry
                    .run(&format!("fetch {url}"), || {
                        attempts.fetch_add(1, Ordering::Relaxed);
                        self.fetcher.fetch(url)
                    })
                    .await?;

                let page = extract::extract(&html);
                if page.text.trim().is_empty() {
                    return Err(ResearchError::ScrapeError(NO_TEXT_EXTRACTED.to_string()));
                }
                Ok(ScrapedContent::success(
                    url,
                    page.title,
                    page.text,
                    attempts.load(Ordering::Relaxed),
                ))
            })
            .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match outcome {
            Ok(content) => {
                info!("✅ Scraped {} characters from {}", content.text.len(), url);
                content
            }
            Err(ResearchError::ScrapeError(message)) => {
                warn!("⚠️  {}: {}", url, message);
                ScrapedContent::failure(url, message, attempts)
            }
            Err(e) => {
                warn!("❌ Error scraping {}: {}", url, e);
                ScrapedContent::failure(url, format!("Failed to download URL: {e}"), attempts)
            }
        }
    }

    /// Scrape concurrently (bounded), returning results in input order
    pub async fn scrape_urls(&self, urls: &[String]) -> Vec<ScrapedContent> {
        info!("🕸️  Scraping {} URLs", urls.len());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let tasks = urls.iter().map(|url| {
            let semaphore = semaphore.clone();
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => self.scrape_url(url).await,
                    Err(e) => ScrapedContent::failure(url.as_str(), format!("Failed to download URL: {e}"), 0),
                }
            }
        });

        let results = join_all(tasks).await;
        let successful = results.iter().filter(|r| r.is_success()).count();
        info!("Successfully scraped {}/{} URLs", successful, urls.len());
        results
    }
}
