//! In-process fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use content_research::config::AppConfig;
use content_research::config::CredentialsConfig;
use content_research::embeddings::HashingEmbedder;
use content_research::llm::ChatMessage;
use content_research::llm::LanguageModel;
use content_research::pipeline::Credentials;
use content_research::pipeline::ProviderFactory;
use content_research::pipeline::Providers;
use content_research::pipeline::ResearchPipeline;
use content_research::scrape::PageFetcher;
use content_research::search::SearchItem;
use content_research::search::SearchProvider;
use content_research::search::SearchRequest;
use content_research::store::ResultCache;
use content_research::vector_store::DocumentIndex;
use content_research::vector_store::LocalVectorStore;
use content_research::ResearchError;
use content_research::Result;

pub fn item(link: &str, title: &str) -> SearchItem {
    SearchItem {
        title: title.to_string(),
        link: link.to_string(),
        snippet: format!("Snippet for {title}"),
        display_link: url::Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default(),
        thumbnail: None,
    }
}

/// Canned hits per source, recognised from the request the service builds
#[derive(Default)]
pub struct FakeSearch {
    pub web: Vec<SearchItem>,
    pub news: Vec<SearchItem>,
    pub images: Vec<SearchItem>,
    pub videos: Vec<SearchItem>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchItem>> {
        self.requests.lock().unwrap().push(request.clone());
        let items = if request.images {
            &self.images
        } else if request.query.contains("site:youtube.com") {
            &self.videos
        } else if request.query.contains("site:reuters.com") {
            &self.news
        } else {
            &self.web
        };
        Ok(items.clone())
    }
}

/// Serves pages from memory; unknown URLs fail with a non-retryable 404
#[derive(Default)]
pub struct FakeFetcher {
    pub pages: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, title: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            format!("<html><head><title>{title}</title></head><body><article><p>{body}</p></article></body></html>"),
        );
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| ResearchError::Upstream {
            service: "fetch",
            status: 404,
            message: format!("{url} not found"),
        })
    }
}

/// Answers each analysis task by recognising its system prompt
pub struct FakeModel {
    pub credibility_reply: String,
}

impl FakeModel {
    pub fn new(credibility_reply: &str) -> Self {
        Self {
            credibility_reply: credibility_reply.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let system = &messages[0].content;
        let reply = if system.contains("summaries") {
            "Solar storage capacity is expanding quickly.".to_string()
        } else if system.contains("named entity") {
            "Tesla | ORG\nCalifornia | GPE".to_string()
        } else if system.contains("sentiment") {
            "positive | 0.5 | 0.8".to_string()
        } else if system.contains("topic") {
            "Energy Storage | battery, grid, solar".to_string()
        } else if system.contains("search queries") {
            "- battery storage costs\n- grid scale solar".to_string()
        } else {
            self.credibility_reply.clone()
        };
        Ok(reply)
    }
}

pub struct FakeFactory {
    pub providers: Providers,
}

impl ProviderFactory for FakeFactory {
    fn build(&self, _credentials: &Credentials) -> Result<Providers> {
        Ok(self.providers.clone())
    }
}

pub fn providers(search: Arc<FakeSearch>, fetcher: FakeFetcher, model: FakeModel) -> Providers {
    Providers {
        search,
        fetcher: Arc::new(fetcher),
        model: Arc::new(model),
        embedder: Arc::new(HashingEmbedder::new(64)),
    }
}

/// Config rooted in a temp dir, with server credentials present
pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.credentials = CredentialsConfig {
        openai_api_key: Some("sk-test".into()),
        google_api_key: Some("google-test".into()),
        google_cse_id: Some("cse-test".into()),
    };
    config.api.reports_dir = root.join("reports").to_string_lossy().into_owned();
    config.vector_store.persist_directory = root.join("vectors").to_string_lossy().into_owned();
    config.search.max_results = 5;
    config
}

pub async fn build_pipeline(config: AppConfig, providers: Providers) -> ResearchPipeline {
    let config = Arc::new(config);
    let cache = Arc::new(ResultCache::in_memory(&config.cache));
    let store = LocalVectorStore::open(
        &config.vector_store.persist_directory,
        &config.vector_store.collection,
    )
    .await
    .unwrap();
    let documents = Arc::new(DocumentIndex::new(Arc::new(store), &config.vector_store));
    ResearchPipeline::new(config, cache, documents, Arc::new(FakeFactory { providers }))
}

pub const SOLAR_TEXT: &str = "Tesla expanded its battery storage business in California during 2023. \
    Grid operators in California report that battery storage now smooths solar output every evening. \
    Analysts expect Tesla and other suppliers to keep growing as solar adoption rises.";
