//! Per-run collaborators built from resolved credentials

use std::fmt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::config::CredentialsConfig;
use crate::embeddings::build_embedder;
use crate::embeddings::Embedder;
use crate::errors::ResearchError;
use crate::llm::LanguageModel;
use crate::llm::OpenAiChatClient;
use crate::scrape::HttpFetcher;
use crate::scrape::PageFetcher;
use crate::search::GoogleSearchClient;
use crate::search::SearchProvider;
use crate::Result;

/// The three credentials a run needs, all present
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: String,
    pub google_api_key: String,
    pub google_cse_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("google_api_key", &mask(&self.google_api_key))
            .field("google_cse_id", &mask(&self.google_cse_id))
            .finish()
    }
}

/// `sk-1...wxyz` style masking; short values are fully hidden
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn pick(request: Option<&str>, server: Option<&str>) -> Option<String> {
    request
        .filter(|v| !v.trim().is_empty())
        .or_else(|| server.filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
}

impl Credentials {
    /// Merge request-supplied values over the server's, field by field.
    ///
    /// Any credential still missing afterwards is a validation error naming it.
    pub fn resolve(server: &CredentialsConfig, request: Option<&CredentialsConfig>) -> Result<Self> {
        let empty = CredentialsConfig::default();
        let request = request.unwrap_or(&empty);

        let merged = CredentialsConfig {
            openai_api_key: pick(request.openai_api_key.as_deref(), server.openai_api_key.as_deref()),
            google_api_key: pick(request.google_api_key.as_deref(), server.google_api_key.as_deref()),
            google_cse_id: pick(request.google_cse_id.as_deref(), server.google_cse_id.as_deref()),
        };

        match (merged.openai_api_key, merged.google_api_key, merged.google_cse_id) {
            (Some(openai_api_key), Some(google_api_key), Some(google_cse_id)) => Ok(Self {
                openai_api_key,
                google_api_key,
                google_cse_id,
            }),
            (openai, google, cse) => {
                let missing = CredentialsConfig {
                    openai_api_key: openai,
                    google_api_key: google,
                    google_cse_id: cse,
                }
                .missing();
                Err(ResearchError::Validation(format!(
                    "Missing required credentials: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Collaborators used by one run
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
}

pub trait ProviderFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<Providers>;
}

/// Google Custom Search, HTTP fetching, OpenAI chat and the configured embedder
pub struct HttpProviderFactory {
    config: Arc<AppConfig>,
}

impl HttpProviderFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, credentials: &Credentials) -> Result<Providers> {
        Ok(Providers {
            search: Arc::new(GoogleSearchClient::new(
                &self.config.search,
                credentials.google_api_key.clone(),
                credentials.google_cse_id.clone(),
            )?),
            fetcher: Arc::new(HttpFetcher::new(&self.config.scraper)?),
            model: Arc::new(OpenAiChatClient::new(
                &self.config.llm,
                credentials.openai_api_key.clone(),
            )?),
            embedder: build_embedder(&self.config.embeddings, Some(&credentials.openai_api_key))?,
        })
    }
}
