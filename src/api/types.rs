//! API request and response types

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::config::CredentialsConfig;
use crate::models::JobStatus;
use crate::models::ResearchOptions;

fn default_true() -> bool {
    true
}

/// `POST /research` body
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default = "default_true")]
    pub include_images: bool,
    #[serde(default = "default_true")]
    pub include_videos: bool,
    #[serde(default = "default_true")]
    pub include_news: bool,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub google_cse_id: Option<String>,
}

impl ResearchRequest {
    pub fn options(&self) -> ResearchOptions {
        ResearchOptions {
            include_images: self.include_images,
            include_videos: self.include_videos,
            include_news: self.include_news,
            max_results: self.max_results,
        }
    }

    pub fn credentials(&self) -> CredentialsConfig {
        CredentialsConfig {
            openai_api_key: self.openai_api_key.clone(),
            google_api_key: self.google_api_key.clone(),
            google_cse_id: self.google_cse_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStoreHealth {
    pub backend: String,
    pub connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub job_store: JobStoreHealth,
    pub cache_backend: String,
}

/// `GET /jobs` query string
#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub status: Option<String>,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body shared by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_request_defaults() {
        let request: ResearchRequest = serde_json::from_str(r#"{"query": "solar power"}"#).unwrap();
        assert_eq!(request.options(), ResearchOptions::default());
        assert!(request.credentials().openai_api_key.is_none());
    }

    #[test]
    fn test_research_request_flags_and_keys() {
        let request: ResearchRequest = serde_json::from_str(
            r#"{"query": "q", "include_images": false, "max_results": 3, "google_cse_id": "cse"}"#,
        )
        .unwrap();
        let options = request.options();
        assert!(!options.include_images);
        assert!(options.include_videos);
        assert_eq!(options.max_results, Some(3));
        assert_eq!(request.credentials().google_cse_id.as_deref(), Some("cse"));
    }

    #[test]
    fn test_jobs_query_default_limit() {
        let query: JobsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 10);
        assert!(query.status.is_none());
    }
}
