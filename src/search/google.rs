//! Google Custom Search JSON API client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::SearchItem;
use super::SearchProvider;
use super::SearchRequest;
use crate::config::SearchConfig;
use crate::errors::ResearchError;
use crate::Result;

/// The API rejects `num` above this
const MAX_RESULTS_PER_REQUEST: usize = 10;

pub struct GoogleSearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
}

impl GoogleSearchClient {
    pub fn new(config: &SearchConfig, api_key: String, cse_id: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            cse_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    display_link: Option<String>,
    image: Option<CseImage>,
    pagemap: Option<CsePagemap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseImage {
    thumbnail_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsePagemap {
    #[serde(default)]
    videoobject: Vec<CseVideoObject>,
}

#[derive(Debug, Deserialize)]
struct CseVideoObject {
    thumbnailurl: Option<String>,
}

impl From<CseItem> for SearchItem {
    fn from(item: CseItem) -> Self {
        let thumbnail = item
            .image
            .and_then(|i| i.thumbnail_link)
            .or_else(|| {
                item.pagemap
                    .and_then(|p| p.videoobject.into_iter().next())
                    .and_then(|v| v.thumbnailurl)
            })
            .filter(|t| !t.is_empty());

        SearchItem {
            title: item.title.unwrap_or_else(|| "No Title".to_string()),
            link: item.link.unwrap_or_default(),
            snippet: item.snippet.unwrap_or_else(|| "No Description".to_string()),
            display_link: item
                .display_link
                .unwrap_or_else(|| "Unknown Source".to_string()),
            thumbnail,
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchItem>> {
        let num = request.num.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();
        let mut params = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.cse_id.as_str()),
            ("q", request.query.as_str()),
            ("num", num.as_str()),
        ];
        if request.images {
            params.push(("searchType", "image"));
        }

        debug!("Google search: {} (num={}, images={})", request.query, num, request.images);

        let response = self.client.get(&self.endpoint).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Upstream {
                service: "Google Search",
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        let parsed: CseResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::SearchError(format!("Invalid search response: {e}")))?;

        Ok(parsed
            .items
            .into_iter()
            .map(SearchItem::from)
            .filter(|item| !item.link.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_item_thumbnail() {
        let json = r#"{
            "items": [{
                "title": "Rust in 100 seconds",
                "link": "https://www.youtube.com/watch?v=5C_HPTJg5ek",
                "snippet": "Learn Rust",
                "displayLink": "www.youtube.com",
                "pagemap": {"videoobject": [{"thumbnailurl": "https://i.ytimg.com/vi/x/hq.jpg"}]}
            }]
        }"#;
        let parsed: CseResponse = serde_json::from_str(json).unwrap();
        let item: SearchItem = parsed.items.into_iter().next().unwrap().into();

        assert_eq!(item.display_link, "www.youtube.com");
        assert_eq!(item.thumbnail.as_deref(), Some("https://i.ytimg.com/vi/x/hq.jpg"));
    }

    #[test]
    fn test_parse_image_item_and_defaults() {
        let json = r#"{
            "items": [{
                "link": "https://example.com/ferris.png",
                "image": {"thumbnailLink": "https://thumb.example.com/ferris.png"}
            }]
        }"#;
        let parsed: CseResponse = serde_json::from_str(json).unwrap();
        let item: SearchItem = parsed.items.into_iter().next().unwrap().into();

        assert_eq!(item.title, "No Title");
        assert_eq!(item.snippet, "No Description");
        assert_eq!(item.display_link, "Unknown Source");
        assert_eq!(
            item.thumbnail.as_deref(),
            Some("https://thumb.example.com/ferris.png")
        );
    }

    #[test]
    fn test_parse_response_without_items() {
        let parsed: CseResponse = serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(parsed.items.is_empty());
    }
}
