//! Analysis tasks backed by a language model
//!
//! Each task renders its prompt, calls the model, and parses the free-text
//! reply. Parsers are pure functions so the reply formats can be tested
//! without a model.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use super::prompts::ResearchPrompts;
use super::LanguageModel;
use crate::errors::ResearchError;
use crate::models::EntityKind;
use crate::models::SearchResult;
use crate::models::SentimentLabel;
use crate::models::Topic;
use crate::Result;

const SUMMARY_MAX_WORDS: usize = 500;
const SUMMARY_INPUT_CHARS: usize = 10_000;
const ENTITY_INPUT_CHARS: usize = 8_000;
const SENTIMENT_INPUT_CHARS: usize = 5_000;
const TOPIC_INPUT_CHARS: usize = 8_000;
const QUERY_INPUT_CHARS: usize = 5_000;

const MAX_TOPIC_KEYWORDS: usize = 5;
/// Confidence assigned to entities named by the model
pub const LLM_ENTITY_CONFIDENCE: f64 = 0.8;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?").unwrap_or_else(|e| panic!("invalid number regex: {e}"))
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]+|\d+[.)])\s*").unwrap_or_else(|e| panic!("invalid list regex: {e}"))
});

/// Sentiment as reported by the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LlmSentiment {
    pub label: SentimentLabel,
    pub polarity: f64,
    pub confidence: f64,
}

pub struct LlmAnalyst {
    model: Arc<dyn LanguageModel>,
}

impl LlmAnalyst {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub async fn summarize(&self, text: &str) -> Result<String> {
        info!("Generating summary");
        let values = HashMap::from([
            ("max_length", SUMMARY_MAX_WORDS.to_string()),
            ("text", truncate_with_ellipsis(text, SUMMARY_INPUT_CHARS)),
        ]);
        let reply = self.model.chat(&ResearchPrompts::summary().messages(&values)).await?;

        let summary = reply.trim();
        if summary.is_empty() {
            return Err(ResearchError::LlmError("Empty summary".to_string()));
        }
        info!("Generated summary of {} characters", summary.len());
        Ok(summary.to_string())
    }

    pub async fn extract_entities(&self, text: &str) -> Result<Vec<(String, EntityKind)>> {
        let values = HashMap::from([("text", truncate_with_ellipsis(text, ENTITY_INPUT_CHARS))]);
        let reply = self.model.chat(&ResearchPrompts::entities().messages(&values)).await?;

        let entities = parse_entities(&reply);
        info!("Extracted {} entities with LLM", entities.len());
        Ok(entities)
    }

    pub async fn analyze_sentiment(&self, text: &str) -> Result<LlmSentiment> {
        let values = HashMap::from([("text", truncate_with_ellipsis(text, SENTIMENT_INPUT_CHARS))]);
        let reply = self.model.chat(&ResearchPrompts::sentiment().messages(&values)).await?;

        parse_sentiment(&reply).ok_or_else(|| {
            ResearchError::LlmError(format!("Unparseable sentiment reply: {}", reply.trim()))
        })
    }

    pub async fn extract_topics(&self, text: &str, num_topics: usize) -> Result<Vec<Topic>> {
        let values = HashMap::from([
            ("num_topics", num_topics.to_string()),
            ("text", truncate_with_ellipsis(text, TOPIC_INPUT_CHARS)),
        ]);
        let reply = self.model.chat(&ResearchPrompts::topics().messages(&values)).await?;

        let topics = parse_topics(&reply, num_topics);
        if topics.is_empty() {
            return Err(ResearchError::LlmError("No topics in reply".to_string()));
        }
        Ok(topics)
    }

    pub async fn related_queries(&self, text: &str, num_queries: usize) -> Result<Vec<String>> {
        let values = HashMap::from([
            ("num_queries", num_queries.to_string()),
            ("text", truncate_with_ellipsis(text, QUERY_INPUT_CHARS)),
        ]);
        let reply = self
            .model
            .chat(&ResearchPrompts::related_queries().messages(&values))
            .await?;

        Ok(parse_related_queries(&reply, num_queries))
    }

    /// Credibility score in [0, 1] for one search result
    pub async fn assess_credibility(&self, result: &SearchResult) -> Result<f64> {
        let values = HashMap::from([
            ("title", result.title.clone()),
            ("snippet", result.snippet.clone()),
            ("source", result.display_link.clone()),
            ("url", result.url.clone()),
        ]);
        let reply = self
            .model
            .chat(&ResearchPrompts::credibility().messages(&values))
            .await?;

        parse_credibility_score(&reply).ok_or_else(|| {
            ResearchError::LlmError(format!("Non-numeric credibility reply: {}", reply.trim()))
        })
    }
}

/// First `max_chars` characters, with `...` appended when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn strip_list_marker(line: &str) -> &str {
    let stripped = match LIST_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    stripped.trim().trim_matches('*').trim()
}

/// `Name | Type` lines
pub fn parse_entities(reply: &str) -> Vec<(String, EntityKind)> {
    reply
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('|');
            let name = strip_list_marker(parts.next()?);
            let kind = parts.next()?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), EntityKind::parse(kind)))
        })
        .collect()
}

/// `SENTIMENT | POLARITY | CONFIDENCE`, numbers clamped to their ranges
pub fn parse_sentiment(reply: &str) -> Option<LlmSentiment> {
    reply.lines().find_map(|line| {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let polarity = finite(parts[1])?.clamp(-1.0, 1.0);
        let confidence = finite(parts[2])?.clamp(0.0, 1.0);
        let label = SentimentLabel::parse(strip_list_marker(parts[0]))
            .unwrap_or_else(|| SentimentLabel::from_polarity(polarity));

        Some(LlmSentiment {
            label,
            polarity,
            confidence,
        })
    })
}

fn finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `Topic Name | kw, kw, kw` lines; weight decreases by 0.15 per rank, floored at 0.1
pub fn parse_topics(reply: &str, max_topics: usize) -> Vec<Topic> {
    reply
        .lines()
        .filter_map(|line| {
            let (label, keywords) = line.split_once('|')?;
            let label = strip_list_marker(label);
            if label.is_empty() {
                return None;
            }
            let keywords: Vec<String> = keywords
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .take(MAX_TOPIC_KEYWORDS)
                .collect();
            Some((label.to_string(), keywords))
        })
        .take(max_topics)
        .enumerate()
        .map(|(i, (label, keywords))| Topic {
            id: i,
            label,
            keywords,
            weight: topic_weight(i),
        })
        .collect()
}

pub fn topic_weight(rank: usize) -> f64 {
    (1.0 - rank as f64 * 0.15).max(0.1)
}

/// One query per line; bullets and numbering stripped, short lines dropped
pub fn parse_related_queries(reply: &str, max_queries: usize) -> Vec<String> {
    reply
        .lines()
        .map(strip_list_marker)
        .filter(|q| q.chars().count() > 3)
        .take(max_queries)
        .map(str::to_string)
        .collect()
}

/// First number in the reply, clamped to [0, 1]
pub fn parse_credibility_score(reply: &str) -> Option<f64> {
    let number = NUMBER.find(reply)?;
    let score = number.as_str().parse::<f64>().ok()?;
    if score.is_finite() {
        Some(score.clamp(0.0, 1.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::ChatMessage;
    use crate::models::SourceType;

    /// Replies with a fixed text and records the prompts it saw
    struct CannedModel {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("héllo", 10), "héllo");
        assert_eq!(truncate_with_ellipsis("héllo", 2), "hé...");
    }

    #[test]
    fn test_parse_entities() {
        let reply = "- OpenAI | ORGANIZATION\n* Sam Altman | person\n1. San Francisco | GPE\nno pipe here\n | PERSON";
        let entities = parse_entities(reply);
        assert_eq!(
            entities,
            vec![
                ("OpenAI".to_string(), EntityKind::Organization),
                ("Sam Altman".to_string(), EntityKind::Person),
                ("San Francisco".to_string(), EntityKind::Location),
            ]
        );
    }

    #[test]
    fn test_parse_sentiment_clamps() {
        let s = parse_sentiment("positive | 1.7 | 3").unwrap();
        assert_eq!(s.label, SentimentLabel::Positive);
        assert_eq!(s.polarity, 1.0);
        assert_eq!(s.confidence, 1.0);

        let s = parse_sentiment("Sentiment:\nmixed | -0.4 | 0.6").unwrap();
        assert_eq!(s.label, SentimentLabel::Negative);

        assert!(parse_sentiment("positive").is_none());
        assert!(parse_sentiment("positive | high | 0.9").is_none());
    }

    #[test]
    fn test_parse_sentiment_rejects_non_finite_numbers() {
        assert!(parse_sentiment("positive | NaN | 0.9").is_none());
        assert!(parse_sentiment("negative | -0.5 | inf").is_none());
        assert!(parse_sentiment("neutral | -infinity | 0.5").is_none());

        // A later well-formed line still counts
        let s = parse_sentiment("positive | NaN | 0.9\npositive | 0.4 | 0.7").unwrap();
        assert_eq!(s.polarity, 0.4);
        assert_eq!(s.confidence, 0.7);
    }

    #[test]
    fn test_parse_topics_weights_and_keywords() {
        let reply = "1. AI Safety | alignment, risk, policy, research, labs, funding\n\
                     2. Hardware | gpus, chips\n\
                     garbage\n\
                     Markets | stocks";
        let topics = parse_topics(reply, 2);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].label, "AI Safety");
        assert_eq!(topics[0].keywords.len(), 5);
        assert_eq!(topics[0].weight, 1.0);
        assert!((topics[1].weight - 0.85).abs() < 1e-9);
        assert_eq!(topics[1].id, 1);
    }

    #[test]
    fn test_topic_weight_floor() {
        assert!((topic_weight(6) - 0.1).abs() < 1e-9);
        assert!((topic_weight(20) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_related_queries() {
        let reply = "- rust async runtimes\n* tokio vs async-std\n1. why\n\n2) rust embedded\nmore\nsixth query here\nseventh query";
        let queries = parse_related_queries(reply, 5);
        assert_eq!(
            queries,
            vec![
                "rust async runtimes",
                "tokio vs async-std",
                "rust embedded",
                "more",
                "sixth query here",
            ]
        );
    }

    #[test]
    fn test_parse_credibility_score() {
        assert_eq!(parse_credibility_score("0.85"), Some(0.85));
        assert_eq!(parse_credibility_score("Score: 7.5"), Some(1.0));
        assert_eq!(parse_credibility_score("-2"), Some(0.0));
        assert_eq!(parse_credibility_score("very credible"), None);
        assert_eq!(parse_credibility_score("NaN"), None);
    }

    #[tokio::test]
    async fn test_summarize_renders_prompt() {
        let model = CannedModel::new("  A concise summary.  ");
        let analyst = LlmAnalyst::new(model.clone());

        let summary = analyst.summarize("Some long text").await.unwrap();
        assert_eq!(summary, "A concise summary.");

        let seen = model.seen.lock().unwrap();
        assert!(seen[0][1].content.contains("approximately 500 words"));
        assert!(seen[0][1].content.ends_with("Some long text"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_an_error() {
        let analyst = LlmAnalyst::new(CannedModel::new("   "));
        assert!(analyst.summarize("text").await.is_err());
    }

    #[tokio::test]
    async fn test_credibility_garbage_is_an_error() {
        let analyst = LlmAnalyst::new(CannedModel::new("I cannot say"));
        let result = SearchResult {
            source_type: SourceType::Web,
            title: "t".into(),
            url: "https://a.com".into(),
            snippet: "s".into(),
            display_link: "a.com".into(),
            thumbnail: None,
        };
        assert!(analyst.assess_credibility(&result).await.is_err());
    }
}
