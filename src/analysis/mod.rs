//! Content analysis: LLM tasks merged with local NLP
//!
//! [`AnalysisProcessor::analyze`] always produces an [`AnalysisResult`]. Each
//! language-model task has a local fallback, so a failing model degrades the
//! result instead of failing the run.

pub mod nlp;
pub mod relationships;
pub mod timeline;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream;
use futures::StreamExt;
use tracing::info;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::llm::LanguageModel;
use crate::llm::LlmAnalyst;
use crate::llm::analyst::LLM_ENTITY_CONFIDENCE;
use crate::models::AnalysisResult;
use crate::models::Entity;
use crate::models::EntityKind;
use crate::models::EntityOrigin;
use crate::models::ScrapedContent;
use crate::models::SearchResult;
use crate::models::Sentiment;
use crate::models::SentimentMethod;
use crate::models::SUMMARY_UNAVAILABLE;

/// Documents with no more text than this are ignored
const MIN_DOCUMENT_CHARS: usize = 50;
pub const NEUTRAL_CREDIBILITY: f64 = 0.5;

pub struct AnalysisProcessor {
    analyst: LlmAnalyst,
    config: AnalysisConfig,
}

impl AnalysisProcessor {
    pub fn new(model: Arc<dyn LanguageModel>, config: AnalysisConfig) -> Self {
        Self {
            analyst: LlmAnalyst::new(model),
            config,
        }
    }

    /// Documents that contribute text, and their texts joined and truncated
    pub fn combine_texts<'a>(&self, documents: &'a [ScrapedContent]) -> (Vec<&'a ScrapedContent>, String) {
        let contributing: Vec<&ScrapedContent> = documents
            .iter()
            .filter(|d| d.is_success() && d.text.trim().chars().count() > MIN_DOCUMENT_CHARS)
            .collect();

        let combined = contributing
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let combined = match combined.char_indices().nth(self.config.max_text_length) {
            Some((idx, _)) => combined[..idx].to_string(),
            None => combined,
        };

        (contributing, combined)
    }

    pub async fn analyze(&self, query: &str, documents: &[ScrapedContent]) -> AnalysisResult {
        info!("🔬 Starting analysis for query: {}", query);

        let (contributing, combined) = self.combine_texts(documents);
        if combined.trim().chars().count() < self.config.min_text_length {
            warn!("Insufficient text content for analysis");
            return AnalysisResult::empty(query);
        }

        let (summary, llm_entities, llm_sentiment, llm_topics, llm_queries) = tokio::join!(
            self.analyst.summarize(&combined),
            self.analyst.extract_entities(&combined),
            self.analyst.analyze_sentiment(&combined),
            self.analyst.extract_topics(&combined, self.config.max_topics),
            self.analyst.related_queries(&combined, self.config.max_related_queries),
        );

        let (summary, summary_available) = match summary {
            Ok(summary) => (summary, true),
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                (SUMMARY_UNAVAILABLE.to_string(), false)
            }
        };

        let local_entities = nlp::extract_entities(&combined);
        let entities = match llm_entities {
            Ok(llm) => merge_entities(llm, local_entities, &combined),
            Err(e) => {
                warn!("LLM entity extraction failed, using local entities only: {}", e);
                merge_entities(Vec::new(), local_entities, &combined)
            }
        };

        let lexicon = nlp::lexicon_sentiment(&combined);
        let sentiment = match llm_sentiment {
            Ok(llm) => Sentiment {
                label: llm.label,
                polarity: llm.polarity,
                subjectivity: lexicon.subjectivity,
                confidence: llm.confidence,
                method: SentimentMethod::Llm,
            },
            Err(e) => {
                warn!("LLM sentiment failed, using lexicon: {}", e);
                lexicon
            }
        };

        let topics = match llm_topics {
            Ok(topics) => topics,
            Err(e) => {
                warn!("LLM topic extraction failed, using keyword topics: {}", e);
                nlp::keyword_topics(&combined, self.config.max_topics)
            }
        };

        let related_queries = match llm_queries {
            Ok(queries) => queries,
            Err(e) => {
                warn!("Related query generation failed: {}", e);
                Vec::new()
            }
        };

        let contributing_docs: Vec<ScrapedContent> = contributing.iter().map(|d| (*d).clone()).collect();
        let timeline = timeline::extract_timeline(&contributing_docs);
        let relationships = relationships::extract_relationships(&entities, &combined);

        info!(
            "✅ Analysis completed: {} entities, {} topics, {} timeline events",
            entities.len(),
            topics.len(),
            timeline.len()
        );

        AnalysisResult {
            query: query.to_string(),
            summary,
            summary_available,
            entities,
            sentiment,
            topics,
            timeline,
            relationships,
            related_queries,
            credibility: BTreeMap::new(),
            sources: contributing.iter().map(|d| d.url.clone()).collect(),
            analyzed_at: Utc::now(),
        }
    }

    /// Score each distinct URL once; failures and unparseable replies score 0.5
    pub async fn credibility(&self, results: &[SearchResult]) -> BTreeMap<String, f64> {
        let mut seen = HashSet::new();
        let distinct: Vec<&SearchResult> = results.iter().filter(|r| seen.insert(r.url.as_str())).collect();
        if distinct.is_empty() {
            return BTreeMap::new();
        }

        info!("Assessing credibility of {} sources", distinct.len());

        let assessments: Vec<_> = distinct
            .into_iter()
            .map(|result| async move {
                let score = match self.analyst.assess_credibility(result).await {
                    Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
                    Ok(_) => NEUTRAL_CREDIBILITY,
                    Err(e) => {
                        warn!("Credibility assessment failed for {}: {}", result.url, e);
                        NEUTRAL_CREDIBILITY
                    }
                };
                (result.url.clone(), score)
            })
            .collect();

        stream::iter(assessments)
            .buffer_unordered(self.config.credibility_concurrency.max(1))
            .collect()
            .await
    }
}

/// Trimmed, lowercased, whitespace-collapsed
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Coalesce model and local entities by normalized name.
///
/// The model's spelling and kind win on conflict and the origin becomes
/// `both`. Mentions are recounted in `text` (at least one) and the list is
/// ordered by mentions, most first.
pub fn merge_entities(llm: Vec<(String, EntityKind)>, local: Vec<Entity>, text: &str) -> Vec<Entity> {
    let mut merged: Vec<Entity> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (name, kind) in llm {
        let key = normalize_name(&name);
        if key.is_empty() || index.contains_key(&key) {
            continue;
        }
        index.insert(key, merged.len());
        merged.push(Entity {
            name: name.trim().to_string(),
            kind,
            mentions: 0,
            confidence: LLM_ENTITY_CONFIDENCE,
            origin: EntityOrigin::Llm,
        });
    }

    for entity in local {
        let key = normalize_name(&entity.name);
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                if existing.origin == EntityOrigin::Llm {
                    existing.origin = EntityOrigin::Both;
                }
                existing.confidence = existing.confidence.max(entity.confidence);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(entity);
            }
        }
    }

    let haystack = text.to_lowercase();
    for entity in &mut merged {
        let needle = normalize_name(&entity.name);
        entity.mentions = haystack.matches(needle.as_str()).count().max(1);
    }

    merged.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::ResearchError;
    use crate::llm::ChatMessage;
    use crate::models::SentimentLabel;
    use crate::models::SourceType;
    use crate::models::INSUFFICIENT_DATA_SUMMARY;
    use crate::Result;

    /// Answers each task by recognising its system prompt
    struct TaskModel {
        fail: bool,
        credibility_reply: String,
        calls: AtomicUsize,
    }

    impl TaskModel {
        fn working(credibility_reply: &str) -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                credibility_reply: credibility_reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                credibility_reply: String::new(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for TaskModel {
        fn model_name(&self) -> &str {
            "task-model"
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ResearchError::Upstream {
                    service: "OpenAI",
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            let system = &messages[0].content;
            let reply = if system.contains("summaries") {
                "Rust keeps growing.".to_string()
            } else if system.contains("named entity") {
                "rust foundation | ORG\nMozilla | ORGANIZATION".to_string()
            } else if system.contains("sentiment") {
                "positive | 0.6 | 0.9".to_string()
            } else if system.contains("topic") {
                "Languages | rust, memory".to_string()
            } else if system.contains("search queries") {
                "- rust adoption\n- rust jobs".to_string()
            } else {
                self.credibility_reply.clone()
            };
            Ok(reply)
        }
    }

    fn article(url: &str, text: &str) -> ScrapedContent {
        ScrapedContent::success(url, None, text.to_string(), 1)
    }

    fn sample_documents() -> Vec<ScrapedContent> {
        vec![
            article(
                "https://a.com",
                "The Rust Foundation was formed on February 8, 2021 with Mozilla as a founding member. \
                 Rust Foundation members include several large companies and it is a great success.",
            ),
            article("https://short.com", "Too short to matter."),
            ScrapedContent::failure("https://down.com", "Failed to download URL: timeout", 3),
        ]
    }

    fn search_result(url: &str) -> SearchResult {
        SearchResult {
            source_type: SourceType::Web,
            title: "title".into(),
            url: url.into(),
            snippet: "snippet".into(),
            display_link: "example.com".into(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_analyze_with_working_model() {
        let processor = AnalysisProcessor::new(TaskModel::working("0.9"), AnalysisConfig::default());
        let result = processor.analyze("rust", &sample_documents()).await;

        assert!(result.summary_available);
        assert_eq!(result.summary, "Rust keeps growing.");
        assert_eq!(result.sources, vec!["https://a.com"]);
        assert_eq!(result.sentiment.method, SentimentMethod::Llm);
        assert_eq!(result.sentiment.label, SentimentLabel::Positive);
        assert_eq!(result.topics[0].label, "Languages");
        assert_eq!(result.related_queries, vec!["rust adoption", "rust jobs"]);
        assert_eq!(result.timeline.len(), 1);
        assert_eq!(result.timeline[0].source, "https://a.com");

        let foundation = result.entities.iter().find(|e| normalize_name(&e.name) == "rust foundation").unwrap();
        assert_eq!(foundation.kind, EntityKind::Organization);
        assert_eq!(foundation.origin, EntityOrigin::Both);
        assert_eq!(foundation.mentions, 2);
        assert!(result
            .relationships
            .iter()
            .any(|r| normalize_name(&r.source) == "rust foundation" && r.target == "Mozilla"));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_when_model_fails() {
        let processor = AnalysisProcessor::new(TaskModel::failing(), AnalysisConfig::default());
        let result = processor.analyze("rust", &sample_documents()).await;

        assert!(!result.summary_available);
        assert_eq!(result.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(result.sentiment.method, SentimentMethod::Lexicon);
        assert!(!result.topics.is_empty());
        assert!(result.related_queries.is_empty());
        assert!(result.entities.iter().all(|e| e.origin == EntityOrigin::Local));
        assert!(!result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_text_yields_empty_result() {
        let model = TaskModel::working("0.9");
        let processor = AnalysisProcessor::new(model.clone(), AnalysisConfig::default());
        let result = processor.analyze("rust", &[article("https://a.com", "tiny")]).await;

        assert_eq!(result.summary, INSUFFICIENT_DATA_SUMMARY);
        assert!(result.entities.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_combine_texts_truncates() {
        let config = AnalysisConfig {
            max_text_length: 120,
            ..AnalysisConfig::default()
        };
        let processor = AnalysisProcessor::new(TaskModel::working("0.5"), config);
        let docs = vec![article("https://a.com", &"a".repeat(100)), article("https://b.com", &"b".repeat(100))];

        let (contributing, combined) = processor.combine_texts(&docs);
        assert_eq!(contributing.len(), 2);
        assert_eq!(combined.chars().count(), 120);
        assert!(combined.starts_with(&"a".repeat(100)));
    }

    #[tokio::test]
    async fn test_credibility_is_clamped_and_deduplicated() {
        let model = TaskModel::working("Score: 1.7");
        let processor = AnalysisProcessor::new(model.clone(), AnalysisConfig::default());
        let results = vec![search_result("https://a.com"), search_result("https://a.com"), search_result("https://b.com")];

        let scores = processor.credibility(&results).await;
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|s| *s == 1.0));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_credibility_defaults_to_neutral() {
        let garbage = AnalysisProcessor::new(TaskModel::working("quite credible"), AnalysisConfig::default());
        let scores = garbage.credibility(&[search_result("https://a.com")]).await;
        assert_eq!(scores["https://a.com"], NEUTRAL_CREDIBILITY);

        let failing = AnalysisProcessor::new(TaskModel::failing(), AnalysisConfig::default());
        let scores = failing.credibility(&[search_result("https://b.com")]).await;
        assert_eq!(scores["https://b.com"], NEUTRAL_CREDIBILITY);
    }

    #[test]
    fn test_merge_prefers_llm_kind() {
        let local = vec![Entity {
            name: "Acme  Corp".into(),
            kind: EntityKind::Location,
            mentions: 5,
            confidence: 0.6,
            origin: EntityOrigin::Local,
        }];
        let merged = merge_entities(
            vec![("acme corp".into(), EntityKind::Organization), ("Widget".into(), EntityKind::Product)],
            local,
            "Acme Corp sells widget. acme corp again. ACME CORP.",
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "acme corp");
        assert_eq!(merged[0].kind, EntityKind::Organization);
        assert_eq!(merged[0].origin, EntityOrigin::Both);
        assert_eq!(merged[0].mentions, 3);
        assert_eq!(merged[1].mentions, 1);
    }
}
