//! Local NLP used alongside (or instead of) the language model
//!
//! Everything here is deterministic and offline: a tokenizer with an English
//! stopword list, keyword frequency topics, a small sentiment lexicon and a
//! capitalization-based entity recognizer.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::llm::analyst::topic_weight;
use crate::models::Entity;
use crate::models::EntityKind;
use crate::models::EntityOrigin;
use crate::models::Sentiment;
use crate::models::SentimentLabel;
use crate::models::SentimentMethod;
use crate::models::Topic;

/// Only the head of the combined text is scanned for entities
const ENTITY_SCAN_CHARS: usize = 10_000;
const MAX_LOCAL_ENTITIES: usize = 50;
const LOCAL_ENTITY_CONFIDENCE: f64 = 0.6;
const KEYWORDS_PER_TOPIC: usize = 5;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").unwrap_or_else(|e| panic!("invalid word regex: {e}")));

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9&'-]*(?:\s+(?:of\s+|the\s+|de\s+)?[A-Z][A-Za-z0-9&'-]*)*")
        .unwrap_or_else(|e| panic!("invalid entity regex: {e}"))
});

pub static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any", "are",
        "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
        "can", "could", "did", "do", "does", "doing", "down", "during", "each", "even", "few", "for", "from",
        "further", "get", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
        "himself", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
        "like", "made", "make", "many", "may", "me", "more", "most", "much", "must", "my", "myself", "new",
        "no", "nor", "not", "now", "of", "off", "on", "once", "one", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "said", "same", "says", "see", "she", "should", "since", "so",
        "some", "still", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
        "there", "these", "they", "this", "those", "through", "to", "too", "two", "under", "until", "up",
        "us", "use", "used", "using", "very", "was", "way", "we", "well", "were", "what", "when", "where",
        "which", "while", "who", "whom", "why", "will", "with", "would", "year", "years", "yet", "you",
        "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

static POSITIVE: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "achieve", "achievement", "advance", "advantage", "amazing", "benefit", "best", "better",
        "breakthrough", "brilliant", "effective", "efficient", "excellent", "exciting", "favorable", "gain",
        "good", "great", "growth", "happy", "helpful", "impressive", "improve", "improved", "improvement",
        "innovative", "love", "opportunity", "optimistic", "outstanding", "perfect", "popular", "positive",
        "powerful", "progress", "promising", "reliable", "remarkable", "robust", "safe", "strong",
        "succeed", "success", "successful", "superior", "support", "win", "wonderful",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "bad", "concern", "concerns", "crisis", "damage", "danger", "dangerous", "decline", "difficult",
        "disappointing", "fail", "failed", "failure", "fear", "harm", "harmful", "hate", "lose", "loss",
        "negative", "poor", "problem", "problems", "risk", "risky", "sad", "scandal", "severe", "threat",
        "terrible", "unreliable", "unsafe", "weak", "worse", "worst", "wrong",
    ]
    .into_iter()
    .collect()
});

const NEGATORS: &[&str] = &["not", "no", "never", "without", "hardly"];

const ORG_MARKERS: &[&str] = &[
    "inc", "inc.", "corp", "corp.", "corporation", "ltd", "ltd.", "llc", "company", "co.", "group",
    "university", "institute", "foundation", "association", "agency", "department", "ministry",
    "bank", "council", "committee", "commission", "labs", "technologies", "systems",
];

const LOCATION_MARKERS: &[&str] = &[
    "city", "county", "state", "river", "mountain", "mountains", "lake", "island", "islands", "valley",
    "street", "avenue", "bay", "ocean", "sea", "province", "region", "kingdom", "republic",
];

const PERSON_TITLES: &[&str] = &[
    "mr", "mr.", "mrs", "mrs.", "ms", "ms.", "dr", "dr.", "prof", "prof.", "president", "senator",
    "governor", "ceo", "sir",
];

/// Lowercased word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '-').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Non-stopword terms of at least three letters, most frequent first (ties alphabetical)
pub fn keyword_counts(text: &str) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        if token.len() >= 3 && !is_stopword(&token) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Topics built from the most frequent keywords, five per topic
pub fn keyword_topics(text: &str, max_topics: usize) -> Vec<Topic> {
    let keywords: Vec<String> = keyword_counts(text)
        .into_iter()
        .take(max_topics * KEYWORDS_PER_TOPIC)
        .map(|(term, _)| term)
        .collect();

    keywords
        .chunks(KEYWORDS_PER_TOPIC)
        .take(max_topics)
        .enumerate()
        .map(|(i, group)| Topic {
            id: i,
            label: capitalize(&group[0]),
            keywords: group.to_vec(),
            weight: topic_weight(i),
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lexicon polarity with one-word negation.
///
/// Polarity is `(pos - neg) / (pos + neg)`; subjectivity is the share of
/// opinion words, scaled so one in five tokens saturates it.
pub fn lexicon_sentiment(text: &str) -> Sentiment {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Sentiment::neutral();
    }

    let mut positive = 0usize;
    let mut negative = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        let negated = i > 0 && NEGATORS.contains(&tokens[i - 1].as_str());
        let (is_pos, is_neg) = (POSITIVE.contains(token.as_str()), NEGATIVE.contains(token.as_str()));
        match (is_pos, is_neg, negated) {
            (true, _, false) | (_, true, true) => positive += 1,
            (true, _, true) | (_, true, false) => negative += 1,
            _ => {}
        }
    }

    let opinion = positive + negative;
    if opinion == 0 {
        return Sentiment::neutral();
    }

    let polarity = (positive as f64 - negative as f64) / opinion as f64;
    let subjectivity = (opinion as f64 / tokens.len() as f64 * 5.0).min(1.0);
    let confidence = (opinion as f64 / 10.0).min(1.0) * polarity.abs().max(0.5);

    Sentiment {
        label: SentimentLabel::from_polarity(polarity),
        polarity,
        subjectivity,
        confidence,
        method: SentimentMethod::Lexicon,
    }
}

/// Kind guessed from the words of a capitalized run
fn guess_kind(words: &[&str]) -> EntityKind {
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    if lower.iter().any(|w| ORG_MARKERS.contains(&w.as_str())) {
        EntityKind::Organization
    } else if lower.iter().any(|w| LOCATION_MARKERS.contains(&w.as_str())) {
        EntityKind::Location
    } else if lower.first().is_some_and(|w| PERSON_TITLES.contains(&w.as_str())) {
        EntityKind::Person
    } else if words.len() == 2 && words.iter().all(|w| w.chars().skip(1).all(char::is_lowercase)) {
        EntityKind::Person
    } else {
        EntityKind::Other
    }
}

/// Capitalized word runs, kept when multi-word or seen more than once
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let head: String = text.chars().take(ENTITY_SCAN_CHARS).collect();

    let mut seen: HashMap<String, (String, usize)> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for m in CAPITALIZED_RUN.find_iter(&head) {
        let candidate = m.as_str().trim_end_matches(['\'', '-']).trim();
        let words: Vec<&str> = candidate.split_whitespace().collect();
        // Drop a leading stopword picked up at sentence start ("The", "In")
        let words: Vec<&str> = match words.split_first() {
            Some((first, rest)) if is_stopword(&first.to_lowercase()) => rest.to_vec(),
            _ => words,
        };
        if words.is_empty() || words.iter().all(|w| is_stopword(&w.to_lowercase())) {
            continue;
        }
        let name = words.join(" ");
        if name.chars().count() < 2 {
            continue;
        }

        let key = name.to_lowercase();
        match seen.get_mut(&key) {
            Some((_, count)) => *count += 1,
            None => {
                order.push(key.clone());
                seen.insert(key, (name, 1));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (name, count) = seen.remove(&key)?;
            let words: Vec<&str> = name.split_whitespace().collect();
            if words.len() < 2 && count < 2 {
                return None;
            }
            Some(Entity {
                kind: guess_kind(&words),
                name,
                mentions: count,
                confidence: LOCAL_ENTITY_CONFIDENCE,
                origin: EntityOrigin::Local,
            })
        })
        .take(MAX_LOCAL_ENTITIES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Rust's borrow-checker, 2024!"), vec!["rust's", "borrow-checker"]);
    }

    #[test]
    fn test_keyword_counts_skip_stopwords() {
        let counts = keyword_counts("The rust compiler and the Rust borrow checker. Rust!");
        assert_eq!(counts[0], ("rust".to_string(), 3));
        assert!(counts.iter().all(|(t, _)| t != "the" && t != "and"));
    }

    #[test]
    fn test_keyword_topics() {
        let text = "solar solar solar wind wind battery grid grid storage panels inverter policy subsidy";
        let topics = keyword_topics(text, 2);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].label, "Solar");
        assert_eq!(topics[0].keywords.len(), 5);
        assert!(topics[0].weight > topics[1].weight);
    }

    #[test]
    fn test_lexicon_sentiment() {
        let positive = lexicon_sentiment("This is a great and successful breakthrough.");
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert_eq!(positive.method, SentimentMethod::Lexicon);
        assert!(positive.polarity > 0.0 && positive.polarity <= 1.0);
        assert!((0.0..=1.0).contains(&positive.subjectivity));

        let negated = lexicon_sentiment("The launch was not good and a failure.");
        assert_eq!(negated.label, SentimentLabel::Negative);

        let flat = lexicon_sentiment("The meeting is on Tuesday.");
        assert_eq!(flat.label, SentimentLabel::Neutral);
        assert_eq!(flat.polarity, 0.0);
    }

    #[test]
    fn test_extract_entities() {
        let text = "The Stanford University team met Jane Smith in San Francisco. \
                    Later, Jane Smith said Stanford University would publish. Rust is fun. Rust again.";
        let entities = extract_entities(text);
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();

        assert!(names.contains(&"Stanford University"));
        assert!(names.contains(&"Jane Smith"));
        assert!(names.contains(&"Rust"));
        assert!(!names.contains(&"Later"));

        let stanford = entities.iter().find(|e| e.name == "Stanford University").unwrap();
        assert_eq!(stanford.kind, EntityKind::Organization);
        assert_eq!(stanford.mentions, 2);
        assert_eq!(stanford.origin, EntityOrigin::Local);

        let jane = entities.iter().find(|e| e.name == "Jane Smith").unwrap();
        assert_eq!(jane.kind, EntityKind::Person);
    }
}
