//! Co-occurrence relationships between entities

use regex::Regex;
use regex::RegexBuilder;

use crate::models::Entity;
use crate::models::Relationship;

pub const MAX_RELATIONSHIPS: usize = 20;
pub const RELATED_TO: &str = "related_to";
const CO_OCCURRENCE_CONFIDENCE: f64 = 0.7;

fn pair_pattern(first: &str, second: &str) -> Option<Regex> {
    let pattern = format!(
        r"\b{}\b.*?\b{}\b",
        regex::escape(first),
        regex::escape(second)
    );
    RegexBuilder::new(&pattern).case_insensitive(true).build().ok()
}

/// Pairs `(i, j)` with `i < j` where entity `i` is followed by entity `j` on the same line
pub fn extract_relationships(entities: &[Entity], text: &str) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    for (i, first) in entities.iter().enumerate() {
        for second in &entities[i + 1..] {
            let Some(pattern) = pair_pattern(&first.name, &second.name) else {
                continue;
            };
            if pattern.is_match(text) {
                relationships.push(Relationship {
                    source: first.name.clone(),
                    target: second.name.clone(),
                    relation: RELATED_TO.to_string(),
                    confidence: CO_OCCURRENCE_CONFIDENCE,
                });
                if relationships.len() >= MAX_RELATIONSHIPS {
                    return relationships;
                }
            }
        }
    }

    relationships
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use crate::models::EntityOrigin;

    fn entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            kind: EntityKind::Other,
            mentions: 1,
            confidence: 0.8,
            origin: EntityOrigin::Llm,
        }
    }

    #[test]
    fn test_order_and_whole_words() {
        let entities = vec![entity("Apple"), entity("Tim Cook"), entity("Pie")];
        let text = "APPLE announced that tim cook will speak. Pineapple pies are unrelated.";

        let relationships = extract_relationships(&entities, text);
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].source, "Apple");
        assert_eq!(relationships[0].target, "Tim Cook");
        assert_eq!(relationships[0].relation, RELATED_TO);
        assert!((relationships[0].confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reverse_order_does_not_match() {
        let entities = vec![entity("Alpha"), entity("Beta")];
        assert!(extract_relationships(&entities, "Beta came before Alpha").is_empty());
    }

    #[test]
    fn test_capped() {
        let entities: Vec<Entity> = (0..10).map(|i| entity(&format!("E{i}"))).collect();
        let text = (0..10).map(|i| format!("E{i}")).collect::<Vec<_>>().join(" ");
        assert_eq!(extract_relationships(&entities, &text).len(), MAX_RELATIONSHIPS);
    }
}
