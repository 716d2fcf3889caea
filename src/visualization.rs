//! Chart-ready projections of an analysis result
//!
//! [`build`] is pure: the same analysis always yields the same data, and
//! empty inputs yield empty charts.

use std::collections::HashSet;

use tracing::debug;

use crate::analysis::nlp;
use crate::analysis::normalize_name;
use crate::models::AnalysisResult;
use crate::models::GraphEdge;
use crate::models::GraphNode;
use crate::models::TimelinePoint;
use crate::models::TreemapCell;
use crate::models::VisualizationData;
use crate::models::WordCount;

pub const MAX_NODES: usize = 50;
pub const MAX_EDGES: usize = 100;
pub const MAX_TIMELINE_POINTS: usize = 20;
pub const MAX_WORDS: usize = 100;
pub const TREEMAP_ROOT: &str = "Topics";
const TREEMAP_KEYWORDS: usize = 3;

pub fn build(analysis: &AnalysisResult) -> VisualizationData {
    let (nodes, edges) = entity_graph(analysis);
    let data = VisualizationData {
        nodes,
        edges,
        word_cloud: word_cloud(analysis),
        timeline: timeline(analysis),
        treemap: treemap(analysis),
    };

    debug!(
        "Visualization data: {} nodes, {} edges, {} words, {} timeline points",
        data.nodes.len(),
        data.edges.len(),
        data.word_cloud.len(),
        data.timeline.len()
    );
    data
}

/// Nodes keyed by normalized entity name; edges only between kept nodes
fn entity_graph(analysis: &AnalysisResult) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut nodes = Vec::new();
    let mut ids: HashSet<String> = HashSet::new();

    for entity in analysis.entities.iter().take(MAX_NODES) {
        let id = normalize_name(&entity.name);
        if !ids.insert(id.clone()) {
            continue;
        }
        nodes.push(GraphNode {
            id,
            label: entity.name.clone(),
            kind: entity.kind,
            confidence: entity.confidence,
        });
    }

    let edges = analysis
        .relationships
        .iter()
        .filter_map(|r| {
            let from = normalize_name(&r.source);
            let to = normalize_name(&r.target);
            if !ids.contains(&from) || !ids.contains(&to) {
                return None;
            }
            Some(GraphEdge {
                from,
                to,
                label: r.relation.clone(),
                confidence: r.confidence,
            })
        })
        .take(MAX_EDGES)
        .collect();

    (nodes, edges)
}

/// Term frequencies over the summary and topic keywords
fn word_cloud(analysis: &AnalysisResult) -> Vec<WordCount> {
    let mut text = String::new();
    if analysis.summary_available {
        text.push_str(&analysis.summary);
    }
    for topic in &analysis.topics {
        for keyword in &topic.keywords {
            text.push(' ');
            text.push_str(keyword);
        }
    }

    nlp::keyword_counts(&text)
        .into_iter()
        .take(MAX_WORDS)
        .map(|(term, count)| WordCount { term, count })
        .collect()
}

/// Chronological, capped
fn timeline(analysis: &AnalysisResult) -> Vec<TimelinePoint> {
    let mut events: Vec<_> = analysis.timeline.iter().collect();
    events.sort_by_key(|e| e.normalized_date);

    events
        .into_iter()
        .take(MAX_TIMELINE_POINTS)
        .map(|e| TimelinePoint {
            date: e.normalized_date.format("%Y-%m-%d").to_string(),
            event: e.description.clone(),
            source: e.source.clone(),
        })
        .collect()
}

/// Root, one cell per topic, and up to three keyword cells per topic sharing its weight
fn treemap(analysis: &AnalysisResult) -> Vec<TreemapCell> {
    if analysis.topics.is_empty() {
        return Vec::new();
    }

    let mut cells = vec![TreemapCell {
        label: TREEMAP_ROOT.to_string(),
        parent: String::new(),
        value: 0.0,
    }];

    for topic in &analysis.topics {
        cells.push(TreemapCell {
            label: topic.label.clone(),
            parent: TREEMAP_ROOT.to_string(),
            value: topic.weight,
        });

        let share = topic.weight / topic.keywords.len().max(1) as f64;
        for keyword in topic.keywords.iter().take(TREEMAP_KEYWORDS) {
            cells.push(TreemapCell {
                label: keyword.clone(),
                parent: topic.label.clone(),
                value: share,
            });
        }
    }

    cells
}
