//! HTML report rendering
//!
//! The report is a single self-contained page. The entity graph is drawn in
//! the browser with vis-network from JSON embedded in the page.

use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;

use crate::errors::ResearchError;
use crate::models::PipelineState;
use crate::models::ReportRef;
use crate::models::SearchResult;
use crate::models::VisualizationData;
use crate::Result;

const MAX_REPORT_ENTITIES: usize = 30;
const MAX_REPORT_SOURCES: usize = 10;
const VIS_NETWORK_URL: &str = "https://unpkg.com/vis-network/standalone/umd/vis-network.min.js";

const STYLE: &str = r"
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background: #f5f7fa; color: #2c3e50; margin: 0; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
.header { background: #fff; border-radius: 8px; padding: 24px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
.meta-info { display: flex; gap: 24px; color: #7f8c8d; margin-top: 8px; }
.section { background: #fff; border-radius: 8px; padding: 20px 24px; margin-top: 20px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
h2 { border-bottom: 2px solid #3498db; padding-bottom: 6px; }
.stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 16px; }
.stat-card { background: #ecf0f1; border-radius: 6px; padding: 16px; text-align: center; }
.stat-number { font-size: 2em; font-weight: bold; color: #3498db; }
.summary { line-height: 1.6; white-space: pre-wrap; }
.sentiment { padding: 12px; border-radius: 6px; }
.sentiment.positive { background: #d5f5e3; }
.sentiment.negative { background: #fadbd8; }
.sentiment.neutral { background: #ecf0f1; }
.badge { display: inline-block; padding: 4px 10px; margin: 4px; border-radius: 12px; font-size: .9em; }
.entity-badge { background: #e8f4fd; }
.topic-badge { background: #fef5e7; }
.word-cloud span { display: inline-block; margin: 4px 8px; color: #2980b9; }
#entity-graph { height: 500px; border: 1px solid #ddd; border-radius: 6px; }
.timeline-item { border-left: 3px solid #3498db; padding: 6px 12px; margin: 10px 0; }
.timeline-date { font-weight: bold; }
.timeline-source, .source-snippet { color: #7f8c8d; font-size: .9em; }
.source { margin: 10px 0; padding: 10px; background: #f8f9fa; border-radius: 4px; }
.credibility { float: right; font-size: .85em; color: #7f8c8d; }
.footer { text-align: center; color: #95a5a6; margin: 24px 0; }
";

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON safe to embed inside a `<script>` element
fn script_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?
        .replace("</", "<\\/")
        .replace("<!--", "<\\!--"))
}

/// Only `http(s)` links are rendered as anchors
fn safe_href(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| escape_html(parsed.as_str()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn stat_card(html: &mut String, number: usize, label: &str) {
    let _ = write!(
        html,
        r#"<div class="stat-card"><div class="stat-number">{number}</div><div class="stat-label">{label}</div></div>"#
    );
}

/// Render the full report page
pub fn render_html(
    state: &PipelineState,
    visualization: &VisualizationData,
    processing_time_secs: f64,
) -> Result<String> {
    let mut html = String::with_capacity(16 * 1024);
    let query = escape_html(&state.query);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Research Report: {query}</title>
<script type="text/javascript" src="{VIS_NETWORK_URL}"></script>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>Content Research Report</h1>
<h2 style="border: none; color: #7f8c8d;">{query}</h2>
<div class="meta-info">
<div><strong>Date:</strong> {date}</div>
<div><strong>Status:</strong> {status}</div>
<div><strong>Processing Time:</strong> {processing_time_secs:.2}s</div>
</div>
</div>
"#,
        date = state.created_at.format("%Y-%m-%d %H:%M"),
        status = state.status,
    );

    html.push_str(r#"<div class="section"><h2>Overview</h2><div class="stats">"#);
    stat_card(&mut html, state.total_search_results(), "Search Results");
    stat_card(&mut html, state.successful_pages(), "Pages Analyzed");
    if let Some(analysis) = &state.analysis {
        stat_card(&mut html, analysis.entities.len(), "Entities Found");
        stat_card(&mut html, analysis.topics.len(), "Topics Identified");
    }
    html.push_str("</div></div>\n");

    if let Some(analysis) = &state.analysis {
        let _ = write!(
            html,
            r#"<div class="section"><h2>Executive Summary</h2><div class="summary">{}</div></div>
"#,
            escape_html(&analysis.summary)
        );

        let sentiment = &analysis.sentiment;
        let _ = write!(
            html,
            r#"<div class="section"><h2>Sentiment Analysis</h2><div class="sentiment {label}">
<strong>Overall Sentiment:</strong> {title}<br>
<strong>Polarity:</strong> {polarity:.2}<br>
<strong>Confidence:</strong> {confidence:.0}%
</div></div>
"#,
            label = sentiment.label.as_str(),
            title = capitalize(sentiment.label.as_str()),
            polarity = sentiment.polarity,
            confidence = sentiment.confidence * 100.0,
        );

        if !analysis.entities.is_empty() {
            html.push_str(r#"<div class="section"><h2>Key Entities</h2><div>"#);
            for entity in analysis.entities.iter().take(MAX_REPORT_ENTITIES) {
                let _ = write!(
                    html,
                    r#"<span class="badge entity-badge">{} ({})</span>"#,
                    escape_html(&entity.name),
                    entity.kind
                );
            }
            html.push_str("</div></div>\n");
        }

        if !analysis.topics.is_empty() {
            html.push_str(r#"<div class="section"><h2>Main Topics</h2>"#);
            for topic in &analysis.topics {
                let _ = write!(html, "<div><h3>{}</h3><div>", escape_html(&topic.label));
                for keyword in &topic.keywords {
                    let _ = write!(html, r#"<span class="badge topic-badge">{}</span>"#, escape_html(keyword));
                }
                html.push_str("</div></div>");
            }
            html.push_str("</div>\n");
        }
    }

    let has_graph = !visualization.nodes.is_empty() && !visualization.edges.is_empty();
    if has_graph {
        html.push_str(r#"<div class="section"><h2>Entity Relationship Graph</h2><div id="entity-graph"></div></div>"#);
        html.push('\n');
    }

    if !visualization.word_cloud.is_empty() {
        let max = visualization.word_cloud.iter().map(|w| w.count).max().unwrap_or(1).max(1);
        html.push_str(r#"<div class="section"><h2>Word Cloud</h2><div class="word-cloud">"#);
        for word in &visualization.word_cloud {
            let size = 0.8 + 1.6 * word.count as f64 / max as f64;
            let _ = write!(
                html,
                r#"<span style="font-size: {size:.2}em">{}</span>"#,
                escape_html(&word.term)
            );
        }
        html.push_str("</div></div>\n");
    }

    if !visualization.timeline.is_empty() {
        html.push_str(r#"<div class="section"><h2>Timeline</h2>"#);
        for point in &visualization.timeline {
            let _ = write!(
                html,
                r#"<div class="timeline-item"><div class="timeline-date">{}</div><div>{}</div><div class="timeline-source">Source: {}</div></div>"#,
                escape_html(&point.date),
                escape_html(&point.event),
                escape_html(&point.source)
            );
        }
        html.push_str("</div>\n");
    }

    if let Some(analysis) = state.analysis.as_ref().filter(|a| !a.related_queries.is_empty()) {
        html.push_str(r#"<div class="section"><h2>Related Queries</h2><ul>"#);
        for query in &analysis.related_queries {
            let _ = write!(html, "<li>{}</li>", escape_html(query));
        }
        html.push_str("</ul></div>\n");
    }

    html.push_str(r#"<div class="section"><h2>Sources</h2>"#);
    let sources: Vec<&SearchResult> = state.text_results().take(MAX_REPORT_SOURCES).collect();
    for result in sources {
        render_source(&mut html, result, state);
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        r#"<div class="footer"><p>Generated by Content Research Pipeline</p><p>{}</p></div>
</div>
"#,
        state.created_at.format("%Y")
    );

    if has_graph {
        let nodes = script_json(&visualization.nodes)?;
        let edges = script_json(&visualization.edges)?;
        let _ = write!(
            html,
            r#"<script type="text/javascript">
var nodes = new vis.DataSet({nodes});
var edges = new vis.DataSet({edges});
var options = {{
  nodes: {{ shape: 'dot', size: 20, font: {{ size: 14, color: '#333' }}, borderWidth: 2 }},
  edges: {{ width: 2, arrows: {{ to: {{ enabled: true, scaleFactor: 0.5 }} }}, smooth: {{ type: 'continuous' }} }},
  physics: {{ barnesHut: {{ gravitationalConstant: -8000, springLength: 150 }}, stabilization: {{ iterations: 100 }} }},
  interaction: {{ hover: true, navigationButtons: true }}
}};
new vis.Network(document.getElementById('entity-graph'), {{ nodes: nodes, edges: edges }}, options);
</script>
"#
        );
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

fn render_source(html: &mut String, result: &SearchResult, state: &PipelineState) {
    let title = escape_html(&result.title);
    let credibility = state
        .analysis
        .as_ref()
        .and_then(|a| a.credibility.get(&result.url))
        .map(|score| format!(r#"<span class="credibility">Credibility: {score:.2}</span>"#))
        .unwrap_or_default();

    let heading = match safe_href(&result.url) {
        Some(href) => format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer"><strong>{title}</strong></a>"#),
        None => format!("<strong>{title}</strong>"),
    };

    let _ = write!(
        html,
        r#"<div class="source">{credibility}{heading}<div class="source-snippet">{}</div></div>"#,
        escape_html(&result.snippet)
    );
}

/// Writes rendered reports as `{reports_dir}/{run_id}.html`
#[derive(Debug, Clone)]
pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.reports_dir.join(format!("{run_id}.html"))
    }

    pub async fn write(&self, run_id: &str, html: &str) -> Result<ReportRef> {
        if run_id.is_empty() || run_id.contains(['/', '\\', '.']) {
            return Err(ResearchError::ReportError(format!("Invalid run id: {run_id}")));
        }

        tokio::fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| ResearchError::ReportError(format!("Cannot create {}: {e}", self.reports_dir.display())))?;

        let path = self.path_for(run_id);
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| ResearchError::ReportError(format!("Cannot write {}: {e}", path.display())))?;

        info!("📄 Report written to {}", path.display());
        Ok(ReportRef {
            run_id: run_id.to_string(),
            path: path.to_string_lossy().into_owned(),
        })
    }

    /// Remove a run's report; a missing file is not an error
    pub async fn remove(&self, run_id: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(run_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
