use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub const INSUFFICIENT_DATA_SUMMARY: &str =
    "Analysis could not be completed due to insufficient data.";
pub const SUMMARY_UNAVAILABLE: &str = "Analysis summary unavailable.";

/// Upper bound on results requested per source in one run
pub const MAX_RESULTS_LIMIT: usize = 100;

// ====== Search ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    News,
    Image,
    Video,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::News => "news",
            SourceType::Image => "image",
            SourceType::Video => "video",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_type: SourceType,
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Source domain as reported by the provider
    pub display_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// ====== Scraping ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Failed,
}

/// Outcome of fetching one URL; failures are recorded, not dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub status: ScrapeStatus,
    pub error: Option<String>,
    pub attempts: u32,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedContent {
    pub fn success(url: impl Into<String>, title: Option<String>, text: String, attempts: u32) -> Self {
        Self {
            url: url.into(),
            title,
            text,
            status: ScrapeStatus::Success,
            error: None,
            attempts,
            scraped_at: Utc::now(),
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            url: url.into(),
            title: None,
            text: String::new(),
            status: ScrapeStatus::Failed,
            error: Some(error.into()),
            attempts,
            scraped_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }
}

// ====== Analysis ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Product,
    Event,
    WorkOfArt,
    Law,
    Facility,
    Other,
}

impl EntityKind {
    /// Parse a label, accepting the short NER aliases (`ORG`, `GPE`, `LOC`, `FAC`)
    pub fn parse(label: &str) -> Self {
        match label.trim().to_uppercase().replace(' ', "_").as_str() {
            "PERSON" | "PER" => EntityKind::Person,
            "ORGANIZATION" | "ORGANISATION" | "ORG" => EntityKind::Organization,
            "LOCATION" | "GPE" | "LOC" => EntityKind::Location,
            "PRODUCT" => EntityKind::Product,
            "EVENT" => EntityKind::Event,
            "WORK_OF_ART" => EntityKind::WorkOfArt,
            "LAW" => EntityKind::Law,
            "FACILITY" | "FAC" => EntityKind::Facility,
            _ => EntityKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "PERSON",
            EntityKind::Organization => "ORGANIZATION",
            EntityKind::Location => "LOCATION",
            EntityKind::Product => "PRODUCT",
            EntityKind::Event => "EVENT",
            EntityKind::WorkOfArt => "WORK_OF_ART",
            EntityKind::Law => "LAW",
            EntityKind::Facility => "FACILITY",
            EntityKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityOrigin {
    Llm,
    Local,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub mentions: usize,
    pub confidence: f64,
    pub origin: EntityOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }

    /// Classification of a polarity score using a ±0.1 neutral band
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.1 {
            SentimentLabel::Positive
        } else if polarity < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMethod {
    Llm,
    Lexicon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub polarity: f64,
    pub subjectivity: f64,
    pub confidence: f64,
    pub method: SentimentMethod,
}

impl Sentiment {
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            polarity: 0.0,
            subjectivity: 0.0,
            confidence: 0.0,
            method: SentimentMethod::Lexicon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: usize,
    pub label: String,
    pub keywords: Vec<String>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Date exactly as written in the source text
    pub date: String,
    pub normalized_date: NaiveDate,
    pub description: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub relation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub query: String,
    pub summary: String,
    pub summary_available: bool,
    pub entities: Vec<Entity>,
    pub sentiment: Sentiment,
    pub topics: Vec<Topic>,
    pub timeline: Vec<TimelineEvent>,
    pub relationships: Vec<Relationship>,
    pub related_queries: Vec<String>,
    /// URL → credibility score in [0, 1]
    pub credibility: BTreeMap<String, f64>,
    /// URLs of the documents whose text contributed
    pub sources: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Result used when there is not enough text to analyze
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            summary: INSUFFICIENT_DATA_SUMMARY.to_string(),
            summary_available: false,
            entities: Vec::new(),
            sentiment: Sentiment::neutral(),
            topics: Vec::new(),
            timeline: Vec::new(),
            relationships: Vec::new(),
            related_queries: Vec::new(),
            credibility: BTreeMap::new(),
            sources: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }
}

// ====== Visualization ======

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: String,
    pub event: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreemapCell {
    pub label: String,
    pub parent: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub word_cloud: Vec<WordCount>,
    pub timeline: Vec<TimelinePoint>,
    pub treemap: Vec<TreemapCell>,
}

// ====== Pipeline ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Initialized,
    Searching,
    Scraping,
    Storing,
    Analyzing,
    Visualizing,
    GeneratingReport,
    Completed,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Initialized => "initialized",
            PipelineStatus::Searching => "searching",
            PipelineStatus::Scraping => "scraping",
            PipelineStatus::Storing => "storing",
            PipelineStatus::Analyzing => "analyzing",
            PipelineStatus::Visualizing => "visualizing",
            PipelineStatus::GeneratingReport => "generating_report",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOptions {
    #[serde(default = "default_true")]
    pub include_images: bool,
    #[serde(default = "default_true")]
    pub include_videos: bool,
    #[serde(default = "default_true")]
    pub include_news: bool,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_videos: true,
            include_news: true,
            max_results: None,
        }
    }
}

/// Mutable record of a single run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub query: String,
    pub options: ResearchOptions,
    pub web_results: Vec<SearchResult>,
    pub news_results: Vec<SearchResult>,
    pub images: Vec<SearchResult>,
    pub videos: Vec<SearchResult>,
    pub scraped: Vec<ScrapedContent>,
    pub stored_documents: usize,
    pub analysis: Option<AnalysisResult>,
    pub status: PipelineStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>, options: ResearchOptions) -> Self {
        let now = Utc::now();
        Self {
            query: query.into(),
            options,
            web_results: Vec::new(),
            news_results: Vec::new(),
            images: Vec::new(),
            videos: Vec::new(),
            scraped: Vec::new(),
            stored_documents: 0,
            analysis: None,
            status: PipelineStatus::Initialized,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: PipelineStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.set_status(PipelineStatus::Failed);
    }

    /// Web and news results, the ones that get scraped and rated
    pub fn text_results(&self) -> impl Iterator<Item = &SearchResult> {
        self.web_results.iter().chain(self.news_results.iter())
    }

    pub fn total_search_results(&self) -> usize {
        self.web_results.len() + self.news_results.len() + self.images.len() + self.videos.len()
    }

    pub fn successful_pages(&self) -> usize {
        self.scraped.iter().filter(|s| s.is_success()).count()
    }

    pub fn failed_pages(&self) -> usize {
        self.scraped.len() - self.successful_pages()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRef {
    pub run_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub state: PipelineState,
    pub visualization: VisualizationData,
    pub report: Option<ReportRef>,
    pub processing_time_secs: f64,
}

impl PipelineResult {
    pub fn is_completed(&self) -> bool {
        self.state.status == PipelineStatus::Completed
    }

    pub fn summary(&self) -> JobResultSummary {
        JobResultSummary {
            processing_time_secs: self.processing_time_secs,
            pipeline_status: self.state.status,
            search_results: self.state.total_search_results(),
            scraped_pages: self.state.successful_pages(),
            failed_pages: self.state.failed_pages(),
            stored_documents: self.state.stored_documents,
            analysis: self.state.analysis.clone(),
        }
    }
}

// ====== Jobs ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Only pending → running → {completed, failed} is allowed
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!(
                "Invalid status '{other}'. Expected one of: pending, running, completed, failed"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultSummary {
    pub processing_time_secs: f64,
    pub pipeline_status: PipelineStatus,
    pub search_results: usize,
    pub scraped_pages: usize,
    pub failed_pages: usize,
    pub stored_documents: usize,
    pub analysis: Option<AnalysisResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub query: String,
    pub options: ResearchOptions,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub report_url: Option<String>,
    pub result: Option<JobResultSummary>,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, query: impl Into<String>, options: ResearchOptions) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            query: query.into(),
            options,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            report_url: None,
            result: None,
        }
    }

    pub fn listing_entry(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id.clone(),
            status: self.status,
            query: self.query.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// Partial update applied by [`crate::store::JobStore::update`]
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub report_url: Option<String>,
    pub result: Option<JobResultSummary>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self {
            status: Some(JobStatus::Running),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn completed(summary: JobResultSummary, report_url: Option<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            completed_at: Some(Utc::now()),
            report_url,
            result: Some(summary),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>, summary: Option<JobResultSummary>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            completed_at: Some(Utc::now()),
            error: Some(error.into()),
            result: summary,
            ..Self::default()
        }
    }

    /// Merge into `record` without checking the status transition
    pub fn apply_to(self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if self.started_at.is_some() {
            record.started_at = self.started_at;
        }
        if self.completed_at.is_some() {
            record.completed_at = self.completed_at;
        }
        if self.error.is_some() {
            record.error = self.error;
        }
        if self.report_url.is_some() {
            record.report_url = self.report_url;
        }
        if self.result.is_some() {
            record.result = self.result;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    /// Jobs in the store
    pub total: usize,
    /// Jobs matching the status filter, before the limit
    pub filtered: usize,
    pub jobs: Vec<JobSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_transitions() {
        use JobStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Running.can_transition_to(Pending));
        for terminal in [Completed, Failed] {
            for next in [Pending, Running, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_job_status_parse() {
        assert_eq!("Running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_entity_kind_aliases() {
        assert_eq!(EntityKind::parse("ORG"), EntityKind::Organization);
        assert_eq!(EntityKind::parse("gpe"), EntityKind::Location);
        assert_eq!(EntityKind::parse("FAC"), EntityKind::Facility);
        assert_eq!(EntityKind::parse("work of art"), EntityKind::WorkOfArt);
        assert_eq!(EntityKind::parse("spaceship"), EntityKind::Other);
    }

    #[test]
    fn test_research_options_defaults_from_json() {
        let options: ResearchOptions = serde_json::from_str("{}").unwrap();
        assert!(options.include_images);
        assert!(options.include_videos);
        assert!(options.include_news);
        assert_eq!(options.max_results, None);
    }

    #[test]
    fn test_pipeline_state_fail() {
        let mut state = PipelineState::new("rust", ResearchOptions::default());
        let before = state.updated_at;
        state.fail("boom");

        assert_eq!(state.status, PipelineStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert!(state.updated_at >= before);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PipelineStatus::GeneratingReport).unwrap(),
            "\"generating_report\""
        );
        assert_eq!(serde_json::to_string(&JobStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(
            serde_json::to_string(&EntityKind::WorkOfArt).unwrap(),
            "\"WORK_OF_ART\""
        );
    }

    #[test]
    fn test_empty_analysis() {
        let result = AnalysisResult::empty("q");
        assert_eq!(result.summary, INSUFFICIENT_DATA_SUMMARY);
        assert!(!result.summary_available);
        assert!(result.entities.is_empty());
        assert_eq!(result.sentiment.label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_job_update_apply() {
        let mut record = JobRecord::new("id", "q", ResearchOptions::default());
        JobUpdate::running().apply_to(&mut record);
        assert_eq!(record.status, JobStatus::Running);
        assert!(record.started_at.is_some());

        JobUpdate::failed("oops", None).apply_to(&mut record);
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("oops"));
        assert!(record.completed_at.is_some());
    }
}
