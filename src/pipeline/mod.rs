//! Research pipeline orchestration
//!
//! One run goes search → scrape → store → analyze → visualize → report,
//! carrying a [`PipelineState`] through every phase. Collaborators are built
//! per run from the resolved credentials, so request-supplied keys never leak
//! into another run.

pub mod providers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::error;
use tracing::info;
use tracing::warn;

pub use providers::Credentials;
pub use providers::HttpProviderFactory;
pub use providers::ProviderFactory;
pub use providers::Providers;

use crate::analysis::AnalysisProcessor;
use crate::config::AppConfig;
use crate::config::CredentialsConfig;
use crate::errors::ResearchError;
use crate::models::MAX_RESULTS_LIMIT;
use crate::models::PipelineResult;
use crate::models::PipelineState;
use crate::models::PipelineStatus;
use crate::models::ReportRef;
use crate::models::ResearchOptions;
use crate::models::SearchResult;
use crate::models::SourceType;
use crate::models::VisualizationData;
use crate::report;
use crate::report::ReportWriter;
use crate::scrape::Scraper;
use crate::search::SearchService;
use crate::store::ResultCache;
use crate::vector_store::open_store;
use crate::vector_store::DocumentIndex;
use crate::visualization;
use crate::Result;

pub struct ResearchPipeline {
    config: Arc<AppConfig>,
    cache: Arc<ResultCache>,
    documents: Arc<DocumentIndex>,
    factory: Arc<dyn ProviderFactory>,
    reports: ReportWriter,
}

/// Services bound to one run's providers
struct RunServices {
    search: SearchService,
    scraper: Scraper,
    analysis: AnalysisProcessor,
    providers: Providers,
}

impl ResearchPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        cache: Arc<ResultCache>,
        documents: Arc<DocumentIndex>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        let reports = ReportWriter::new(&config.api.reports_dir);
        Self {
            config,
            cache,
            documents,
            factory,
            reports,
        }
    }

    /// HTTP providers and the configured vector store backend
    pub async fn from_config(config: Arc<AppConfig>, cache: Arc<ResultCache>) -> Result<Self> {
        let store = open_store(&config.vector_store, config.embeddings.dimension).await?;
        let documents = Arc::new(DocumentIndex::new(store, &config.vector_store));
        let factory = Arc::new(HttpProviderFactory::new(config.clone()));
        Ok(Self::new(config, cache, documents, factory))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn reports(&self) -> &ReportWriter {
        &self.reports
    }

    pub fn documents(&self) -> &DocumentIndex {
        &self.documents
    }

    /// Run with a freshly generated run id
    pub async fn run(
        &self,
        query: &str,
        options: ResearchOptions,
        credentials: Option<&CredentialsConfig>,
    ) -> Result<PipelineResult> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.run_with_id(&run_id, query, options, credentials).await
    }

    /// Run under a caller-chosen id (the API uses the job id).
    ///
    /// Credential and provider errors are returned before any phase starts.
    /// A failing phase is recorded on the state instead: the result comes
    /// back `Ok` with status `failed`, no report and empty charts.
    pub async fn run_with_id(
        &self,
        run_id: &str,
        query: &str,
        options: ResearchOptions,
        credentials: Option<&CredentialsConfig>,
    ) -> Result<PipelineResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::Validation("Query cannot be empty".to_string()));
        }

        let credentials = Credentials::resolve(&self.config.credentials, credentials)?;
        let providers = self.factory.build(&credentials)?;
        let services = RunServices {
            search: SearchService::new(providers.search.clone(), self.cache.clone(), &self.config.search),
            scraper: Scraper::new(providers.fetcher.clone(), self.cache.clone(), &self.config.scraper),
            analysis: AnalysisProcessor::new(providers.model.clone(), self.config.analysis.clone()),
            providers,
        };

        info!("🚀 Starting research run {} for query: {}", run_id, query);
        let started = Instant::now();
        let mut state = PipelineState::new(query, options);

        let outcome = self.execute(run_id, &mut state, &services, &started).await;
        let processing_time_secs = started.elapsed().as_secs_f64();

        let (visualization, report) = match outcome {
            Ok((visualization, report)) => {
                state.set_status(PipelineStatus::Completed);
                info!(
                    "✅ Research run {} completed in {:.2}s ({} results, {} pages)",
                    run_id,
                    processing_time_secs,
                    state.total_search_results(),
                    state.successful_pages()
                );
                (visualization, Some(report))
            }
            Err(e) => {
                error!("❌ Research run {} failed during {}: {}", run_id, state.status, e);
                state.fail(e.to_string());
                (VisualizationData::default(), None)
            }
        };

        Ok(PipelineResult {
            run_id: run_id.to_string(),
            state,
            visualization,
            report,
            processing_time_secs,
        })
    }

    async fn execute(
        &self,
        run_id: &str,
        state: &mut PipelineState,
        services: &RunServices,
        started: &Instant,
    ) -> Result<(VisualizationData, ReportRef)> {
        state.set_status(PipelineStatus::Searching);
        self.search_phase(state, &services.search).await;

        state.set_status(PipelineStatus::Scraping);
        let max_results = self.max_results(&state.options);
        let urls = scrape_targets(state, max_results.saturating_mul(2));
        info!("🌐 Scraping {} URLs", urls.len());
        state.scraped = services.scraper.scrape_urls(&urls).await;
        info!(
            "📄 Scraped {} pages ({} failed)",
            state.successful_pages(),
            state.failed_pages()
        );

        state.set_status(PipelineStatus::Storing);
        state.stored_documents = match self
            .documents
            .add_documents(&state.scraped, services.providers.embedder.as_ref())
            .await
        {
            Ok(stored) => {
                info!("💾 Stored {} documents in {} vector store", stored, self.documents.backend_name());
                stored
            }
            Err(e) => {
                warn!("Failed to store documents: {}", e);
                0
            }
        };

        state.set_status(PipelineStatus::Analyzing);
        let rated: Vec<SearchResult> = state.text_results().cloned().collect();
        let (credibility, mut analysis) = tokio::join!(
            services.analysis.credibility(&rated),
            services.analysis.analyze(&state.query, &state.scraped)
        );
        analysis.credibility = credibility;
        info!(
            "🧠 Analysis: {} entities, {} topics, {} timeline events",
            analysis.entities.len(),
            analysis.topics.len(),
            analysis.timeline.len()
        );

        state.set_status(PipelineStatus::Visualizing);
        let visualization = visualization::build(&analysis);
        state.analysis = Some(analysis);

        state.set_status(PipelineStatus::GeneratingReport);
        let html = report::render_html(state, &visualization, started.elapsed().as_secs_f64())?;
        let report = self.reports.write(run_id, &html).await?;
        info!("📝 Report written to {}", report.path);

        Ok((visualization, report))
    }

    async fn search_phase(&self, state: &mut PipelineState, search: &SearchService) {
        let query = state.query.clone();
        let options = state.options.clone();
        let num = Some(self.max_results(&options));

        let (web, news, images, videos) = tokio::join!(
            search.search_web(&query, num),
            async {
                if options.include_news {
                    search.search_news(&query, num).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_images {
                    search.search_images(&query, num).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_videos {
                    search.search_videos(&query, num).await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        state.web_results = or_empty(SourceType::Web, web);
        state.news_results = or_empty(SourceType::News, news);
        state.images = or_empty(SourceType::Image, images);
        state.videos = or_empty(SourceType::Video, videos);

        info!(
            "🔍 Search found {} web, {} news, {} images, {} videos",
            state.web_results.len(),
            state.news_results.len(),
            state.images.len(),
            state.videos.len()
        );
    }

    fn max_results(&self, options: &ResearchOptions) -> usize {
        options
            .max_results
            .filter(|n| *n > 0)
            .unwrap_or(self.config.search.max_results)
            .min(MAX_RESULTS_LIMIT)
    }
}

fn or_empty(source: SourceType, result: Result<Vec<SearchResult>>) -> Vec<SearchResult> {
    result.unwrap_or_else(|e| {
        warn!("{} search failed: {}", source, e);
        Vec::new()
    })
}

/// Web then news URLs, first occurrence wins, capped
fn scrape_targets(state: &PipelineState, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    state
        .text_results()
        .filter(|r| !r.url.is_empty())
        .filter(|r| seen.insert(r.url.as_str()))
        .take(cap)
        .map(|r| r.url.clone())
        .collect()
}
