//! Research and quick search handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::commands::OutputFormat;
use crate::cli::commands::SearchKind;
use crate::cli::output::*;
use crate::errors::ResearchError;
use crate::models::ResearchOptions;
use crate::models::SourceType;
use crate::pipeline::ResearchPipeline;
use crate::search::GoogleSearchClient;
use crate::search::SearchService;
use crate::store::ResultCache;
use crate::AppConfig;
use crate::Result;

#[allow(clippy::too_many_arguments)]
pub async fn handle_research_command(
    config: &AppConfig,
    query: String,
    output: Option<PathBuf>,
    format: OutputFormat,
    max_results: Option<usize>,
    no_images: bool,
    no_videos: bool,
    no_news: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| default_output_dir(&query));
    tokio::fs::create_dir_all(&output).await?;

    let options = ResearchOptions {
        include_images: !no_images,
        include_videos: !no_videos,
        include_news: !no_news,
        max_results,
    };

    let config = Arc::new(config.clone());
    let cache = Arc::new(ResultCache::connect(&config).await);
    let pipeline = ResearchPipeline::from_config(config, cache).await?;

    print_info(&format!("Researching: {query}"));
    let result = pipeline.run(&query, options, None).await?;

    if !result.is_completed() {
        let reason = result.state.error.as_deref().unwrap_or("unknown error");
        return Err(ResearchError::Custom(format!("Research failed: {reason}")));
    }

    let stem = query_file_stem(&query);

    if format.writes_html() {
        let report = result
            .report
            .as_ref()
            .ok_or_else(|| ResearchError::ReportError("No report was generated".to_string()))?;
        let html = tokio::fs::read_to_string(&report.path).await?;
        let html_path = output.join(format!("{stem}.html"));
        tokio::fs::write(&html_path, html).await?;
        print_success(&format!("HTML report saved to: {}", html_path.display()));
    }

    if format.writes_json() {
        let json_path = output.join(format!("{stem}.json"));
        tokio::fs::write(&json_path, serde_json::to_string_pretty(&result)?).await?;
        print_success(&format!("JSON data saved to: {}", json_path.display()));
    }

    print_research_summary(&result);
    println!("  Results saved to: {}", output.display());

    Ok(())
}

pub async fn handle_search_command(
    config: &AppConfig,
    query: String,
    num_results: usize,
    search_type: SearchKind,
) -> Result<()> {
    let credentials = &config.credentials;
    let (Some(api_key), Some(cse_id)) = (
        credentials.google_api_key.clone().filter(|k| !k.trim().is_empty()),
        credentials.google_cse_id.clone().filter(|k| !k.trim().is_empty()),
    ) else {
        return Err(ResearchError::ConfigError(
            "GOOGLE_API_KEY and GOOGLE_CSE_ID must be set to search".to_string(),
        ));
    };

    let provider = Arc::new(GoogleSearchClient::new(&config.search, api_key, cse_id)?);
    let cache = Arc::new(ResultCache::connect(config).await);
    let service = SearchService::new(provider, cache, &config.search);

    let source = SourceType::from(search_type);
    let results = service.search(&query, source, Some(num_results)).await?;
    print_search_results(&query, source.as_str(), &results);

    Ok(())
}
