//! CLI output formatting utilities

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::models::PipelineResult;
use crate::models::SearchResult;
use crate::pipeline::providers::mask;
use crate::store::CacheStats;

/// Safely truncate a string at character boundary (not byte boundary)
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// File stem for a query: spaces become underscores, path separators are dropped
#[must_use]
pub fn query_file_stem(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// `results/{query_with_underscores}`
#[must_use]
pub fn default_output_dir(query: &str) -> PathBuf {
    PathBuf::from("results").join(query_file_stem(query))
}

pub fn print_search_results(query: &str, search_type: &str, results: &[SearchResult]) {
    println!();
    println!("🔍 Search results for: {query}");
    println!("Type: {search_type}");
    println!("Results: {}", results.len());
    println!("{}", "-".repeat(50));

    for (i, result) in results.iter().enumerate() {
        println!("{}. {}", i + 1, result.title);
        println!("   {}", result.url);
        if !result.snippet.is_empty() {
            println!("   {}", truncate_str(&result.snippet, 200));
        }
        println!();
    }
}

pub fn print_research_summary(result: &PipelineResult) {
    let state = &result.state;
    println!();
    println!("📊 Research completed for: {}", state.query);
    println!("  Status: {}", state.status);
    println!("  Processing time: {:.2} seconds", result.processing_time_secs);
    println!("  Search results: {}", state.total_search_results());
    println!(
        "  Pages scraped: {} ({} failed)",
        state.successful_pages(),
        state.failed_pages()
    );
    println!("  Documents stored: {}", state.stored_documents);

    if let Some(analysis) = &state.analysis {
        println!("  Entities: {}", analysis.entities.len());
        println!("  Topics: {}", analysis.topics.len());
        println!(
            "  Sentiment: {} ({:.2})",
            analysis.sentiment.label.as_str(),
            analysis.sentiment.polarity
        );
    }
}

pub fn print_cache_stats(stats: &CacheStats) {
    println!("📦 Cache Statistics ({}):", stats.backend);
    println!("  Total entries: {}", stats.total);
    println!("  Active entries: {}", stats.active);
    println!("  Expired entries: {}", stats.expired);
    println!("  Estimated size: {} bytes", stats.estimated_size_bytes);
    println!("  Cache expiration: {} seconds", stats.expire_seconds);
    println!(
        "  Hits: {} | Misses: {} | Evictions: {} | Hit rate: {:.1}%",
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.hit_rate() * 100.0
    );
}

fn key_status(value: Option<&str>) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => format!("✓ Set ({})", mask(v)),
        None => "✗ Not set".to_string(),
    }
}

/// Print configuration with secrets masked
pub fn print_config(config: &AppConfig) {
    println!("📋 Content Research Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!();

    println!("🔍 Search:");
    println!("  Max search results: {}", config.max_search_results());
    println!("  Timeout: {}s", config.search.timeout_secs);
    println!();

    println!("🌐 Scraper:");
    println!("  Max concurrent: {}", config.scraper.max_concurrent);
    println!("  User agent: {}", config.scraper.user_agent);
    println!();

    println!("🧠 LLM:");
    println!("  Model: {}", config.llm_model());
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!("  Max topics: {}", config.analysis.max_topics);
    println!();

    println!("🧮 Embeddings & vector store:");
    println!("  Embeddings: {} ({}, dim {})", config.embeddings.provider, config.embeddings.model, config.embeddings.dimension);
    println!("  Backend: {}", config.vector_store.backend);
    println!("  Directory: {}", config.persist_directory().display());
    println!(
        "  Chunking: {} chars, {} overlap",
        config.vector_store.chunk_size, config.vector_store.chunk_overlap
    );
    if let Some(url) = &config.vector_store.database_url {
        println!("  Database: {}", mask_database_url(url));
    }
    println!();

    println!("📦 Cache & Redis:");
    println!("  Cache expiration: {} seconds", config.cache.expire_seconds);
    println!("  Redis: {}:{} (db {})", config.redis.host, config.redis.port, config.redis.db);
    println!();

    println!("🌍 API:");
    println!("  Bind: {}:{}", config.api.host, config.api.port);
    println!("  CORS: {}", if config.api.enable_cors { "Enabled" } else { "Disabled" });
    println!("  API key: {}", key_status(config.api.api_key.as_deref()));
    println!("  Reports: {}", config.reports_dir().display());
    println!();

    println!("🔑 API Key Status:");
    println!("  OpenAI API Key: {}", key_status(config.credentials.openai_api_key.as_deref()));
    println!("  Google API Key: {}", key_status(config.credentials.google_api_key.as_deref()));
    println!("  Google CSE ID: {}", key_status(config.credentials.google_cse_id.as_deref()));
}

fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            format!(
                "{}://{}@{}:{}",
                parsed.scheme(),
                parsed.username(),
                host,
                parsed.port().unwrap_or(5432)
            )
        } else {
            "***masked***".to_string()
        }
    } else {
        "***invalid***".to_string()
    }
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
