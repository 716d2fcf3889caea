//! Information and maintenance handlers (config, cache, validate)

use crate::cli::output::*;
use crate::errors::ResearchError;
use crate::store::RedisClient;
use crate::store::ResultCache;
use crate::AppConfig;
use crate::Result;

pub fn handle_config_command(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}

pub async fn handle_cache_command(config: &AppConfig, stats: bool, clear: bool) -> Result<()> {
    if !stats && !clear {
        print_info("Use --stats to show cache statistics or --clear to clear cache");
        return Ok(());
    }

    let cache = ResultCache::connect(config).await;

    if clear {
        let removed = cache.clear().await?;
        print_success(&format!("Cache cleared successfully ({removed} entries removed)"));
    }

    if stats {
        print_cache_stats(&cache.stats().await?);
    }

    Ok(())
}

/// Check settings, credentials, writable directories and Redis reachability
pub async fn handle_validate_command(config: &AppConfig) -> Result<()> {
    println!("🔎 Validating configuration...");

    let report = config.validate();
    let mut errors = report.errors;
    let mut warnings = report.warnings;

    for name in &report.missing_credentials {
        errors.push(format!("{name} is not set"));
    }

    if config.vector_store.backend == "local" {
        let dir = config.persist_directory();
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => print_success(&format!("Vector store directory accessible: {}", dir.display())),
            Err(e) => errors.push(format!("Cannot access vector store directory {}: {e}", dir.display())),
        }
    }

    let reports = config.reports_dir();
    match tokio::fs::create_dir_all(&reports).await {
        Ok(()) => print_success(&format!("Reports directory accessible: {}", reports.display())),
        Err(e) => errors.push(format!("Cannot access reports directory {}: {e}", reports.display())),
    }

    match RedisClient::connect(&config.redis) {
        Ok(client) => match client.ping().await {
            Ok(()) => print_success(&format!("Redis reachable at {}", client.display_url())),
            Err(e) => warnings.push(format!(
                "Redis unreachable ({e}); jobs and cache will be kept in memory"
            )),
        },
        Err(e) => warnings.push(format!("Invalid Redis settings: {e}")),
    }

    for warning in &warnings {
        print_warning(warning);
    }

    if errors.is_empty() {
        println!();
        print_success("All validations passed");
        return Ok(());
    }

    println!();
    println!("Validation errors:");
    for error in &errors {
        println!("  ✗ {error}");
    }
    Err(ResearchError::ConfigError(format!(
        "{} validation error(s)",
        errors.len()
    )))
}
