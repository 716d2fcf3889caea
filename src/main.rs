use clap::Parser;
use content_research::cli::*;
use content_research::config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging
    if cli.verbose {
        content_research::logging::init_logging_with_level("debug")?;
    } else {
        content_research::logging::init_logging_with_config(&config)?;
    }
    info!("Configuration loaded successfully");

    let outcome = match cli.command {
        Commands::Research {
            query,
            output,
            format,
            max_results,
            no_images,
            no_videos,
            no_news,
        } => {
            handle_research_command(
                &config,
                query,
                output,
                format,
                max_results,
                no_images,
                no_videos,
                no_news,
            )
            .await
        }
        Commands::Search {
            query,
            num_results,
            search_type,
        } => handle_search_command(&config, query, num_results, search_type).await,
        Commands::Cache { stats, clear } => handle_cache_command(&config, stats, clear).await,
        Commands::Config => handle_config_command(&config),
        Commands::Serve { host, port, cors } => handle_serve_api(&config, host, port, cors).await,
        Commands::Validate => handle_validate_command(&config).await,
    };

    if let Err(e) = outcome {
        print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
