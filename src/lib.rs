//! Content research pipeline
//!
//! Searches the web, scrapes the hits, indexes them in a vector store, runs
//! LLM and local text analysis over the content and renders an HTML report.
//! Runs are driven from the CLI or queued as jobs through the HTTP API.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod scrape;
pub mod search;
pub mod store;
pub mod vector_store;
pub mod visualization;

#[cfg(test)]
mod errors_tests;

pub use config::AppConfig;
pub use errors::*;
pub use pipeline::ResearchPipeline;
