//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - research: Full research runs and quick searches
//! - info: Configuration display, cache management and validation
//! - serve: API server

pub mod info;
pub mod research;
pub mod serve;

pub use info::*;
pub use research::*;
pub use serve::*;
