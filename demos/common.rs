//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument and environment parsing
//! - Logging initialization

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments and environment for demos.
///
/// The gateway host and token come from `WISER_HOST` and `WISER_TOKEN`.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub host: String,
    pub token: String,
}

impl Args {
    /// Parse command-line arguments and environment.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            host: std::env::var("WISER_HOST").unwrap_or_else(|_| "wiser.local".to_string()),
            token: std::env::var("WISER_TOKEN").unwrap_or_default(),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "wiser_gateway=debug"
    } else {
        "wiser_gateway=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
