//! Configuration loading for inbox services
//!
//! Supports loading service endpoints from (in order of priority):
//! 1. JSON file (~/.config/courier/services.json)
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Endpoints filename in the courier config directory
const SERVICES_FILE: &str = "services.json";

/// Remote service endpoints and the workspace API token
///
/// One token authenticates against all three services; they sit behind
/// the same gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    /// Base URL of the message delivery service
    pub delivery_url: String,
    /// Base URL of the attachment storage service
    pub storage_url: String,
    /// Base URL of the reply suggestion service
    pub suggest_url: String,
    /// Bearer token for the workspace
    pub api_token: String,
}

impl ServiceEndpoints {
    /// Load endpoints using the following priority:
    /// 1. JSON file (~/.config/courier/services.json)
    /// 2. Runtime environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(SERVICES_FILE) {
            return config::load_json(SERVICES_FILE);
        }
        Self::from_env()
    }

    /// Load endpoints from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse endpoints from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse service endpoints JSON")
    }

    /// Load endpoints from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            delivery_url: std::env::var("COURIER_DELIVERY_URL")
                .context("COURIER_DELIVERY_URL environment variable not set")?,
            storage_url: std::env::var("COURIER_STORAGE_URL")
                .context("COURIER_STORAGE_URL environment variable not set")?,
            suggest_url: std::env::var("COURIER_SUGGEST_URL")
                .context("COURIER_SUGGEST_URL environment variable not set")?,
            api_token: std::env::var("COURIER_API_TOKEN")
                .context("COURIER_API_TOKEN environment variable not set")?,
        })
    }

}
