//! Shared HTTP client construction

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use std::time::Duration;

/// Build the client used for playlists and segments
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}
