//! Disk cache of playlists and resolved playable URLs, keyed by broadcast id
//!
//! Entries never expire. A hit needs both files; anything less is refetched.

use crate::error::{Error, Result};
use crate::tools::UrlResolver;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Playlist text together with the URL it was downloaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPlaylist {
    pub text: String,
    pub url: String,
}

pub struct PlaylistCache {
    dir: PathBuf,
    resolver: Arc<dyn UrlResolver>,
    client: Client,
}

impl PlaylistCache {
    pub fn new(dir: impl Into<PathBuf>, resolver: Arc<dyn UrlResolver>, client: Client) -> Self {
        Self {
            dir: dir.into(),
            resolver,
            client,
        }
    }

    pub fn playlist_path(&self, broadcast_id: i64) -> PathBuf {
        self.dir.join(broadcast_id.to_string())
    }

    pub fn url_path(&self, broadcast_id: i64) -> PathBuf {
        self.dir.join(format!("{}_url", broadcast_id))
    }

    /// Read a cached entry without touching the network
    pub async fn load(&self, broadcast_id: i64) -> Result<Option<CachedPlaylist>> {
        let playlist_path = self.playlist_path(broadcast_id);
        let url_path = self.url_path(broadcast_id);
        if !playlist_path.is_file() || !url_path.is_file() {
            return Ok(None);
        }

        let text = tokio::fs::read_to_string(&playlist_path).await?;
        let url = tokio::fs::read_to_string(&url_path).await?;
        Ok(Some(CachedPlaylist {
            text,
            url: url.trim().to_string(),
        }))
    }

    /// Cached playlist for a broadcast, resolving and downloading it on a miss
    pub async fn get_or_fetch(&self, broadcast_id: i64) -> Result<CachedPlaylist> {
        if let Some(cached) = self.load(broadcast_id).await? {
            debug!("Playlist cache hit for broadcast {}", broadcast_id);
            return Ok(cached);
        }

        info!("Resolving playable URL for broadcast {}", broadcast_id);
        let url = self.resolver.resolve_url(broadcast_id).await?;
        let text = self.download(&url).await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.playlist_path(broadcast_id), &text).await?;
        // The entry counts as cached once the URL file exists
        tokio::fs::write(self.url_path(broadcast_id), &url).await?;

        Ok(CachedPlaylist { text, url })
    }

    async fn download(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {} from {}", status.as_u16(), url)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))
    }
}
