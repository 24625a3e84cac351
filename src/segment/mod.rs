//! Resolve a point in time to the media segment that recorded it, and fetch it

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::playlist::{Playlist, PlaylistCache, Segment};
use crate::store::{Broadcast, BroadcastIndex};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// A located segment ready to download
#[derive(Debug, Clone)]
pub struct SegmentTask {
    pub target: DateTime<Utc>,
    pub broadcast: Broadcast,
    pub segment: Segment,
    /// Segment URI resolved against the playlist URL
    pub url: Url,
}

/// Result of a segment download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    /// The host reported the fragment as having no media; a zero-size
    /// marker was written in place of the segment
    FragmentAbsent { status: u16 },
}

pub struct SegmentResolver {
    index: BroadcastIndex,
    cache: PlaylistCache,
    client: Client,
    absent_statuses: Vec<u16>,
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

impl SegmentResolver {
    pub fn new(index: BroadcastIndex, cache: PlaylistCache, client: Client, http: &HttpConfig) -> Self {
        Self {
            index,
            cache,
            client,
            absent_statuses: http.absent_statuses.clone(),
        }
    }

    /// Find the broadcast and segment covering `target`
    pub async fn resolve(&self, target: DateTime<Utc>) -> Result<SegmentTask> {
        let broadcast = self
            .index
            .latest_started_by(target)
            .await?
            .ok_or_else(|| Error::NoBroadcastFound(target.to_rfc3339()))?;

        debug!(
            "Broadcast {} (started {}) selected for {}",
            broadcast.id, broadcast.recorded_at, target
        );
        if !broadcast.covers(target) {
            debug!(
                "{} is past the recorded length of broadcast {}",
                target, broadcast.id
            );
        }

        let cached = self.cache.get_or_fetch(broadcast.id).await?;
        let playlist = Playlist::parse(&cached.text)?;
        let segment = playlist
            .locate(broadcast.id, broadcast.recorded_at, target)?
            .clone();

        let url = Url::parse(&cached.url)?.join(&segment.uri)?;

        Ok(SegmentTask {
            target,
            broadcast,
            segment,
            url,
        })
    }

    /// Download a located segment to `output`
    ///
    /// The body is streamed into `<output>.part` and renamed on completion.
    pub async fn download(&self, task: &SegmentTask, output: &Path) -> Result<DownloadOutcome> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Downloading {} to {:?}", task.url, output);
        let response = self.client.get(task.url.clone()).send().await?;
        let status = response.status();

        if self.absent_statuses.contains(&status.as_u16()) {
            info!("Fragment absent (HTTP {}): {}", status.as_u16(), task.url);
            tokio::fs::File::create(output).await?;
            return Ok(DownloadOutcome::FragmentAbsent {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(Error::Download {
                url: task.url.to_string(),
                status: status.as_u16(),
            });
        }

        let part = part_path(output);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, output).await?;
        Ok(DownloadOutcome::Downloaded { bytes })
    }

    /// Resolve and download in one step
    pub async fn fetch(
        &self,
        target: DateTime<Utc>,
        output: &Path,
    ) -> Result<(SegmentTask, DownloadOutcome)> {
        let task = self.resolve(target).await?;
        let outcome = self.download(&task, output).await?;
        Ok((task, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::http::build_client;
    use crate::store::fixtures;
    use crate::tools::fakes::FakeResolver;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PLAYLIST: &str = "#EXTM3U
#EXT-X-TARGETDURATION:2
#EXTINF:2.000,
a.ts
#EXTINF:2.000,
b.ts
#EXTINF:2.000,
c.ts
#EXT-X-ENDLIST
";

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 5, 1, h, m, s).unwrap()
    }

    struct Harness {
        _tmp: TempDir,
        dir: PathBuf,
        server: MockServer,
        resolver: Arc<FakeResolver>,
        segments: SegmentResolver,
    }

    async fn harness(playlist: &str) -> Harness {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let db = dir.join("vods.db");
        fixtures::create_broadcast_index(&db, &[(1, "2016-05-01T09:59:59Z", 6)]).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vod/1/index.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(playlist))
            .mount(&server)
            .await;

        let http = HttpConfig::default();
        let client = build_client(&http).unwrap();
        let resolver = Arc::new(FakeResolver::new(format!("{}/vod/1/index.m3u8", server.uri())));
        let cache = PlaylistCache::new(dir.join("cache"), resolver.clone(), client.clone());
        let index = BroadcastIndex::open(&db, &StoreConfig::default()).await.unwrap();

        Harness {
            segments: SegmentResolver::new(index, cache, client, &http),
            _tmp: tmp,
            dir,
            server,
            resolver,
        }
    }

    #[tokio::test]
    async fn test_resolve_selects_covering_segment() {
        let h = harness(PLAYLIST).await;

        let task = h.segments.resolve(at(10, 0, 4)).await.unwrap();
        assert_eq!(task.broadcast.id, 1);
        assert_eq!(task.segment.uri, "c.ts");
        assert_eq!(task.url.as_str(), format!("{}/vod/1/c.ts", h.server.uri()));

        // Second lookup in the same broadcast reuses the cached playlist
        let task = h.segments.resolve(at(10, 0, 0)).await.unwrap();
        assert_eq!(task.segment.uri, "a.ts");
        assert_eq!(h.resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_without_broadcast_fails() {
        let h = harness(PLAYLIST).await;
        let result = h.segments.resolve(at(9, 0, 0)).await;
        assert!(matches!(result, Err(Error::NoBroadcastFound(_))));
        assert_eq!(h.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_past_end_of_playlist() {
        let h = harness(PLAYLIST).await;
        let result = h.segments.resolve(at(10, 0, 6)).await;
        assert!(matches!(result, Err(Error::SegmentNotFound { broadcast_id: 1, .. })));
    }

    #[tokio::test]
    async fn test_resolve_malformed_playlist() {
        let h = harness("#EXTINF:2.0,\n#EXTINF:2.0,\na.ts\n").await;
        let result = h.segments.resolve(at(10, 0, 0)).await;
        assert!(matches!(result, Err(Error::MalformedPlaylist { .. })));
    }

    #[tokio::test]
    async fn test_download_streams_to_output() {
        let h = harness(PLAYLIST).await;
        Mock::given(method("GET"))
            .and(path("/vod/1/c.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x47segment-c".to_vec()))
            .expect(1)
            .mount(&h.server)
            .await;

        let output = h.dir.join("ts/00/101.ts");
        let (task, outcome) = h.segments.fetch(at(10, 0, 4), &output).await.unwrap();

        assert_eq!(task.segment.uri, "c.ts");
        assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: 10 });
        assert_eq!(std::fs::read(&output).unwrap(), b"\x47segment-c");
        assert!(!part_path(&output).exists());
    }

    #[tokio::test]
    async fn test_absent_fragment_writes_empty_marker() {
        let h = harness(PLAYLIST).await;
        Mock::given(method("GET"))
            .and(path("/vod/1/b.ts"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&h.server)
            .await;

        let output = h.dir.join("ts/00/101.ts");
        let (_, outcome) = h.segments.fetch(at(10, 0, 2), &output).await.unwrap();

        assert_eq!(outcome, DownloadOutcome::FragmentAbsent { status: 403 });
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_server_error_is_download_error() {
        let h = harness(PLAYLIST).await;
        Mock::given(method("GET"))
            .and(path("/vod/1/a.ts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&h.server)
            .await;

        let output = h.dir.join("ts/00/101.ts");
        let result = h.segments.fetch(at(10, 0, 0), &output).await;

        assert!(matches!(result, Err(Error::Download { status: 503, .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/img/ts/00/101.ts")),
            PathBuf::from("/img/ts/00/101.ts.part")
        );
    }
}
