//! CLI commands implementation

pub mod clip;
pub mod init;
pub mod locate;
pub mod recover;
pub mod status;

pub use clip::*;
pub use init::*;
pub use locate::*;
pub use recover::*;
pub use status::*;

use crate::config::Config;
use crate::error::Result;
use crate::http::build_client;
use crate::playlist::PlaylistCache;
use crate::segment::SegmentResolver;
use crate::store::BroadcastIndex;
use crate::tools::CommandUrlResolver;
use std::path::Path;
use std::sync::Arc;

/// Wire the broadcast index, playlist cache and HTTP client together
pub(crate) async fn open_segment_resolver(
    config: &Config,
    broadcast_db: &Path,
) -> Result<SegmentResolver> {
    let client = build_client(&config.http)?;
    let resolver = Arc::new(CommandUrlResolver::new(&config.resolver));
    let cache = PlaylistCache::new(&config.cache_dir, resolver, client.clone());
    let index = BroadcastIndex::open(broadcast_db, &config.store).await?;
    Ok(SegmentResolver::new(index, cache, client, &config.http))
}
