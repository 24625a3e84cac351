//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write a config file holding every default
pub async fn cmd_init(config_path: &Path, force: bool) -> Result<PathBuf> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    info!("Initializing vodframes config at {:?}", config_path);

    let config = Config {
        config_file: config_path.to_path_buf(),
        ..Config::default()
    };
    config.save()?;

    Ok(config.config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/config.toml");

        let written = cmd_init(&path, false).await.unwrap();
        assert_eq!(written, path);

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.drift.countdown_offset_secs, 4);
        assert_eq!(loaded.layout.output_regions.len(), 2);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "cache_dir = \"/tmp/x\"\n").unwrap();

        assert!(matches!(cmd_init(&path, false).await, Err(Error::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "cache_dir = \"/tmp/x\"\n");

        cmd_init(&path, true).await.unwrap();
        assert!(Config::load(&path).is_ok());
    }
}
