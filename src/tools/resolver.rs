use super::{run_tool, stderr_summary, UrlResolver};
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::info;

/// Resolves broadcasts with a youtube-dl style `--get-url` invocation
pub struct CommandUrlResolver {
    program: String,
    args: Vec<String>,
    address_template: String,
}

impl CommandUrlResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            address_template: config.address_template.clone(),
        }
    }

    /// Broadcast address handed to the resolver
    pub fn address(&self, broadcast_id: i64) -> String {
        self.address_template
            .replace("{id}", &broadcast_id.to_string())
    }
}

#[async_trait]
impl UrlResolver for CommandUrlResolver {
    async fn resolve_url(&self, broadcast_id: i64) -> Result<String> {
        let address = self.address(broadcast_id);
        info!("Resolving playable URL for {}", address);

        let mut args = self.args.clone();
        args.push(address.clone());

        let output = run_tool(&self.program, &args).await?;
        if !output.status.success() {
            return Err(Error::Resolution(format!(
                "{} exited with {}",
                self.program,
                stderr_summary(&output)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::Resolution(format!("{} printed no URL for {}", self.program, address)))
    }
}
