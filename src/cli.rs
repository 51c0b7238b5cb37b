use clap::Parser;

use crate::config::{ConfigError, ProgramConfig};

#[derive(Parser, Debug)]
#[command(
    name = "webindex",
    about = "Concurrent web crawler with an inverted keyword index and phrase search",
    version
)]
pub struct Cli {
    /// Number of crawl workers to start
    #[arg(long, default_value_t = 4)]
    pub crawlers: usize,

    /// User agent token sent with every request
    #[arg(long, default_value = "WebIndexBot/1.0")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub timeout: u64,

    /// Linking tasks a worker may have in flight before it stops popping
    #[arg(long, default_value_t = 8)]
    pub max_inflight_links: usize,

    /// JSON config file; when set it overrides the flags above
    #[arg(long)]
    pub config: Option<String>,
}

impl Cli {
    /// Resolves the effective configuration from the config file when one
    /// is given, otherwise from the flags.
    pub fn resolve_config(&self) -> Result<ProgramConfig, ConfigError> {
        match &self.config {
            Some(path) => ProgramConfig::load(path),
            None => {
                let config = ProgramConfig {
                    crawlers: self.crawlers,
                    user_agent: self.user_agent.clone(),
                    timeout_secs: self.timeout,
                    max_inflight_links: self.max_inflight_links,
                };
                config.validate()?;
                Ok(config)
            }
        }
    }
}
