/// `load_config` module: Loads a static YAML config and the publish secrets
/// from the environment.
///
/// This is the only place where user-supplied YAML is parsed into the typed
/// [`Config`] from `wp-snapshot-core`.
///
/// # Responsibilities
/// - Parse the YAML file; every section except `source` is optional and
///   falls back to defaults
/// - Validate values the harvest loop cannot run with (zero page size,
///   inverted delay window, empty base URL)
/// - Read `GITHUB_TOKEN` / `GITHUB_REPOSITORY` for publishing; secrets never
///   live in the YAML file
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::github::{REPOSITORY_ENV, TOKEN_ENV};
use wp_snapshot_core::config::Config;

/// Credentials for the remote repository.
#[derive(Clone)]
pub struct PublishSecrets {
    pub token: String,
    pub repository: String,
}

impl std::fmt::Debug for PublishSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSecrets")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .finish()
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: Config = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    validate(&config).with_context(|| format!("Invalid config in {:?}", path_ref))?;
    config.trace_loaded();
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.source.base_url.trim().is_empty() {
        bail!("source.base_url must not be empty");
    }
    if !config.source.base_url.starts_with("http://") && !config.source.base_url.starts_with("https://") {
        bail!("source.base_url must be an http(s) URL, got {:?}", config.source.base_url);
    }
    if config.harvest.page_size == 0 || config.harvest.page_size > 100 {
        // WordPress caps per_page at 100.
        bail!("harvest.page_size must be between 1 and 100, got {}", config.harvest.page_size);
    }
    if config.pacing.min_delay_ms > config.pacing.max_delay_ms {
        bail!(
            "pacing.min_delay_ms ({}) must not exceed pacing.max_delay_ms ({})",
            config.pacing.min_delay_ms,
            config.pacing.max_delay_ms
        );
    }
    if config.publish.path.trim().is_empty() {
        bail!("publish.path must not be empty");
    }
    Ok(())
}

/// Reads the publish credentials from the environment (after `.env`).
pub fn load_secrets() -> Result<PublishSecrets> {
    dotenvy::dotenv().ok();
    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("GITHUB_TOKEN found in env");
            token
        }
        Ok(_) => {
            error!("GITHUB_TOKEN is empty");
            bail!("{TOKEN_ENV} environment variable is empty");
        }
        Err(e) => {
            error!(error = ?e, "GITHUB_TOKEN environment variable not set");
            bail!("{TOKEN_ENV} environment variable not set: {e}");
        }
    };
    let repository = match std::env::var(REPOSITORY_ENV) {
        Ok(repo) if repo.split('/').filter(|s| !s.is_empty()).count() == 2 => repo,
        Ok(repo) => {
            error!(repository = %repo, "GITHUB_REPOSITORY must look like owner/name");
            bail!("{REPOSITORY_ENV} must look like owner/name, got {repo:?}");
        }
        Err(e) => {
            error!(error = ?e, "GITHUB_REPOSITORY environment variable not set");
            bail!("{REPOSITORY_ENV} environment variable not set: {e}");
        }
    };
    info!(repository = %repository, "Publish secrets loaded");
    Ok(PublishSecrets { token, repository })
}
