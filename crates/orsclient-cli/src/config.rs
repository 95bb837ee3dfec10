//! Configuration management for the CLI
//!
//! Combines the provider file with command-line overrides:
//! - `--config` / `ORS_CONFIG` selects the provider file
//! - `--provider` selects the active provider
//! - `--api-key` / `ORS_API_KEY` replaces its stored key

use crate::cli::Cli;
use crate::error::{Error, Result};
use orsclient_core::{ProviderConfig, ProvidersFile};
use std::path::{Path, PathBuf};

/// Resolved CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the provider file, whether or not it exists
    pub path: PathBuf,
    /// Providers read from `path`, or the built-in default
    pub providers: ProvidersFile,
    /// Name of the active provider
    pub provider: String,
    api_key: Option<String>,
}

impl Config {
    /// Load configuration for the given command line
    pub fn load(cli: &Cli) -> Result<Self> {
        if cli.command.writes_provider_file() {
            Self::load_for_update(cli.config.as_deref(), &cli.provider, cli.api_key.clone())
        } else {
            Self::load_with_file(cli.config.as_deref(), &cli.provider, cli.api_key.clone())
        }
    }

    /// Load providers from `file`, falling back to the default location
    ///
    /// An explicitly named file must exist.
    pub fn load_with_file(file: Option<&Path>, provider: &str, api_key: Option<String>) -> Result<Self> {
        if let Some(path) = file.filter(|path| !path.exists()) {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_for_update(file, provider, api_key)
    }

    /// Load providers for a command that writes the file back
    ///
    /// A missing file, named or not, yields the built-in default.
    pub fn load_for_update(file: Option<&Path>, provider: &str, api_key: Option<String>) -> Result<Self> {
        let path = file.map(Path::to_path_buf).unwrap_or_else(ProvidersFile::default_path);
        let providers = ProvidersFile::load_or_default(&path)?;

        tracing::debug!(path = %path.display(), providers = providers.providers.len(), "Loaded provider file");

        Ok(Self {
            path,
            providers,
            provider: provider.to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    /// The active provider with command-line overrides applied
    pub fn active_provider(&self) -> Result<ProviderConfig> {
        let mut provider = self
            .providers
            .provider(&self.provider)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound {
                name: self.provider.clone(),
                config: self.path.clone(),
            })?;

        if let Some(key) = &self.api_key {
            provider.key = key.clone();
        }
        Ok(provider)
    }
}
