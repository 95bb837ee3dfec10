//! Provider configuration file
//!
//! A YAML or JSON document listing the known providers:
//!
//! ```yaml
//! providers:
//!   - name: openrouteservice
//!     base_url: https://api.openrouteservice.org
//!     key: ''
//!     timeout: 60
//!     ENV_VARS:
//!       ORS_QUOTA: X-Ratelimit-Limit
//!       ORS_REMAINING: X-Ratelimit-Remaining
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::types::ProviderConfig;
use crate::{Error, Result};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "ORS_CONFIG";

/// All configured providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersFile {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for ProvidersFile {
    fn default() -> Self {
        Self {
            providers: vec![ProviderConfig::openrouteservice("")],
        }
    }
}

impl ProvidersFile {
    /// Load providers from `path`; `.yaml`/`.yml` is parsed as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("Failed to read {}", path.display()),
            source: e,
        })?;

        let file: ProvidersFile = if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| Error::Configuration {
                message: format!("Invalid provider file {}: {}", path.display(), e),
                source: Some(anyhow::anyhow!(e)),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| Error::Configuration {
                message: format!("Invalid provider file {}: {}", path.display(), e),
                source: Some(anyhow::anyhow!(e)),
            })?
        };

        file.validate()?;
        Ok(file)
    }

    /// Load from `path` if it exists, the built-in default otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No provider file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write providers to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| Error::Configuration {
                message: format!("Failed to serialize providers: {}", e),
                source: Some(anyhow::anyhow!(e)),
            })?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| Error::Json {
                message: "Failed to serialize providers".to_string(),
                source: e,
            })?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Io {
                message: format!("Failed to create {}", parent.display()),
                source: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| Error::Io {
            message: format!("Failed to write {}", path.display()),
            source: e,
        })
    }

    /// Look up a provider by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Insert `provider`, replacing any provider with the same name
    pub fn upsert(&mut self, provider: ProviderConfig) {
        match self.providers.iter_mut().find(|p| p.name == provider.name) {
            Some(existing) => *existing = provider,
            None => self.providers.push(provider),
        }
    }

    /// Reject duplicate names and empty origins
    pub fn validate(&self) -> Result<()> {
        for (i, provider) in self.providers.iter().enumerate() {
            if provider.name.is_empty() {
                return Err(Error::configuration(format!("Provider #{} has no name", i + 1)));
            }
            if provider.base_url.is_empty() {
                return Err(Error::configuration(format!(
                    "Provider '{}' has no base_url",
                    provider.name
                )));
            }
            if self.providers[..i].iter().any(|p| p.name == provider.name) {
                return Err(Error::configuration(format!(
                    "Provider '{}' is defined more than once",
                    provider.name
                )));
            }
        }
        Ok(())
    }

    /// `$ORS_CONFIG`, else `<config dir>/orsclient/providers.yaml`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("orsclient")
            .join("providers.yaml")
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}
