//! Authentication handling for routing-service providers
//!
//! The key travels twice: as the `api_key` query parameter and as the
//! `Authorization` header. Self-hosted instances may run without a key, the
//! public origin may not.

use std::sync::OnceLock;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use crate::types::ProviderConfig;
use crate::{Error, Result};

/// User agent sent when the caller does not override it
pub const DEFAULT_USER_AGENT: &str = concat!("orsclient/", env!("CARGO_PKG_VERSION"));

/// How requests to a provider are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Send the key as query parameter and header
    ApiKey(String),
    /// Self-hosted instance, no credential
    Anonymous,
}

impl Credentials {
    /// Resolve the credential for `provider`
    ///
    /// Fails when the key is empty and the provider points at the public
    /// default origin.
    pub fn resolve(provider: &ProviderConfig) -> Result<Self> {
        if !provider.key.is_empty() {
            Ok(Credentials::ApiKey(provider.key.clone()))
        } else if !provider.is_default_origin() {
            Ok(Credentials::Anonymous)
        } else {
            Err(Error::configuration(format!(
                "No API key specified for provider '{}'. Visit https://openrouteservice.org/dev to create one",
                provider.name
            )))
        }
    }

    /// The key to append to the query string, if any
    pub fn query_key(&self) -> Option<&str> {
        match self {
            Credentials::ApiKey(key) => Some(key),
            Credentials::Anonymous => None,
        }
    }
}

/// Build the fixed header set sent with every request
pub fn default_headers(provider: &ProviderConfig, user_agent: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let agent = user_agent.unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(agent).map_err(|e| Error::Configuration {
            message: format!("Invalid user agent '{}'", agent),
            source: Some(anyhow::anyhow!(e)),
        })?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if !provider.key.is_empty() {
        let mut value = HeaderValue::from_str(&provider.key).map_err(|e| Error::Configuration {
            message: format!("API key of provider '{}' is not a valid header value", provider.name),
            source: Some(anyhow::anyhow!(e)),
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

static API_KEY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Replace the value of the `api_key` query parameter with `***`
pub fn redact_url(url: &str) -> String {
    let regex = API_KEY_REGEX.get_or_init(|| {
        Regex::new(r"([?&]api_key=)[^&#]*").expect("Valid regex pattern")
    });
    regex.replace_all(url, "${1}***").into_owned()
}

/// Mask a key for display, keeping only its last four characters
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let count = key.chars().count();
    if count <= 4 {
        return "***".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("***{}", tail)
}
