//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand
//! plus the argument parsing they share.

mod batch;
mod providers;
mod request;

pub use batch::handle_batch;
pub use providers::handle_providers;
pub use request::handle_request;

use crate::config::Config;
use crate::error::{Error, Result};
use orsclient_core::{CancellationToken, Client, QueryParams};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Build a client for the active provider
fn build_client(config: &Config) -> Result<Client> {
    let provider = config.active_provider()?;
    tracing::info!(provider = %provider.name, base_url = %provider.base_url, "Using provider");
    Ok(Client::new(provider)?)
}

/// Parse repeated `key=value` arguments into query parameters
///
/// Later occurrences of a key replace earlier ones.
fn parse_params(raw: &[String]) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_args(format!("parameter '{}' is not in key=value form", pair)))?;
        if key.is_empty() {
            return Err(Error::invalid_args(format!("parameter '{}' has an empty key", pair)));
        }
        params.insert(key, value);
    }
    Ok(params)
}

/// Parse `--body`: inline JSON, or `@path` to read it from a file
fn parse_body(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let content = match raw.strip_prefix('@') {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(Error::FileNotFound { path });
            }
            fs::read_to_string(&path)?
        }
        None => raw.to_string(),
    };

    let body = serde_json::from_str(&content)
        .map_err(|e| Error::invalid_args(format!("body is not valid JSON: {}", e)))?;
    Ok(Some(body))
}

/// A token that is cancelled when the user presses Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&[
            "start=8.68,49.41".to_string(),
            "end=8.69,49.42".to_string(),
            "start=1,1".to_string(),
        ])
        .unwrap();
        assert_eq!(
            params.encoding_pairs(),
            vec![("end", "8.69,49.42".to_string()), ("start", "1,1".to_string())]
        );
    }

    #[test]
    fn test_parse_params_keeps_equals_in_value() {
        let params = parse_params(&["filter=a=b".to_string()]).unwrap();
        assert_eq!(params.encoding_pairs(), vec![("filter", "a=b".to_string())]);
    }

    #[test]
    fn test_parse_params_rejects_missing_separator() {
        let err = parse_params(&["start".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_parse_body_inline_and_file() {
        assert!(parse_body(None).unwrap().is_none());

        let inline = parse_body(Some(r#"{"range": [300]}"#)).unwrap().unwrap();
        assert_eq!(inline["range"][0], 300);

        let dir = tempdir().unwrap();
        let path = dir.path().join("body.json");
        fs::write(&path, r#"{"coordinates": [[8.68, 49.41]]}"#).unwrap();
        let from_file = parse_body(Some(&format!("@{}", path.display()))).unwrap().unwrap();
        assert!(from_file["coordinates"].is_array());
    }

    #[test]
    fn test_parse_body_errors() {
        assert!(matches!(parse_body(Some("{not json")), Err(Error::InvalidArgs(_))));
        assert!(matches!(
            parse_body(Some("@/definitely/not/here.json")),
            Err(Error::FileNotFound { .. })
        ));
    }
}
