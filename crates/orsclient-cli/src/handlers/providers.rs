//! Providers command handler

use crate::cli::{OutputFormat, ProvidersAction, ProvidersArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use orsclient_core::http::auth::mask_key;
use orsclient_core::{ProviderConfig, ProvidersFile};
use serde::Serialize;

/// A provider as shown to the user, with its key masked
#[derive(Debug, Serialize)]
struct ProviderView<'a> {
    name: &'a str,
    base_url: &'a str,
    key: String,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    queries_per_minute: Option<u32>,
    active: bool,
}

impl<'a> ProviderView<'a> {
    fn new(provider: &'a ProviderConfig, active: &str) -> Self {
        Self {
            name: &provider.name,
            base_url: &provider.base_url,
            key: if provider.key.is_empty() {
                String::new()
            } else {
                mask_key(&provider.key)
            },
            timeout: provider.timeout,
            queries_per_minute: provider.queries_per_minute,
            active: provider.name == active,
        }
    }
}

/// Handle the providers command
pub async fn handle_providers(args: ProvidersArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action.unwrap_or(ProvidersAction::List) {
        ProvidersAction::List => list(config, output),
        ProvidersAction::Init { force } => {
            if config.path.exists() && !force {
                return Err(Error::invalid_args(format!(
                    "{} already exists, use --force to overwrite",
                    config.path.display()
                )));
            }
            ProvidersFile::default().save(&config.path)?;
            output.success(&format!("✓ Wrote {}", config.path.display()))
        }
        ProvidersAction::SetKey { name, key } => {
            let mut providers = config.providers.clone();
            let mut provider = providers
                .provider(&name)
                .cloned()
                .ok_or_else(|| Error::ProviderNotFound {
                    name: name.clone(),
                    config: config.path.clone(),
                })?;
            provider.key = key;
            providers.upsert(provider);
            providers.save(&config.path)?;
            output.success(&format!("✓ Stored key for '{}' in {}", name, config.path.display()))
        }
        ProvidersAction::Add {
            name,
            base_url,
            key,
            timeout,
            queries_per_minute,
        } => {
            let mut provider = ProviderConfig::new(&name, base_url, key).with_timeout(timeout);
            if let Some(limit) = queries_per_minute {
                if limit == 0 {
                    return Err(Error::invalid_args("--queries-per-minute must be greater than zero"));
                }
                provider = provider.with_queries_per_minute(limit);
            }
            let mut providers = config.providers.clone();
            providers.upsert(provider);
            providers.validate()?;
            providers.save(&config.path)?;
            output.success(&format!("✓ Saved provider '{}' to {}", name, config.path.display()))
        }
    }
}

fn list(config: &Config, output: &mut OutputWriter) -> Result<()> {
    let views: Vec<ProviderView<'_>> = config
        .providers
        .providers
        .iter()
        .map(|p| ProviderView::new(p, &config.provider))
        .collect();

    if output.format() != OutputFormat::Human {
        return output.write_value(&views);
    }

    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            vec![
                format!("{}{}", if v.active { "* " } else { "  " }, v.name),
                v.base_url.to_string(),
                if v.key.is_empty() { "-".to_string() } else { v.key.clone() },
                format!("{}s", v.timeout),
                v.queries_per_minute.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    output.table(&["  NAME", "BASE URL", "KEY", "TIMEOUT", "QPM"], &rows)?;
    output.info(&format!("Provider file: {}", config.path.display()))
}
