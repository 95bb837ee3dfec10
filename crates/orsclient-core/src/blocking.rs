//! Synchronous client
//!
//! Wraps the async [`crate::Client`] and drives it on an internal
//! current-thread runtime. Do not use it from inside an async context;
//! tokio panics when a runtime is blocked on from within another.

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use crate::http::client::{Client as AsyncClient, RequestOptions};
use crate::types::{ProviderConfig, QueryParams};
use crate::{Error, Result};

/// Blocking counterpart of [`crate::Client`]
#[derive(Debug)]
pub struct Client {
    inner: AsyncClient,
    runtime: Runtime,
}

impl Client {
    pub fn new(provider: ProviderConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Io {
                message: "Failed to start runtime for blocking client".to_string(),
                source: e,
            })?;
        let inner = AsyncClient::new(provider)?;
        Ok(Self { inner, runtime })
    }

    /// Wrap an already configured async client
    pub fn from_async(inner: AsyncClient) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Io {
                message: "Failed to start runtime for blocking client".to_string(),
                source: e,
            })?;
        Ok(Self { inner, runtime })
    }

    pub fn provider(&self) -> &ProviderConfig {
        self.inner.provider()
    }

    /// Send a request and block until it succeeds or fails for good
    pub fn request(&self, path: &str, params: &QueryParams, body: Option<&Value>) -> Result<Value> {
        self.runtime.block_on(self.inner.request(path, params, body))
    }

    pub fn request_with(
        &self,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
        options: RequestOptions<'_>,
    ) -> Result<Value> {
        self.runtime
            .block_on(self.inner.request_with(path, params, body, options))
    }
}
