//! orsclient Core - HTTP client for openrouteservice-compatible routing APIs
//!
//! This crate provides the request layer used by routing front ends: it
//! builds authenticated URLs, retries rate-limited requests within a time
//! budget, records quota headers and reports failures as typed errors.
//!
//! # Main Components
//!
//! - **Error Handling**: A single [`Error`] taxonomy using `thiserror`
//! - **Core Types**: [`ProviderConfig`], [`QueryParams`] and friends
//! - **HTTP Client**: [`Client::request`], retry, rate limiting and quota capture
//! - **Configuration**: [`ProvidersFile`] for YAML/JSON provider lists
//! - **Batches**: [`run_batch`] with per-job error propagation
//!
//! # Example
//!
//! ```no_run
//! use orsclient_core::{Client, ProviderConfig, QueryParams, Result};
//! use serde_json::json;
//!
//! async fn example() -> Result<()> {
//!     let client = Client::new(ProviderConfig::openrouteservice("my-key"))?;
//!     let body = json!({"coordinates": [[8.681495, 49.41461], [8.687872, 49.420318]]});
//!     let route = client
//!         .request("/v2/directions/driving-car/geojson", &QueryParams::new(), Some(&body))
//!         .await?;
//!     println!("{}", route["type"]);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

#[cfg(feature = "blocking")]
pub mod blocking;

// Re-export main types for convenience
pub use batch::{run_batch, BatchJob, BatchOptions, BatchReport, JobOutcome, ProgressHook};
pub use config::ProvidersFile;
pub use error::{Error, ErrorKind, Result};
pub use http::{Client, QuotaSink, QuotaState, RequestOptions, RetryHook, RetryPolicy};
pub use types::{ProviderConfig, QueryParams, QueryValue, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

// Cancellation token accepted by request and batch options
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
