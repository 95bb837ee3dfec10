//! HTTP client implementation for routing-service communication
//!
//! This module provides a robust HTTP client with:
//! - Authenticated URL construction with deterministic query encoding
//! - Status classification and error-payload parsing
//! - Retry of rate-limited requests with jittered exponential backoff
//! - An overall time budget per logical request
//! - Optional self-imposed sliding-window rate limiting
//! - Quota header propagation into a shared state

pub mod auth;
pub mod builder;
pub mod client;
pub mod error;
pub mod quota;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use auth::{Credentials, DEFAULT_USER_AGENT};
pub use builder::{encode_query, RequestBuilder};
pub use client::{Client, RequestOptions, RetryHook};
pub use error::ErrorClassification;
pub use quota::{QuotaSink, QuotaState};
pub use rate_limit::SlidingWindowLimiter;
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportErrorKind, TransportRequest,
    TransportResponse,
};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
