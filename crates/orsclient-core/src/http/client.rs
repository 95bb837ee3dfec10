//! Unified HTTP client orchestrating all components
//!
//! [`Client::request`] is the single operation callers use: it builds the
//! authenticated URL, sends the request, retries rate-limited attempts with
//! backoff inside the provider's time budget, mirrors quota headers on
//! success, and maps every failure to an [`Error`].

use std::fmt;
use std::sync::Arc;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use crate::http::auth::{default_headers, redact_url, Credentials};
use crate::http::builder::RequestBuilder;
use crate::http::error::error_for_status;
use crate::http::quota::{propagate_quota, QuotaSink, QuotaState};
use crate::http::rate_limit::SlidingWindowLimiter;
use crate::http::retry::{pause, RequestAttempt, RetryDecision, RetryPolicy};
use crate::http::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::types::{ProviderConfig, QueryParams};
use crate::{Error, Result};

/// Hook invoked before each retry sleep with the 1-based retry number and its cause
pub type RetryHook<'a> = &'a (dyn Fn(u32, &Error) + Send + Sync);

/// Per-call options for [`Client::request_with`]
#[derive(Default, Clone, Copy)]
pub struct RequestOptions<'a> {
    /// Progress callback, e.g. to show "retrying" in a UI
    pub on_retry: Option<RetryHook<'a>>,
    /// Cancellation observed before each attempt and while waiting
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> RequestOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_retry(mut self, hook: RetryHook<'a>) -> Self {
        self.on_retry = Some(hook);
        self
    }

    pub fn cancel(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl fmt::Debug for RequestOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("on_retry", &self.on_retry.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// HTTP client for one routing-service provider
pub struct Client {
    provider: ProviderConfig,
    request_builder: RequestBuilder,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
    quota: Arc<dyn QuotaSink>,
    retry_policy: RetryPolicy,
    limiter: Option<SlidingWindowLimiter>,
}

impl Client {
    /// Create a client for `provider` with the default user agent
    pub fn new(provider: ProviderConfig) -> Result<Self> {
        Self::with_user_agent(provider, None)
    }

    /// Create a client for `provider`, overriding the `User-Agent` header
    ///
    /// No network I/O happens here; credentials are checked per request.
    pub fn with_user_agent(provider: ProviderConfig, user_agent: Option<&str>) -> Result<Self> {
        let headers = default_headers(&provider, user_agent)?;
        let transport = ReqwestTransport::new().map_err(|e| Error::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(anyhow::anyhow!(e)),
        })?;
        let limiter = match provider.queries_per_minute {
            Some(0) => {
                return Err(Error::configuration(format!(
                    "queries_per_minute of provider '{}' must be greater than zero",
                    provider.name
                )))
            }
            Some(limit) => Some(SlidingWindowLimiter::per_minute(limit)),
            None => None,
        };

        Ok(Self {
            request_builder: RequestBuilder::new(&provider.base_url),
            provider,
            headers,
            transport: Arc::new(transport),
            quota: Arc::new(QuotaState::global()),
            retry_policy: RetryPolicy::default(),
            limiter,
        })
    }

    /// Replace the network transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the quota sink (defaults to [`QuotaState::global`])
    pub fn with_quota_sink(mut self, sink: Arc<dyn QuotaSink>) -> Self {
        self.quota = sink;
        self
    }

    /// Replace the backoff policy for rate-limited attempts
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// The provider this client talks to
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Send a request and return the parsed JSON body
    ///
    /// `body` selects the method: POST with a JSON body when present, GET
    /// otherwise.
    pub async fn request(&self, path: &str, params: &QueryParams, body: Option<&Value>) -> Result<Value> {
        self.request_with(path, params, body, RequestOptions::default()).await
    }

    /// [`request`](Self::request) with a retry hook and/or cancellation token
    pub async fn request_with(
        &self,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
        options: RequestOptions<'_>,
    ) -> Result<Value> {
        let mut attempt = RequestAttempt::start(self.provider.timeout_duration());

        let credentials = Credentials::resolve(&self.provider)?;
        let url = self.request_builder.build_url(path, params, credentials.query_key());
        let method = if body.is_some() { Method::POST } else { Method::GET };

        loop {
            if options.cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(Error::Cancelled);
            }
            attempt.check_deadline()?;

            if let Some(limiter) = &self.limiter {
                limiter.acquire(&attempt, options.cancel).await?;
            }

            tracing::debug!(
                provider = %self.provider.name,
                method = %method,
                url = %redact_url(&url),
                body = ?body,
                attempt = attempt.retry_count() + 1,
                "Sending request"
            );

            let request = TransportRequest {
                method: method.clone(),
                url: url.clone(),
                headers: self.headers.clone(),
                body: body.cloned(),
                timeout: attempt.remaining(),
            };

            // The deadline holds even for transports that ignore `request.timeout`
            let sent = tokio::time::timeout(attempt.remaining(), self.transport.send(request)).await;
            let response = match sent {
                Ok(Ok(response)) => response,
                Err(_) => {
                    tracing::debug!(provider = %self.provider.name, "Attempt exceeded the request budget");
                    return Err(attempt.timeout());
                }
                // A connect timeout can fire while budget remains; that is a transport failure
                Ok(Err(e)) if e.is_timeout() && attempt.remaining().is_zero() => {
                    tracing::debug!(provider = %self.provider.name, error = %e, "Attempt timed out");
                    return Err(attempt.timeout());
                }
                Ok(Err(e)) => {
                    tracing::debug!(provider = %self.provider.name, error = %e, "Transport failure");
                    return Err(Error::transport(
                        format!("{} {} failed: {}", method, redact_url(&url), e),
                        e,
                    ));
                }
            };

            let error = match self.handle_response(response) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let decision = attempt.should_retry(&error, &self.retry_policy, &mut rand::thread_rng());
            match decision {
                RetryDecision::Retry { delay } => {
                    tracing::warn!(
                        provider = %self.provider.name,
                        retry = attempt.retry_count(),
                        delay_ms = delay.as_millis() as u64,
                        "Rate limit exceeded, retrying"
                    );
                    if let Some(hook) = options.on_retry {
                        hook(attempt.retry_count(), &error);
                    }
                    pause(delay, options.cancel).await?;
                }
                RetryDecision::NoRetry => {
                    tracing::debug!(
                        provider = %self.provider.name,
                        kind = %error.kind(),
                        error = %error,
                        "Request failed"
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Map a response to its JSON body or an error, recording quota on success
    fn handle_response(&self, response: TransportResponse) -> Result<Value> {
        if response.status != StatusCode::OK {
            return Err(error_for_status(response.status, &response.body));
        }

        let value = serde_json::from_str::<Value>(&response.body).map_err(|e| Error::Json {
            message: format!("Failed to parse response as JSON: {}", e),
            source: e,
        })?;

        if !self.provider.env_vars.is_empty() {
            propagate_quota(&self.provider.env_vars, &response.headers, self.quota.as_ref());
        }

        Ok(value)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.provider.name)
            .field("base_url", &self.request_builder.base_url())
            .field("retry_policy", &self.retry_policy)
            .field("limiter", &self.limiter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::mock::{Reply, ScriptedTransport};
    use crate::http::transport::{TransportError, TransportErrorKind};
    use crate::types::DEFAULT_BASE_URL;
    use crate::ErrorKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn client_with(provider: ProviderConfig, replies: Vec<Reply>) -> (Client, Arc<ScriptedTransport>, QuotaState) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let quota = QuotaState::new();
        let client = Client::new(provider)
            .unwrap()
            .with_transport(transport.clone())
            .with_quota_sink(Arc::new(quota.clone()));
        (client, transport, quota)
    }

    fn test_provider() -> ProviderConfig {
        ProviderConfig::new("test", "https://example.test", "abc").with_timeout(60)
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let (client, transport, _) = client_with(test_provider(), vec![Reply::json(200, json!({"ok": true}))]);

        let value = client.request("/status", &QueryParams::new(), None).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(transport.calls(), 1);

        let requests = transport.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.url, "https://example.test/status?api_key=abc");
        assert!(sent.body.is_none());
    }

    #[tokio::test]
    async fn test_body_selects_post() {
        let (client, transport, _) = client_with(test_provider(), vec![Reply::json(200, json!({}))]);
        let body = json!({"locations": [[8.68, 49.41]], "range": [300]});

        client
            .request("/v2/isochrones/driving-car", &QueryParams::new(), Some(&body))
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.body.as_ref(), Some(&body));
        assert_eq!(sent.headers["authorization"], "abc");
        assert_eq!(sent.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_missing_key_on_public_origin_sends_nothing() {
        let provider = ProviderConfig::new("ors", DEFAULT_BASE_URL, "");
        let (client, transport, _) = client_with(provider, vec![Reply::json(200, json!({}))]);

        let err = client.request("/v2/directions/driving-car", &QueryParams::new(), None).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_self_hosted_without_key() {
        let provider = ProviderConfig::new("local", "http://localhost:8080/ors", "");
        let (client, transport, _) = client_with(provider, vec![Reply::json(200, json!({}))]);
        let params = QueryParams::new().with("profile", "driving-car");

        client.request("/v2/health", &params, None).await.unwrap();
        assert_eq!(transport.urls(), vec!["http://localhost:8080/ors/v2/health?profile=driving-car"]);
        assert!(transport.requests.lock().unwrap()[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_status_table() {
        let cases = vec![
            (Reply::json(403, json!({"error": "Access to this API has been disallowed"})), ErrorKind::InvalidKey),
            (Reply::json(400, json!({"error": {"code": "X", "message": "Y"}})), ErrorKind::Api),
            (Reply::json(404, json!({"error": {"code": 2009, "message": "Route could not be found"}})), ErrorKind::Api),
            (Reply::json(500, json!({"error": "internal"})), ErrorKind::GenericServer),
            (Reply::json(503, json!({})), ErrorKind::GenericServer),
            (Reply::Status(200, "not json".to_string(), vec![]), ErrorKind::Json),
            (Reply::Fail(TransportErrorKind::Connect), ErrorKind::Transport),
        ];

        for (reply, expected) in cases {
            let (client, transport, _) = client_with(test_provider(), vec![reply]);
            let err = client.request("/v2/matrix/driving-car", &QueryParams::new(), None).await.unwrap_err();
            assert_eq!(err.kind(), expected, "unexpected error: {:?}", err);
            assert_eq!(transport.calls(), 1, "non-429 outcomes must not be retried");
        }
    }

    #[tokio::test]
    async fn test_api_error_carries_payload() {
        let (client, _, _) = client_with(
            test_provider(),
            vec![Reply::json(400, json!({"error": {"code": "X", "message": "Y"}}))],
        );
        match client.request("/v2/matrix/driving-car", &QueryParams::new(), None).await {
            Err(Error::Api { status, code, message, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("X"));
                assert_eq!(message, "Y");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_redacts_key() {
        let (client, _, _) = client_with(test_provider(), vec![Reply::Fail(TransportErrorKind::Connect)]);
        let err = client.request("/v2/health", &QueryParams::new(), None).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("api_key=***"), "{}", message);
        assert!(!message.contains("abc"), "{}", message);
    }

    /// Waits before answering; `stall: None` waits out the attempt's own timeout
    struct SlowTransport {
        stall: Option<Duration>,
        fail: Option<TransportErrorKind>,
    }

    #[async_trait::async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, request: TransportRequest) -> std::result::Result<TransportResponse, TransportError> {
            tokio::time::sleep(self.stall.unwrap_or(request.timeout)).await;
            match self.fail {
                Some(kind) => Err(TransportError::new(kind, "stalled")),
                None => Ok(TransportResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body: json!({"ok": true}).to_string(),
                }),
            }
        }
    }

    fn slow_client(timeout: u64, transport: SlowTransport) -> Client {
        Client::new(test_provider().with_timeout(timeout))
            .unwrap()
            .with_transport(Arc::new(transport))
            .with_quota_sink(Arc::new(QuotaState::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_enforced_on_transport_ignoring_timeout() {
        let client = slow_client(
            1,
            SlowTransport {
                stall: Some(Duration::from_secs(5)),
                fail: None,
            },
        );
        let start = Instant::now();

        let err = client.request("/v2/health", &QueryParams::new(), None).await.unwrap_err();

        match err {
            Error::Timeout { budget, .. } => assert_eq!(budget, Duration::from_secs(1)),
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_timeout_at_deadline_maps_to_timeout() {
        let client = slow_client(
            2,
            SlowTransport {
                stall: None,
                fail: Some(TransportErrorKind::Timeout),
            },
        );
        let err = client.request("/v2/health", &QueryParams::new(), None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{:?}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_transport_timeout_is_transport_error() {
        let client = slow_client(
            60,
            SlowTransport {
                stall: Some(Duration::from_secs(10)),
                fail: Some(TransportErrorKind::Timeout),
            },
        );
        let err = client.request("/v2/health", &QueryParams::new(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport, "{:?}", err);
        assert!(!err.aborts_batch());
    }

    #[tokio::test]
    async fn test_scripted_timeout_with_budget_left_is_transport_error() {
        let (client, _, _) = client_with(test_provider(), vec![Reply::Fail(TransportErrorKind::Timeout)]);
        let err = client.request("/v2/health", &QueryParams::new(), None).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "{:?}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_with_rate_limit() {
        let provider = test_provider().with_timeout(u64::MAX).with_queries_per_minute(1);
        let (client, transport, _) = client_with(provider, vec![Reply::json(200, json!({}))]);

        client.request("/v2/health", &QueryParams::new(), None).await.unwrap();
        client.request("/v2/health", &QueryParams::new(), None).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let (client, transport, _) = client_with(
            test_provider(),
            vec![
                Reply::json(429, json!({"error": "Rate limit exceeded"})),
                Reply::json(429, json!({"error": "Rate limit exceeded"})),
                Reply::json(200, json!({"type": "FeatureCollection", "features": []})),
            ],
        );
        let retries = AtomicU32::new(0);
        let hook = |attempt: u32, error: &Error| {
            assert!(matches!(error, Error::OverQueryLimit { .. }));
            assert_eq!(attempt, retries.fetch_add(1, Ordering::SeqCst) + 1);
        };

        let value = client
            .request_with(
                "/v2/directions/driving-car/geojson",
                &QueryParams::new(),
                None,
                RequestOptions::new().on_retry(&hook),
            )
            .await
            .unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(transport.calls(), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_ends_in_timeout() {
        let provider = test_provider().with_timeout(10);
        let (client, transport, quota) = client_with(provider, vec![Reply::json(429, json!({}))]);
        let start = Instant::now();

        let err = client.request("/v2/matrix/driving-car", &QueryParams::new(), None).await.unwrap_err();

        match err {
            Error::Timeout { elapsed, budget } => {
                assert_eq!(budget, Duration::from_secs(10));
                assert!(elapsed > budget);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(start.elapsed() > Duration::from_secs(10));
        assert!(transport.calls() > 1);
        assert!(quota.is_empty(), "failed calls must not touch the quota state");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (client, transport, _) = client_with(test_provider(), vec![Reply::json(429, json!({}))]);
        let token = CancellationToken::new();
        let cancel_on_retry = |_: u32, _: &Error| token.cancel();

        let err = client
            .request_with(
                "/v2/matrix/driving-car",
                &QueryParams::new(),
                None,
                RequestOptions::new().on_retry(&cancel_on_retry).cancel(&token),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let (client, transport, _) = client_with(test_provider(), vec![Reply::json(200, json!({}))]);
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .request_with("/v2/health", &QueryParams::new(), None, RequestOptions::new().cancel(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_quota_headers_propagate_and_overwrite() {
        let provider = test_provider()
            .with_env_var("ORS_QUOTA", "X-Ratelimit-Limit")
            .with_env_var("ORS_REMAINING", "X-Ratelimit-Remaining");
        let (client, _, quota) = client_with(
            provider,
            vec![
                Reply::with_headers(
                    200,
                    json!({}),
                    vec![("x-ratelimit-limit", "2000"), ("x-ratelimit-remaining", "1999")],
                ),
                Reply::with_headers(
                    200,
                    json!({}),
                    vec![("x-ratelimit-limit", "2000"), ("x-ratelimit-remaining", "1998")],
                ),
            ],
        );

        client.request("/v2/health", &QueryParams::new(), None).await.unwrap();
        assert_eq!(quota.get("ORS_REMAINING").as_deref(), Some("1999"));

        client.request("/v2/health", &QueryParams::new(), None).await.unwrap();
        let snapshot = quota.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["ORS_QUOTA"], "2000");
        assert_eq!(snapshot["ORS_REMAINING"], "1998");
    }

    #[tokio::test]
    async fn test_error_response_leaves_quota_untouched() {
        let provider = test_provider().with_env_var("ORS_REMAINING", "X-Ratelimit-Remaining");
        let (client, _, quota) = client_with(
            provider,
            vec![Reply::with_headers(400, json!({"error": "bad"}), vec![("x-ratelimit-remaining", "5")])],
        );

        assert!(client.request("/v2/health", &QueryParams::new(), None).await.is_err());
        assert!(quota.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_per_minute_spaces_requests() {
        let provider = test_provider().with_queries_per_minute(2).with_timeout(120);
        let (client, transport, _) = client_with(provider, vec![Reply::json(200, json!({}))]);
        let start = Instant::now();

        for _ in 0..3 {
            client.request("/v2/health", &QueryParams::new(), None).await.unwrap();
        }

        assert_eq!(transport.calls(), 3);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_zero_queries_per_minute_rejected() {
        let provider = test_provider().with_queries_per_minute(0);
        assert!(matches!(Client::new(provider), Err(Error::Configuration { .. })));
    }
}
