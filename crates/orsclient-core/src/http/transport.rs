//! Network transport seam
//!
//! The client talks to the network only through [`Transport`], so the
//! retry, error and quota logic is independent of the HTTP library. The
//! default implementation is [`ReqwestTransport`].

use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde_json::Value;

/// A fully prepared request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// JSON body; present for POST only
    pub body: Option<Value>,
    /// Upper bound for this single attempt
    pub timeout: Duration,
}

/// Status, headers and raw body of a response
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Why the network layer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The attempt exceeded its timeout
    Timeout,
    /// Connection refused, reset, DNS or TLS failure
    Connect,
    /// The request could not be built or sent
    Request,
    /// The response body could not be read
    Body,
    Other,
}

/// Failure of the network layer itself
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timed out"),
            TransportErrorKind::Connect => write!(f, "connection failed"),
            TransportErrorKind::Request => write!(f, "request failed"),
            TransportErrorKind::Body => write!(f, "reading response failed"),
            TransportErrorKind::Other => write!(f, "transport failure"),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        // reqwest embeds the URL, and with it the api_key, in its message
        let error = error.without_url();
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else if error.is_request() || error.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };

        // reqwest's own message omits the cause that tells DNS, TLS and refused apart
        let mut message = error.to_string();
        let mut cause = std::error::Error::source(&error);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self {
            kind,
            message,
            source: Some(Box::new(error)),
        }
    }
}

/// Capability to send one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Create a transport with reqwest's default pool settings
    pub fn new() -> Result<Self, TransportError> {
        let client = ReqwestClient::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_error_keeps_cause() {
        let error = ReqwestClient::new().get("not a url").build().unwrap_err();
        let error = TransportError::from(error);

        assert_eq!(error.kind, TransportErrorKind::Request);
        assert!(error.message.starts_with("builder error"), "{}", error.message);
        assert!(error.message.contains("relative URL without a base"), "{}", error.message);
    }

    #[tokio::test]
    async fn test_refused_connection_names_cause() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = ReqwestTransport::new().unwrap();
        let error = transport
            .send(TransportRequest {
                method: Method::GET,
                url: format!("http://127.0.0.1:{}/v2/health?api_key=secret", port),
                headers: HeaderMap::new(),
                body: None,
                timeout: Duration::from_secs(5),
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind, TransportErrorKind::Connect);
        assert!(error.message.len() > "error sending request".len(), "{}", error.message);
        assert!(!error.message.contains("secret"), "{}", error.message);
    }
}
