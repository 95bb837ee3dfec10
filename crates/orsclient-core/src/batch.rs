//! Sequential batch execution
//!
//! Runs a list of jobs through one [`Client`]. Errors that concern a single
//! feature (a bad request, an invalid key, a server failure) are recorded
//! and the batch moves on. Errors that would repeat for every remaining job
//! (a spent time budget, a missing key, a cancellation) stop the batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use crate::http::client::{Client, RequestOptions, RetryHook};
use crate::types::QueryParams;
use crate::Error;

/// One request of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Caller-chosen identifier, used in logs and the report
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub params: QueryParams,
    /// JSON body; its presence makes the request a POST
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl BatchJob {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            params: QueryParams::new(),
            body: None,
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// What happened to one job, as seen by the progress hook
#[derive(Debug, Clone, Copy)]
pub enum JobOutcome<'a> {
    Succeeded,
    Failed(&'a Error),
    Aborted(&'a Error),
}

/// Progress hook: `(index, total, job id, outcome)` with a zero-based index
pub type ProgressHook<'a> = &'a (dyn Fn(usize, usize, &str, JobOutcome<'_>) + Send + Sync);

/// Options for [`run_batch`]
#[derive(Default, Clone, Copy)]
pub struct BatchOptions<'a> {
    pub cancel: Option<&'a CancellationToken>,
    pub on_progress: Option<ProgressHook<'a>>,
    /// Forwarded to every request
    pub on_retry: Option<RetryHook<'a>>,
}

impl std::fmt::Debug for BatchOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("cancel", &self.cancel)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(String, Value)>,
    pub failed: Vec<(String, Error)>,
    /// The job that stopped the batch and its error
    pub aborted: Option<(String, Error)>,
    /// Set when the cancellation token stopped the batch between jobs
    pub cancelled: bool,
}

impl BatchReport {
    /// Whether every job ran
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && !self.cancelled
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len() + usize::from(self.aborted.is_some())
    }
}

/// Run `jobs` in order through `client`
pub async fn run_batch(client: &Client, jobs: &[BatchJob], options: BatchOptions<'_>) -> BatchReport {
    let mut report = BatchReport::default();
    let total = jobs.len();

    let request_options = RequestOptions {
        on_retry: options.on_retry,
        cancel: options.cancel,
    };

    for (index, job) in jobs.iter().enumerate() {
        if options.cancel.is_some_and(|token| token.is_cancelled()) {
            tracing::info!(completed = index, total, "Batch cancelled");
            report.cancelled = true;
            break;
        }

        let result = client
            .request_with(&job.path, &job.params, job.body.as_ref(), request_options)
            .await;

        match result {
            Ok(value) => {
                tracing::debug!(job = %job.id, "Job succeeded");
                notify(&options, index, total, &job.id, JobOutcome::Succeeded);
                report.succeeded.push((job.id.clone(), value));
            }
            Err(error) if error.aborts_batch() => {
                tracing::error!(job = %job.id, kind = %error.kind(), error = %error, "Batch aborted");
                notify(&options, index, total, &job.id, JobOutcome::Aborted(&error));
                report.aborted = Some((job.id.clone(), error));
                break;
            }
            Err(error) => {
                tracing::warn!(job = %job.id, kind = %error.kind(), error = %error, "Job failed");
                notify(&options, index, total, &job.id, JobOutcome::Failed(&error));
                report.failed.push((job.id.clone(), error));
            }
        }
    }

    report
}

fn notify(options: &BatchOptions<'_>, index: usize, total: usize, id: &str, outcome: JobOutcome<'_>) {
    if let Some(hook) = options.on_progress {
        hook(index, total, id, outcome);
    }
}
