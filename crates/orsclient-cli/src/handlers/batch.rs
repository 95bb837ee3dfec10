//! Batch command handler

use super::{build_client, cancel_on_ctrl_c};
use crate::cli::BatchArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use orsclient_core::{run_batch, BatchJob, BatchOptions, BatchReport, JobOutcome, ProgressHook, QuotaState};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Serializable summary of a batch run
#[derive(Debug, Serialize)]
struct Summary<'a> {
    total: usize,
    succeeded: Vec<SucceededJob<'a>>,
    failed: Vec<FailedJob<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aborted: Option<FailedJob<'a>>,
    cancelled: bool,
}

#[derive(Debug, Serialize)]
struct SucceededJob<'a> {
    id: &'a str,
    result: &'a Value,
}

#[derive(Debug, Serialize)]
struct FailedJob<'a> {
    id: &'a str,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    message: String,
}

impl<'a> FailedJob<'a> {
    fn new(id: &'a str, error: &orsclient_core::Error) -> Self {
        Self {
            id,
            kind: error.kind().to_string(),
            status: error.status_code(),
            message: error.to_string(),
        }
    }
}

impl<'a> Summary<'a> {
    fn new(total: usize, report: &'a BatchReport) -> Self {
        Self {
            total,
            succeeded: report
                .succeeded
                .iter()
                .map(|(id, result)| SucceededJob { id, result })
                .collect(),
            failed: report.failed.iter().map(|(id, e)| FailedJob::new(id, e)).collect(),
            aborted: report.aborted.as_ref().map(|(id, e)| FailedJob::new(id, e)),
            cancelled: report.cancelled,
        }
    }
}

/// Read a JSON array of jobs
fn load_jobs(path: &Path) -> Result<Vec<BatchJob>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        tracing::debug!(error = %e, "Job file did not parse");
        Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "a JSON array of {\"id\", \"path\", \"params\"?, \"body\"?} objects".to_string(),
        }
    })
}

/// Handle the batch command
#[instrument(skip(args, config, output), fields(file = %args.jobs_file.display()))]
pub async fn handle_batch(args: BatchArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("batch_command", &args.jobs_file.display().to_string());

    let jobs = load_jobs(&args.jobs_file)?;
    let client = build_client(config)?;
    info!(jobs = jobs.len(), "Starting batch");

    let progress = if output.is_quiet() {
        ProgressBar::with_draw_target(Some(jobs.len() as u64), ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new(jobs.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| Error::other(format!("Invalid progress template: {}", e)))?,
    );

    let cancel = cancel_on_ctrl_c();
    let on_progress: ProgressHook<'_> = &|_, _, id, outcome| {
        match outcome {
            JobOutcome::Succeeded => progress.set_message(id.to_string()),
            JobOutcome::Failed(error) => progress.println(format!("{}: {}", id, error)),
            JobOutcome::Aborted(_) => {}
        }
        progress.inc(1);
    };
    let options = BatchOptions {
        cancel: Some(&cancel),
        on_progress: Some(on_progress),
        on_retry: None,
    };

    let report = run_batch(&client, &jobs, options).await;
    progress.finish_and_clear();

    let summary = Summary::new(jobs.len(), &report);
    match &args.save_to {
        Some(path) => output.save_value(&summary, path)?,
        None => output.write_value(&summary)?,
    }
    output.quota(&QuotaState::global().snapshot())?;

    if report.cancelled {
        return Err(orsclient_core::Error::Cancelled.into());
    }
    if let Some((job, source)) = report.aborted {
        return Err(Error::BatchAborted { job, source });
    }

    if report.failed.is_empty() {
        output.success(&format!("✓ {} jobs succeeded", report.succeeded.len()))?;
    } else {
        output.warning(&format!(
            "{} of {} jobs failed",
            report.failed.len(),
            jobs.len()
        ))?;
    }
    Ok(())
}
