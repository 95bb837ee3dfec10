//! Request command handler

use super::{build_client, cancel_on_ctrl_c, parse_body, parse_params};
use crate::cli::RequestArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use colored::Colorize;
use orsclient_core::{Error as CoreError, QuotaState, RequestOptions};
use tracing::{info, instrument};

/// Handle the request command
#[instrument(skip(args, config, output), fields(path = %args.path))]
pub async fn handle_request(args: RequestArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let timer = Timer::with_details("request_command", &args.path);

    let params = parse_params(&args.params)?;
    let body = parse_body(args.body.as_deref())?;
    let client = build_client(config)?;

    let cancel = cancel_on_ctrl_c();
    let quiet = output.is_quiet();
    let on_retry = move |retry: u32, error: &CoreError| {
        if !quiet {
            eprintln!("{} retry {} after: {}", "rate limited,".yellow(), retry, error);
        }
    };
    let options = RequestOptions::new().on_retry(&on_retry).cancel(&cancel);

    output.info(&format!(
        "{} {}",
        if body.is_some() { "POST" } else { "GET" },
        args.path
    ))?;
    let value = client
        .request_with(&args.path, &params, body.as_ref(), options)
        .await?;
    info!(elapsed_ms = timer.elapsed().as_millis() as u64, "Request completed");

    match &args.save_to {
        Some(path) => output.save_value(&value, path)?,
        None => output.write_value(&value)?,
    }
    output.quota(&QuotaState::global().snapshot())?;

    Ok(())
}
