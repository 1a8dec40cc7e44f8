//! Subcommand implementations for the binary

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tubefetch::config::Config;
use tubefetch::jobs::{JobRunner, JobState, SubmitRequest};
use tubefetch::provider::{MediaInfo, YtDlpProvider};

use crate::cli::{FetchArgs, ProbeArgs, ServerArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn server(config: Config, args: ServerArgs) -> Result<ExitCode, AnyError> {
    let address = args.address.unwrap_or(config.server.bind_addr);
    tubefetch::api::run(config, address).await?;
    Ok(ExitCode::SUCCESS)
}

pub async fn probe(config: Config, args: ProbeArgs) -> Result<ExitCode, AnyError> {
    let provider = YtDlpProvider::from_config(&config.provider);
    let runner = JobRunner::new(Arc::new(provider));

    match runner.probe(&args.url).await {
        Ok(info) => {
            print_info(&info);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("URL test failed: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn fetch(config: Config, args: FetchArgs) -> Result<ExitCode, AnyError> {
    let output_dir: PathBuf = args
        .output
        .unwrap_or_else(|| config.jobs.default_output_dir.clone());
    if !output_dir.exists() {
        tokio::fs::create_dir_all(&output_dir).await?;
        info!(dir = %output_dir.display(), "Created output directory");
    }

    let provider = YtDlpProvider::from_config(&config.provider);
    let runner = JobRunner::new(Arc::new(provider));

    if !args.skip_probe {
        match runner.probe(&args.url).await {
            Ok(info) => print_info(&info),
            Err(err) => {
                eprintln!("URL test failed: {err}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let request = SubmitRequest {
        url: args.url,
        kind: args.kind,
        quality: args
            .quality
            .unwrap_or_else(|| config.jobs.default_quality.clone()),
        output_dir,
    };
    let job_id = runner.submit(request)?;

    let mut last_message = String::new();
    loop {
        let status = runner.status(&job_id);
        if status.message != last_message {
            println!("[{}] {}", status.state, status.message);
            last_message = status.message.clone();
        }

        match status.state {
            JobState::Completed => {
                if let Some(warning) = &status.warning {
                    eprintln!("warning: {warning}");
                }
                return Ok(ExitCode::SUCCESS);
            }
            JobState::Error => return Ok(ExitCode::FAILURE),
            _ => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}

fn print_info(info: &MediaInfo) {
    println!("Title:    {}", info.title);
    match info.duration {
        Some(secs) => println!("Duration: {}:{:02}", secs / 60, secs % 60),
        None => println!("Duration: unknown"),
    }
    println!("Uploader: {}", info.uploader);
    if let Some(entries) = info.entries {
        println!("Entries:  {entries}");
    }
}
