//! `yt-dlp` subprocess provider.
//!
//! The binary runs with `--newline` and a custom progress template so every
//! progress update arrives as one machine-readable stdout line:
//!
//! ```text
//! tubefetch:<downloaded_bytes>|<total_bytes>|<status>
//! ```
//!
//! Fields yt-dlp does not know are printed as `NA`. stderr is scanned for
//! `ERROR:` lines, which are either per-item failures (skipped thanks to
//! `--ignore-errors`) or post-processing failures.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::{ProviderError, Result};
use super::events::{ProgressSink, ProviderEvent};
use super::traits::{FetchRequest, FetchSummary, MediaInfo, MediaProvider};
use crate::config::ProviderConfig;
use crate::jobs::models::JobKind;

const PROGRESS_PREFIX: &str = "tubefetch:";
const PROGRESS_TEMPLATE: &str =
    "download:tubefetch:%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.status)s";
const DESTINATION_PREFIX: &str = "[download] Destination: ";
const ALREADY_DOWNLOADED_SUFFIX: &str = " has already been downloaded";
const ERROR_PREFIX: &str = "ERROR:";

#[derive(Debug, Clone)]
pub struct YtDlpProvider {
    binary: String,
    extra_args: Vec<String>,
}

impl YtDlpProvider {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Full argument list for a download, URL last
    pub fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--ignore-errors".into(),
            "--no-warnings".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "-f".into(),
            request.selector.format_spec(),
            "-o".into(),
            output_template(&request.output_dir, request.kind),
        ];

        if let Some(bitrate_kbps) = request.selector.audio_bitrate() {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                format!("{bitrate_kbps}K"),
            ]);
        }

        args.extend(self.extra_args.iter().cloned());
        args.push(request.url.clone());
        args
    }

    pub fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--dump-single-json".into(),
            "--flat-playlist".into(),
            "--skip-download".into(),
            "--no-warnings".into(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, err: std::io::Error) -> ProviderError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProviderError::ToolNotFound(self.binary.clone())
        } else {
            ProviderError::Io(format!("failed to start {}: {}", self.binary, err))
        }
    }
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, request: &FetchRequest, sink: ProgressSink) -> Result<FetchSummary> {
        let args = self.download_args(request);
        debug!(job_id = %request.job_id, binary = %self.binary, ?args, "Spawning yt-dlp");

        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Io("yt-dlp stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::Io("yt-dlp stderr not captured".into()))?;

        let stderr_sink = sink.clone();
        let stderr_reader = tokio::spawn(async move {
            let mut report = StderrReport::default();
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = next_line(&mut reader, &mut buf).await {
                match classify_stderr_line(&line) {
                    Some(StderrLine::PostProcessing(message)) => {
                        stderr_sink.report(ProviderEvent::Warning {
                            message: message.clone(),
                        });
                        report.postprocessing.push(message);
                    }
                    Some(StderrLine::Error(message)) => {
                        stderr_sink.report(ProviderEvent::ItemFailed {
                            reason: message.clone(),
                        });
                        report.errors.push(message);
                    }
                    None => {
                        if !line.trim().is_empty() {
                            report.last_line = Some(line);
                        }
                    }
                }
            }
            report
        });

        let mut items_finished = 0usize;
        let mut destination: Option<String> = None;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_line(&mut reader, &mut buf).await? {
            if let Some(progress) = parse_progress_line(&line) {
                if progress.finished {
                    items_finished += 1;
                    sink.report(ProviderEvent::ItemFinished {
                        filename: destination.take(),
                    });
                } else {
                    sink.report(ProviderEvent::Progress {
                        downloaded_bytes: progress.downloaded_bytes,
                        total_bytes: progress.total_bytes,
                    });
                }
            } else if let Some(path) = line.strip_prefix(DESTINATION_PREFIX) {
                destination = Some(path.trim().to_string());
            } else if let Some(path) = parse_already_downloaded(&line) {
                items_finished += 1;
                sink.report(ProviderEvent::ItemFinished {
                    filename: Some(path),
                });
            }
        }

        let status = child.wait().await?;
        let report = stderr_reader
            .await
            .map_err(|e| ProviderError::Io(format!("stderr reader failed: {e}")))?;

        let outcome = interpret_exit(request.kind, status.success(), items_finished, report, status);
        match &outcome {
            Ok(summary) => {
                info!(
                    job_id = %request.job_id,
                    items_finished = summary.items_finished,
                    items_failed = summary.items_failed.len(),
                    "yt-dlp finished"
                );
                sink.report(ProviderEvent::Finished);
            }
            Err(err) => {
                warn!(job_id = %request.job_id, %status, error = %err, "yt-dlp failed");
            }
        }
        outcome
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let args = self.probe_args(url);
        debug!(url, binary = %self.binary, "Probing URL with yt-dlp");

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .filter_map(|line| line.trim().strip_prefix(ERROR_PREFIX))
                .map(|line| line.trim().to_string())
                .last()
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(ProviderError::Failed(message));
        }

        parse_probe_output(&output.stdout)
    }
}

/// Next output line without its terminator. Bytes that are not UTF-8, such as
/// titles printed in a legacy codepage, are replaced instead of failing the read.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn output_template(output_dir: &Path, kind: JobKind) -> String {
    let file = match kind {
        JobKind::Playlist => "%(playlist_title)s/%(title)s.%(ext)s",
        JobKind::Video | JobKind::Audio => "%(title)s.%(ext)s",
    };
    output_dir.join(file).to_string_lossy().into_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProgressLine {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub finished: bool,
}

pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split('|');

    let downloaded_bytes = parse_count(fields.next()?)?;
    let total_bytes = fields.next().and_then(parse_count).filter(|total| *total > 0);
    let finished = fields
        .next()
        .map(|status| status.trim() == "finished")
        .unwrap_or(false);

    Some(ProgressLine {
        downloaded_bytes,
        total_bytes,
        finished,
    })
}

fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || field == "NA" || field == "None" {
        return None;
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v.round() as u64))
}

fn parse_already_downloaded(line: &str) -> Option<String> {
    line.strip_prefix("[download] ")?
        .strip_suffix(ALREADY_DOWNLOADED_SUFFIX)
        .map(|path| path.trim().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StderrLine {
    PostProcessing(String),
    Error(String),
}

pub(crate) fn classify_stderr_line(line: &str) -> Option<StderrLine> {
    let message = line.trim().strip_prefix(ERROR_PREFIX)?.trim();
    if message.starts_with("Postprocessing") || message.contains("ffmpeg not found") {
        Some(StderrLine::PostProcessing(message.to_string()))
    } else {
        Some(StderrLine::Error(message.to_string()))
    }
}

#[derive(Debug, Default)]
pub(crate) struct StderrReport {
    pub errors: Vec<String>,
    pub postprocessing: Vec<String>,
    pub last_line: Option<String>,
}

/// Decide whether a run succeeded.
///
/// A non-zero exit is tolerated when every error was a post-processing one
/// and something was downloaded, or when a playlist got at least one item.
pub(crate) fn interpret_exit(
    kind: JobKind,
    success: bool,
    items_finished: usize,
    report: StderrReport,
    status: ExitStatus,
) -> Result<FetchSummary> {
    let StderrReport {
        errors,
        postprocessing,
        last_line,
    } = report;

    let tolerated = success
        || (items_finished > 0 && errors.is_empty() && !postprocessing.is_empty())
        || (kind == JobKind::Playlist && items_finished > 0);

    if tolerated {
        return Ok(FetchSummary {
            items_finished,
            items_failed: errors,
            warnings: postprocessing,
        });
    }

    let cause = errors
        .last()
        .or(postprocessing.last())
        .cloned()
        .or(last_line)
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
    Err(ProviderError::Failed(cause))
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    #[serde(default)]
    entries: Option<Vec<serde_json::Value>>,
}

pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<MediaInfo> {
    let raw: ProbeOutput = serde_json::from_slice(stdout)?;
    Ok(MediaInfo {
        title: raw.title.unwrap_or_else(|| "Unknown".to_string()),
        duration: raw.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64),
        uploader: raw.uploader.unwrap_or_else(|| "Unknown".to_string()),
        entries: raw.entries.map(|entries| entries.len()),
    })
}
