//! Boundary to the external yt-dlp engine: metadata lookup, the download
//! subprocess, and the worker task that relays its progress to the UI.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context as _;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

use crate::model::WorkerEvent;
use crate::options::{self, DownloadConfig, DownloadRequest, FALLBACK_TITLE};
use crate::progress::{parse_progress_line, ProgressEvent};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("yt-dlp not found on PATH")]
    BinaryMissing(#[from] which::Error),
    #[error("failed to run yt-dlp: {0}")]
    Launch(#[from] std::io::Error),
    #[error("yt-dlp failed: {0}")]
    Engine(String),
}

/// What the metadata-only invocation resolves.
pub struct Metadata {
    pub title: String,
    pub thumbnail_url: Option<String>,
}

fn locate_engine() -> Result<PathBuf, EngineError> {
    Ok(which::which("yt-dlp")?)
}

/// Resolves title and thumbnail URL without downloading anything. A missing
/// or empty title falls back to the fixed placeholder so the operation never
/// fails solely on metadata.
pub async fn fetch_metadata(url: &str) -> Result<Metadata, EngineError> {
    let engine = locate_engine()?;
    let output = Command::new(engine)
        .args([
            "--skip-download",
            "--no-warnings",
            "--print",
            "%(title)s",
            "--print",
            "%(thumbnail)s",
            url,
        ])
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(EngineError::Engine(last_line(&output.stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines().map(str::trim);
    let title = match lines.next() {
        Some(t) if !t.is_empty() && t != "NA" => t.to_string(),
        _ => FALLBACK_TITLE.to_string(),
    };
    let thumbnail_url = lines
        .next()
        .filter(|t| !t.is_empty() && *t != "NA")
        .map(str::to_string);

    Ok(Metadata {
        title,
        thumbnail_url,
    })
}

/// Runs the configured download to completion, relaying progress ticks from
/// the subprocess stdout as UI events. Sends never block the relay loop.
pub async fn run_download(
    config: &DownloadConfig,
    events: &UnboundedSender<WorkerEvent>,
) -> Result<(), EngineError> {
    let engine = locate_engine()?;
    let mut child = Command::new(engine)
        .args(&config.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::Engine("no stdout handle".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| EngineError::Engine("no stderr handle".to_string()))?;

    // Drain stderr concurrently, keeping the last line for the error surface.
    let stderr_tail = tokio::spawn(async move {
        let mut tail = String::new();
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "yt_dlp", "{line}");
            if !line.trim().is_empty() {
                tail = line;
            }
        }
        tail
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = parse_progress_line(&line) {
            match event {
                ProgressEvent::Downloading { .. } => {
                    if let Some(pct) = event.percent() {
                        let _ = events.send(WorkerEvent::Progress(pct));
                    }
                }
                ProgressEvent::Finished => {
                    let _ = events.send(WorkerEvent::PostProcessing);
                }
                ProgressEvent::Errored => {
                    tracing::warn!("engine reported an errored progress tick");
                }
            }
        }
    }

    let status = child.wait().await?;
    let tail = stderr_tail.await.unwrap_or_default();
    if !status.success() {
        let detail = if tail.is_empty() {
            format!("exit status {status}")
        } else {
            tail
        };
        return Err(EngineError::Engine(detail));
    }
    Ok(())
}

/// Outermost scope of one download operation. Every failure is caught here
/// and becomes a `Failed` event; nothing propagates out of the worker.
pub async fn run_job(request: DownloadRequest, events: UnboundedSender<WorkerEvent>) {
    if let Err(err) = drive(&request, &events).await {
        tracing::error!("download failed: {err:#}");
        let _ = events.send(WorkerEvent::Failed(err.to_string()));
    }
}

async fn drive(
    request: &DownloadRequest,
    events: &UnboundedSender<WorkerEvent>,
) -> anyhow::Result<()> {
    let metadata = fetch_metadata(&request.url)
        .await
        .context("metadata lookup failed")?;
    if let Some(url) = metadata.thumbnail_url.clone() {
        let _ = events.send(WorkerEvent::ThumbnailUrl(url));
    }

    let title = options::sanitize_title(&metadata.title);
    let config = DownloadConfig::build(request, &title);
    options::ensure_output_dir(&config.out_dir).context("could not create output directory")?;

    tracing::info!(title = %title, format = ?request.format, "starting download");
    run_download(&config, events)
        .await
        .context("download failed")?;
    tracing::info!(out_dir = %config.out_dir.display(), "download finished");

    let _ = events.send(WorkerEvent::Completed {
        out_dir: config.out_dir,
    });
    Ok(())
}

// Last non-empty stderr line, for short status surfaces.
fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown engine error")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_line_picks_final_nonempty() {
        let stderr = b"WARNING: something\nERROR: no formats found\n\n";
        assert_eq!(last_line(stderr), "ERROR: no formats found");
    }

    #[test]
    fn last_line_handles_empty_stream() {
        assert_eq!(last_line(b""), "unknown engine error");
    }
}
