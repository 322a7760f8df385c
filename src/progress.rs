//! Wire format for progress reporting from the engine subprocess.

/// Template handed to yt-dlp via `--progress-template`. Each progress tick
/// becomes one prefixed line on stdout: status, downloaded byte count, and the
/// total byte count (or its estimate), `NA` when a field is unknown.
pub const PROGRESS_TEMPLATE: &str =
    "progress:%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes,progress.total_bytes_estimate)s";

/// One parsed progress tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProgressEvent {
    Downloading { downloaded: u64, total: Option<u64> },
    /// Raw retrieval finished; post-processing may still follow.
    Finished,
    Errored,
}

impl ProgressEvent {
    /// Integer percentage, floor(downloaded / total * 100). None unless both
    /// counts are known and the total is positive.
    pub fn percent(self) -> Option<u8> {
        match self {
            ProgressEvent::Downloading {
                downloaded,
                total: Some(total),
            } if total > 0 => Some((downloaded.saturating_mul(100) / total).min(100) as u8),
            _ => None,
        }
    }
}

/// Parses one stdout line. Lines without the template prefix (regular yt-dlp
/// output) yield None.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix("progress:")?;
    let mut fields = rest.split('|');
    let status = fields.next()?.trim();
    match status {
        "downloading" => {
            let downloaded = parse_byte_count(fields.next()?)?;
            let total = fields.next().and_then(parse_byte_count);
            Some(ProgressEvent::Downloading { downloaded, total })
        }
        "finished" => Some(ProgressEvent::Finished),
        "error" => Some(ProgressEvent::Errored),
        _ => None,
    }
}

// Byte counts arrive as integers or floats (estimates), or "NA".
fn parse_byte_count(field: &str) -> Option<u64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}
