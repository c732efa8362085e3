//! Serve a completed job's video, whole or as a single byte range.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use super::{DeliveryError, DeliveryResult};
use crate::store::JobStore;

/// Inclusive byte range within a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Resolve a `Range` header against a file of `size` bytes.
///
/// Returns `Ok(None)` for headers that should be ignored (not `bytes=`,
/// malformed, or several ranges), so the caller serves the whole file.
/// `start-end`, `start-` and `-suffix` forms are understood; an end past
/// the file is clamped. A range that selects no byte of the file is
/// [`DeliveryError::RangeNotSatisfiable`].
pub fn parse_range(header: &str, size: u64) -> DeliveryResult<Option<ByteRange>> {
    let Some(ranges) = header.trim().strip_prefix("bytes=") else {
        return Ok(None);
    };
    if ranges.contains(',') {
        return Ok(None);
    }
    let Some((first, last)) = ranges.trim().split_once('-') else {
        return Ok(None);
    };
    let (first, last) = (first.trim(), last.trim());

    let parse = |s: &str| s.parse::<u64>().ok();
    let unsatisfiable = || DeliveryError::RangeNotSatisfiable { size };

    let range = match (first.is_empty(), last.is_empty()) {
        // -suffix
        (true, false) => {
            let Some(suffix) = parse(last) else {
                return Ok(None);
            };
            if suffix == 0 || size == 0 {
                return Err(unsatisfiable());
            }
            ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            }
        }
        // start-
        (false, true) => {
            let Some(start) = parse(first) else {
                return Ok(None);
            };
            if start >= size {
                return Err(unsatisfiable());
            }
            ByteRange {
                start,
                end: size - 1,
            }
        }
        // start-end
        (false, false) => {
            let (Some(start), Some(end)) = (parse(first), parse(last)) else {
                return Ok(None);
            };
            if end < start {
                return Ok(None);
            }
            if start >= size {
                return Err(unsatisfiable());
            }
            ByteRange {
                start,
                end: end.min(size - 1),
            }
        }
        (true, true) => return Ok(None),
    };
    Ok(Some(range))
}

/// Content type for a served video, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Everything a transport needs to answer a download request.
#[derive(Debug, Clone)]
pub struct Download {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub total_size: u64,
    /// Set when a partial response is served.
    pub range: Option<ByteRange>,
}

impl Download {
    /// 206 for a range, 200 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.range.is_some() {
            206
        } else {
            200
        }
    }

    pub fn accept_ranges(&self) -> &'static str {
        "bytes"
    }

    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.length())
    }

    /// `Content-Range` value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|r| format!("bytes {}-{}/{}", r.start, r.end, self.total_size))
    }

    /// Reader over exactly the bytes to send.
    pub fn open(&self) -> std::io::Result<Take<File>> {
        let mut file = File::open(&self.path)?;
        let start = self.range.map_or(0, |r| r.start);
        file.seek(SeekFrom::Start(start))?;
        Ok(file.take(self.content_length()))
    }
}

/// Look up a job's output for download.
///
/// Only `completed` jobs are served, so a failed or in-flight job never
/// exposes a partial file.
pub fn prepare_download(
    store: &JobStore,
    job_id: &str,
    range_header: Option<&str>,
) -> DeliveryResult<Download> {
    let job = store.load(job_id)?;
    if !job.is_completed() {
        return Err(DeliveryError::NotCompleted {
            id: job.id,
            status: job.status,
        });
    }

    let path = job
        .output_video_path
        .clone()
        .ok_or_else(|| DeliveryError::OutputMissing(PathBuf::from(format!("{}_dubbed.mp4", job_id))))?;
    let total_size = match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return Err(DeliveryError::OutputMissing(path)),
    };

    let range = match range_header {
        Some(header) => parse_range(header, total_size)?,
        None => None,
    };

    Ok(Download {
        content_type: content_type_for(&path),
        path,
        total_size,
        range,
    })
}
