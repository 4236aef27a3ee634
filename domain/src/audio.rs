//! Audio segmentation for oversized recordings.
//!
//! The transcription service rejects uploads past a size ceiling, so larger
//! files are split into duration-bounded chunks with ffmpeg before upload.
//! Splitting is a lossless stream copy; chunk boundaries land on container
//! keyframes and are only approximately the requested duration.

use crate::error::Error;
use log::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// A temporary audio chunk produced by [`AudioSegmenter::split`].
///
/// Chunks live in a per-run temp directory and are deleted after the
/// transcription layer consumes them, success or failure.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub sequence_index: usize,
    pub path: PathBuf,
    pub duration_seconds: u64,
}

/// Splits oversized audio files into transcribable chunks.
pub struct AudioSegmenter {
    threshold_bytes: u64,
    chunk_duration_secs: u64,
}

impl AudioSegmenter {
    pub fn new(threshold_bytes: u64, chunk_duration_secs: u64) -> Self {
        Self {
            threshold_bytes,
            chunk_duration_secs,
        }
    }

    pub fn chunk_duration_secs(&self) -> u64 {
        self.chunk_duration_secs
    }

    /// Returns true when a file of this size must be split before upload.
    pub fn needs_segmentation(&self, file_size_bytes: u64) -> bool {
        file_size_bytes > self.threshold_bytes
    }

    /// Probes the audio duration in seconds, or `None` when ffmpeg cannot
    /// determine it. An unknown duration only degrades chunk metadata; it
    /// never blocks segmentation.
    pub async fn probe_duration(&self, audio_path: &Path) -> Option<f64> {
        let ffmpeg = find_ffmpeg().ok()?;

        let output = Command::new(ffmpeg)
            .arg("-i")
            .arg(audio_path)
            .arg("-f")
            .arg("null")
            .arg("-")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .ok()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_duration(&stderr)
    }

    /// Splits the file into chunks of approximately `chunk_duration_secs`
    /// seconds each, preserving the codec via stream copy.
    ///
    /// On tool failure every partial chunk file is deleted before the error
    /// is returned.
    pub async fn split(&self, audio_path: &Path) -> Result<Vec<AudioChunk>, Error> {
        let ffmpeg = find_ffmpeg()?;

        let extension = audio_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "webm".to_string());

        let chunk_dir = std::env::temp_dir().join(format!("meeting-chunks-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&chunk_dir).await?;

        let pattern = chunk_dir.join(format!("chunk_%03d.{}", extension));

        info!(
            "Splitting {:?} into ~{}s chunks at {:?}",
            audio_path, self.chunk_duration_secs, chunk_dir
        );

        let output = Command::new(ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(audio_path)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(self.chunk_duration_secs.to_string())
            .arg("-reset_timestamps")
            .arg("1")
            .arg(&pattern)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffmpeg segmenting failed: {}", stderr);
            remove_chunk_dir(&chunk_dir).await;
            return Err(Error::segmentation(format!(
                "ffmpeg failed to split audio: {}",
                stderr
            )));
        }

        let mut chunks = collect_chunks(&chunk_dir, self.chunk_duration_secs).await?;
        if chunks.is_empty() {
            remove_chunk_dir(&chunk_dir).await;
            return Err(Error::segmentation(
                "ffmpeg produced no chunk files".to_string(),
            ));
        }

        // The final chunk carries the remainder of the recording; probe the
        // total duration to record its approximate length.
        if let Some(total) = self.probe_duration(audio_path).await {
            let consumed = (chunks.len() as u64 - 1) * self.chunk_duration_secs;
            if let Some(last) = chunks.last_mut() {
                last.duration_seconds =
                    (total.ceil() as u64).saturating_sub(consumed).min(self.chunk_duration_secs);
            }
        }

        info!("Produced {} audio chunks", chunks.len());
        Ok(chunks)
    }

    /// Deletes every chunk file and the containing temp directory.
    ///
    /// Called by the transcription layer on every exit path. Failures are
    /// logged, never propagated; cleanup must not mask the primary outcome.
    pub async fn cleanup(chunks: &[AudioChunk]) {
        for chunk in chunks {
            if let Err(e) = tokio::fs::remove_file(&chunk.path).await {
                warn!("Failed to remove chunk file {:?}: {}", chunk.path, e);
            }
        }
        if let Some(dir) = chunks.first().and_then(|c| c.path.parent()) {
            remove_chunk_dir(dir).await;
        }
    }
}

/// Locates the ffmpeg executable on PATH.
fn find_ffmpeg() -> Result<PathBuf, Error> {
    which::which("ffmpeg").map_err(|e| {
        warn!("ffmpeg not found on PATH: {}", e);
        Error::segmentation("ffmpeg not found. Please install ffmpeg.".to_string())
    })
}

async fn remove_chunk_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!("Failed to remove chunk directory {:?}: {}", dir, e);
    }
}

/// Lists chunk files in the output directory, ordered by sequence index.
async fn collect_chunks(dir: &Path, chunk_duration_secs: u64) -> Result<Vec<AudioChunk>, Error> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.path());
    }
    // chunk_000, chunk_001, ... - lexicographic order is sequence order
    names.sort();

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(sequence_index, path)| AudioChunk {
            sequence_index,
            path,
            duration_seconds: chunk_duration_secs,
        })
        .collect())
}

/// Parses "Duration: HH:MM:SS.cc" from ffmpeg stderr output.
fn parse_duration(stderr: &str) -> Option<f64> {
    for line in stderr.lines() {
        if let Some(rest) = line.split("Duration:").nth(1) {
            let time_str = rest.split(',').next()?.trim();
            let parts: Vec<&str> = time_str.split(':').collect();
            if parts.len() == 3 {
                let hours: f64 = parts[0].parse().ok()?;
                let minutes: f64 = parts[1].parse().ok()?;
                let seconds: f64 = parts[2].parse().ok()?;
                return Some(hours * 3600.0 + minutes * 60.0 + seconds);
            }
        }
    }
    None
}
