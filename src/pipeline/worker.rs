use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Result, Context};
use tempfile::TempPath;

use super::queue::RendezvousQueue;
use super::OutputLayout;
use crate::audio::wav::{self, WavEncoding};
use crate::engine::AudioBuffer;

const PREVIEW_CHARS: usize = 50;

/// One generated chunk of speech, numbered in generation order
#[derive(Debug, Clone)]
pub struct Segment {
    pub sequence: usize,
    pub text_preview: String,
    pub audio: AudioBuffer,
}

impl Segment {
    pub fn new(sequence: usize, text: &str, audio: AudioBuffer) -> Self {
        Self {
            sequence,
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
            audio,
        }
    }
}

/// Where a segment's audio ended up
#[derive(Debug)]
pub enum Artifact {
    Saved(PathBuf),
    /// Removed once consumed, or when dropped
    Temporary(TempPath),
}

impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Self::Saved(path) => path.as_path(),
            Self::Temporary(temp) => &**temp,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

#[derive(Debug)]
pub enum SegmentOutcome {
    Ready(Artifact),
    Failed(String),
}

/// What a worker reports back through the rendezvous queue
#[derive(Debug)]
pub struct PendingResult {
    pub sequence: usize,
    pub text_preview: String,
    pub duration_secs: f32,
    pub outcome: SegmentOutcome,
}

/// Where workers write segment audio
#[derive(Debug, Clone)]
pub enum ArtifactTarget {
    Durable(OutputLayout),
    Transient,
}

/// Persists one segment and reports it to the queue
pub struct SegmentWorker {
    target: ArtifactTarget,
    encoding: WavEncoding,
    queue: Arc<RendezvousQueue<PendingResult>>,
    interactive: bool,
}

impl SegmentWorker {
    pub fn new(
        target: ArtifactTarget,
        encoding: WavEncoding,
        queue: Arc<RendezvousQueue<PendingResult>>,
    ) -> Self {
        Self {
            target,
            encoding,
            queue,
            interactive: std::io::stdout().is_terminal(),
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Never fails: persistence errors are reported as a `Failed` outcome.
    pub async fn process(&self, segment: Segment) {
        let Segment { sequence, text_preview, audio } = segment;
        let duration_secs = audio.duration_secs();

        if self.interactive {
            println!("  [{}] {:.2}s  {}", sequence + 1, duration_secs, text_preview);
        }

        let target = self.target.clone();
        let encoding = self.encoding;
        let persisted = tokio::task::spawn_blocking(move || persist(&target, sequence, &audio, encoding)).await;

        let outcome = match persisted {
            Ok(Ok(artifact)) => {
                tracing::debug!("Segment {} written to {}", sequence + 1, artifact.path().display());
                SegmentOutcome::Ready(artifact)
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to persist segment {}: {:#}", sequence + 1, e);
                SegmentOutcome::Failed(format!("{:#}", e))
            }
            Err(e) => {
                tracing::warn!("Persist task for segment {} failed: {}", sequence + 1, e);
                SegmentOutcome::Failed(e.to_string())
            }
        };

        self.submit(sequence, text_preview, duration_secs, outcome);
    }

    pub fn report_failure(&self, sequence: usize, text_preview: String, reason: &str) {
        self.submit(sequence, text_preview, 0.0, SegmentOutcome::Failed(reason.to_string()));
    }

    fn submit(&self, sequence: usize, text_preview: String, duration_secs: f32, outcome: SegmentOutcome) {
        self.queue.put(sequence, PendingResult {
            sequence,
            text_preview,
            duration_secs,
            outcome,
        });
    }
}

fn persist(target: &ArtifactTarget, sequence: usize, audio: &AudioBuffer, encoding: WavEncoding) -> Result<Artifact> {
    match target {
        ArtifactTarget::Durable(layout) => {
            let path = layout.segment_path(sequence);
            tracing::info!("Saving segment to {}", path.display());
            wav::write_wav(&path, audio, encoding)?;
            Ok(Artifact::Saved(path))
        }
        ArtifactTarget::Transient => {
            let temp = tempfile::Builder::new()
                .prefix("auto-reader-")
                .suffix(".wav")
                .tempfile()
                .context("Failed to create temporary segment file")?
                .into_temp_path();
            wav::write_wav(&temp, audio, encoding)?;
            Ok(Artifact::Temporary(temp))
        }
    }
}
