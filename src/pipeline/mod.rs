//! Ordered asynchronous synthesis pipeline.
//!
//! The generation driver hands every synthesized segment to its own worker.
//! Workers finish in any order and report into the rendezvous queue; the
//! collector takes results back out strictly by sequence number, plays and
//! records them, and the assembler builds the final file.

pub mod assembler;
pub mod collector;
pub mod driver;
pub mod queue;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, Context};
use tokio::sync::watch;

pub use assembler::{AssembledOutput, OutputAssembler};
pub use collector::{Collected, ResultCollector};
pub use driver::{DriverState, GenerationDriver};
pub use queue::RendezvousQueue;
pub use worker::{Artifact, ArtifactTarget, PendingResult, Segment, SegmentOutcome, SegmentWorker};

use crate::audio::wav::WavEncoding;
use crate::audio::AudioPlayer;
use crate::engine::SegmentStream;
use crate::error::ReaderError;

/// Naming scheme for files derived from the output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
    stem: String,
}

impl OutputLayout {
    pub fn for_output(output: &Path) -> Self {
        let dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        Self { dir, stem }
    }

    /// `<stem>_segment_<n>.wav`, numbered from 1
    pub fn segment_path(&self, sequence: usize) -> PathBuf {
        self.dir.join(format!("{}_segment_{}.wav", self.stem, sequence + 1))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}_segments.txt", self.stem))
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output: PathBuf,
    pub save: bool,
    pub keep_segments: bool,
    pub encoding: WavEncoding,
    pub poll_timeout: Duration,
    pub interactive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub generated: usize,
    pub failed: usize,
    pub played_secs: f32,
    /// Present only when saving
    pub assembled: Option<AssembledOutput>,
}

/// Runs generation and collection side by side, then assembles the output.
///
/// `player` is `None` when playback is disabled.
pub async fn run_pipeline(
    stream: SegmentStream,
    player: Option<Arc<dyn AudioPlayer>>,
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    let queue = Arc::new(RendezvousQueue::new());
    let (state_tx, state_rx) = watch::channel(DriverState::Running);

    let target = if config.save {
        ArtifactTarget::Durable(OutputLayout::for_output(&config.output))
    } else {
        ArtifactTarget::Transient
    };
    let worker = SegmentWorker::new(target, config.encoding, Arc::clone(&queue))
        .with_interactive(config.interactive);

    let driver = GenerationDriver::new(Arc::new(worker), state_tx);
    let collector = ResultCollector::new(
        Arc::clone(&queue),
        player,
        config.poll_timeout,
        state_rx,
    );

    tracing::info!("Processing audio segments...");
    let (generated, collected) = tokio::join!(driver.run(stream), collector.run());
    let generated = generated?;
    let collected = collected?;

    if generated == 0 || collected.failed == generated {
        return Err(ReaderError::NoSegments.into());
    }
    if collected.failed > 0 {
        tracing::warn!("{} of {} segment(s) failed and were skipped", collected.failed, generated);
    }

    let mut report = PipelineReport {
        generated,
        failed: collected.failed,
        played_secs: collected.played_secs,
        assembled: None,
    };

    if !config.save {
        tracing::info!("Audio playback complete. No files were saved to disk.");
        return Ok(report);
    }

    let assembler = OutputAssembler::new(&config.output, config.keep_segments);
    let saved = collected.saved;
    let assembled = tokio::task::spawn_blocking(move || assembler.assemble(&saved))
        .await
        .context("Output assembly task failed")??;
    report.assembled = Some(assembled);

    Ok(report)
}
