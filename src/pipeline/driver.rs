use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use anyhow::Result;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::worker::{Segment, SegmentWorker};
use crate::engine::SegmentStream;
use crate::error::ReaderError;

/// Progress of the generation side, as seen by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    /// Synthesis is exhausted; this many segments were dispatched
    Finished(usize),
    Failed,
}

/// Pulls segments from the synthesis stream and fans them out to workers
pub struct GenerationDriver {
    worker: Arc<SegmentWorker>,
    state: watch::Sender<DriverState>,
}

impl GenerationDriver {
    pub fn new(worker: Arc<SegmentWorker>, state: watch::Sender<DriverState>) -> Self {
        Self { worker, state }
    }

    /// Returns the number of segments dispatched once every worker has finished.
    pub async fn run(self, mut stream: SegmentStream) -> Result<usize> {
        let mut workers = JoinSet::new();
        let mut dispatched = 0usize;

        let outcome = loop {
            match stream.next().await {
                Some(Ok(generated)) => {
                    let segment = Segment::new(dispatched, &generated.text, generated.audio);
                    tracing::info!("Segment {}: {}...", dispatched + 1, segment.text_preview);
                    if let Some(phonemes) = &generated.phonemes {
                        tracing::debug!("Segment {} phonemes: {}", dispatched + 1, phonemes);
                    }

                    let worker = Arc::clone(&self.worker);
                    workers.spawn(async move {
                        let sequence = segment.sequence;
                        let preview = segment.text_preview.clone();
                        if AssertUnwindSafe(worker.process(segment)).catch_unwind().await.is_err() {
                            tracing::error!("Worker for segment {} panicked", sequence + 1);
                            worker.report_failure(sequence, preview, "worker panicked");
                        }
                    });
                    dispatched += 1;

                    tokio::task::yield_now().await;
                }
                Some(Err(e)) => break Err(ReaderError::Synthesis(format!("{:#}", e)).into()),
                None => break Ok(dispatched),
            }
        };

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Segment worker task failed: {}", e);
            }
        }

        let published = match &outcome {
            Ok(count) => DriverState::Finished(*count),
            Err(_) => DriverState::Failed,
        };
        self.state.send_replace(published);

        if let Ok(count) = &outcome {
            tracing::info!("Generation finished: {} segment(s) dispatched", count);
        }
        outcome
    }
}
