use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tokio::sync::watch;

use super::driver::DriverState;
use super::queue::RendezvousQueue;
use super::worker::{Artifact, PendingResult, SegmentOutcome};
use crate::audio::AudioPlayer;

/// What the collector gathered, in sequence order
#[derive(Debug, Default)]
pub struct Collected {
    /// Saved segment files, ascending by sequence
    pub saved: Vec<PathBuf>,
    pub processed: usize,
    pub failed: usize,
    pub played_secs: f32,
}

/// Drains the rendezvous queue strictly in sequence order
pub struct ResultCollector {
    queue: Arc<RendezvousQueue<PendingResult>>,
    player: Option<Arc<dyn AudioPlayer>>,
    poll_timeout: Duration,
    driver: watch::Receiver<DriverState>,
}

enum Poll {
    Item(Option<(usize, PendingResult)>),
    DriverUpdate,
}

impl ResultCollector {
    pub fn new(
        queue: Arc<RendezvousQueue<PendingResult>>,
        player: Option<Arc<dyn AudioPlayer>>,
        poll_timeout: Duration,
        driver: watch::Receiver<DriverState>,
    ) -> Self {
        Self {
            queue,
            player,
            poll_timeout,
            driver,
        }
    }

    pub async fn run(mut self) -> Result<Collected> {
        let mut collected = Collected::default();
        let mut next = 0usize;
        let mut idle_polls = 0u32;
        let mut driver_gone = false;

        loop {
            let state = *self.driver.borrow_and_update();
            match state {
                DriverState::Failed => {
                    tracing::debug!("Generation failed; collector stopping after {} segment(s)", next);
                    return Ok(collected);
                }
                DriverState::Finished(total) if next >= total => return Ok(collected),
                _ => {}
            }

            let poll = tokio::select! {
                item = self.queue.get_next(next, self.poll_timeout) => Poll::Item(item),
                changed = self.driver.changed(), if !driver_gone => {
                    if changed.is_err() {
                        driver_gone = true;
                    }
                    Poll::DriverUpdate
                }
            };

            match poll {
                Poll::DriverUpdate => continue,
                Poll::Item(Some((sequence, result))) => {
                    idle_polls = 0;
                    if sequence < next {
                        tracing::warn!("Discarding duplicate result for segment {}", sequence + 1);
                        discard(result);
                        continue;
                    }
                    self.handle(result, &mut collected).await;
                    next += 1;
                }
                Poll::Item(None) => {
                    idle_polls += 1;
                    match *self.driver.borrow() {
                        DriverState::Finished(total) if next < total => {
                            tracing::warn!(
                                "Still waiting for segment {} of {} ({} idle poll(s))",
                                next + 1,
                                total,
                                idle_polls
                            );
                        }
                        DriverState::Running => {
                            tracing::debug!("Waiting for segment {} ({} collected so far)", next + 1, next);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    async fn handle(&self, result: PendingResult, collected: &mut Collected) {
        let number = result.sequence + 1;
        collected.processed += 1;

        let artifact = match result.outcome {
            SegmentOutcome::Ready(artifact) => artifact,
            SegmentOutcome::Failed(reason) => {
                collected.failed += 1;
                tracing::warn!("Skipping segment {} ({}): {}", number, result.text_preview, reason);
                return;
            }
        };

        if let Some(player) = &self.player {
            tracing::info!("Playing segment {}...", number);
            let player = Arc::clone(player);
            let path = artifact.path().to_path_buf();
            let shown = path.clone();
            match tokio::task::spawn_blocking(move || player.play(&path)).await {
                Ok(Ok(())) => collected.played_secs += result.duration_secs,
                Ok(Err(e)) => {
                    tracing::warn!("Audio playback failed: {:#}. File is at: {}", e, shown.display());
                }
                Err(e) => tracing::warn!("Playback task for segment {} failed: {}", number, e),
            }
        }

        match artifact {
            Artifact::Saved(path) => collected.saved.push(path),
            Artifact::Temporary(temp) => discard_temporary(temp),
        }
    }
}

fn discard(result: PendingResult) {
    if let SegmentOutcome::Ready(Artifact::Temporary(temp)) = result.outcome {
        discard_temporary(temp);
    }
}

fn discard_temporary(temp: tempfile::TempPath) {
    let path = temp.to_path_buf();
    if let Err(e) = temp.close() {
        tracing::debug!("Failed to delete temporary file {}: {}", path.display(), e);
    }
}
