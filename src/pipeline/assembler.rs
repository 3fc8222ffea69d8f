use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};

use super::OutputLayout;
use crate::audio::wav;
use crate::error::ReaderError;

/// Final artifacts produced from the collected segment files
#[derive(Debug, Clone, Default)]
pub struct AssembledOutput {
    pub output: PathBuf,
    pub samples: u64,
    /// Intermediate files still on disk afterwards
    pub leftovers: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Turns ordered per-segment files into the final output
pub struct OutputAssembler {
    output: PathBuf,
    keep_segments: bool,
}

impl OutputAssembler {
    pub fn new(output: &Path, keep_segments: bool) -> Self {
        Self {
            output: output.to_path_buf(),
            keep_segments,
        }
    }

    pub fn assemble(&self, segments: &[PathBuf]) -> Result<AssembledOutput> {
        match segments {
            [] => Err(ReaderError::NoSegments.into()),
            [single] => {
                move_file(single, &self.output)?;
                tracing::info!("Single segment saved as {}", self.output.display());
                Ok(AssembledOutput {
                    output: self.output.clone(),
                    samples: wav_len(&self.output)?,
                    ..Default::default()
                })
            }
            many => {
                let samples = wav::concat_wavs(many, &self.output)?;
                tracing::info!(
                    "Merged {} segments ({} samples) into {}",
                    many.len(),
                    samples,
                    self.output.display()
                );

                let leftovers = if self.keep_segments {
                    many.to_vec()
                } else {
                    remove_segments(many)
                };

                let manifest = record_leftovers(&self.output, &leftovers)?;

                Ok(AssembledOutput {
                    output: self.output.clone(),
                    samples,
                    leftovers,
                    manifest,
                })
            }
        }
    }
}

/// Deletes intermediates, returning the ones that could not be removed.
fn remove_segments(segments: &[PathBuf]) -> Vec<PathBuf> {
    segments
        .iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => false,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Segment file {} already gone", path.display());
                false
            }
            Err(e) => {
                tracing::warn!("Failed to delete segment file {}: {}", path.display(), e);
                true
            }
        })
        .cloned()
        .collect()
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
    if let Err(e) = fs::remove_file(from) {
        tracing::warn!("Failed to delete segment file {}: {}", from.display(), e);
    }
    Ok(())
}

/// Lists files still on disk in `<stem>_segments.txt` next to `output`.
fn record_leftovers(output: &Path, leftovers: &[PathBuf]) -> Result<Option<PathBuf>> {
    if leftovers.is_empty() {
        return Ok(None);
    }
    let path = OutputLayout::for_output(output).manifest_path();
    write_manifest(&path, leftovers)?;
    tracing::info!("List of segments saved to {}", path.display());
    Ok(Some(path))
}

fn write_manifest(path: &Path, segments: &[PathBuf]) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for segment in segments {
        writeln!(file, "{}", segment.display())?;
    }
    Ok(())
}

fn wav_len(path: &Path) -> Result<u64> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to read back {}", path.display()))?;
    Ok(reader.len() as u64)
}
