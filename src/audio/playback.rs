use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use anyhow::{Result, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{processing, wav};

/// Extra wait past the clip length before giving up on the device.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
/// Time left for the device buffer to play out after the last sample is handed over.
const TAIL_LATENCY: Duration = Duration::from_millis(150);

/// Plays an audio artifact to completion
pub trait AudioPlayer: Send + Sync {
    fn play(&self, path: &Path) -> Result<()>;
    fn name(&self) -> &str;
}

/// Plays WAV files on the default cpal output device
pub struct CpalPlayer;

impl CpalPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayer for CpalPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        let audio = wav::read_wav(path)?;

        let host = cpal::default_host();
        let device = host.default_output_device()
            .context("No output device available")?;
        let config = device.default_output_config()
            .context("Failed to get default output config")?;

        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let device_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels;

        let mono = processing::downmix(&audio.samples, audio.channels);
        let resampled = processing::resample(&mono, audio.sample_rate, device_rate)?;
        let frames = resampled.len();
        let interleaved = Arc::new(processing::upmix(&resampled, device_channels));

        let (done_tx, done_rx) = mpsc::channel();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, interleaved, done_tx)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, interleaved, done_tx)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, interleaved, done_tx)?,
            other => anyhow::bail!("Unsupported output sample format: {:?}", other),
        };

        stream.play().context("Failed to start audio stream")?;
        tracing::debug!("Playing {} ({} frames at {}Hz)", path.display(), frames, device_rate);

        let clip = Duration::from_secs_f64(frames as f64 / device_rate.max(1) as f64);
        match done_rx.recv_timeout(clip + DRAIN_GRACE) {
            Ok(()) => std::thread::sleep(TAIL_LATENCY),
            Err(_) => anyhow::bail!("Playback of {} did not finish", path.display()),
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<Vec<f32>>,
    done: mpsc::Sender<()>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let start = position.load(Ordering::Relaxed);
            for (i, slot) in data.iter_mut().enumerate() {
                let sample = samples.get(start + i).copied().unwrap_or(0.0);
                *slot = T::from_sample(sample);
            }
            let next = start + data.len();
            position.store(next, Ordering::Relaxed);
            if next >= samples.len() && !finished.swap(true, Ordering::SeqCst) {
                let _ = done.send(());
            }
        },
        |err| {
            tracing::error!("Audio playback error: {}", err);
        },
        None,
    ).context("Failed to build output stream")?;

    Ok(stream)
}
