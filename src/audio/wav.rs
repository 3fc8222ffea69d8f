use std::io::Read;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Serialize, Deserialize};

use crate::engine::AudioBuffer;

/// On-disk sample encoding for written artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WavEncoding {
    Pcm16,
    Float32,
}

impl Default for WavEncoding {
    fn default() -> Self {
        Self::Pcm16
    }
}

/// Full scale for 16-bit PCM, shared by encode and decode.
const PCM16_SCALE: f32 = 32_768.0;

impl WavEncoding {
    fn spec(self, sample_rate: u32, channels: u16) -> WavSpec {
        match self {
            Self::Pcm16 => WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
            Self::Float32 => WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        }
    }
}

pub fn write_wav(path: &Path, audio: &AudioBuffer, encoding: WavEncoding) -> Result<()> {
    let spec = encoding.spec(audio.sample_rate, audio.channels.max(1));
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    match encoding {
        WavEncoding::Pcm16 => {
            for &sample in &audio.samples {
                let value = (sample * PCM16_SCALE)
                    .round()
                    .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(value)?;
            }
        }
        WavEncoding::Float32 => {
            for &sample in &audio.samples {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;
    Ok(())
}

pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    decode(reader)
}

/// Decodes every sample of `reader` into normalized f32.
pub fn decode<R: Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Concatenates WAV files sample-for-sample into `output`.
///
/// Samples are copied in their stored format, so the result holds exactly the
/// inputs' samples in order. Every input must share the first input's spec.
/// Returns the number of samples written.
pub fn concat_wavs(inputs: &[PathBuf], output: &Path) -> Result<u64> {
    let first = inputs.first().context("No WAV files to concatenate")?;
    let spec = WavReader::open(first)
        .with_context(|| format!("Failed to open {}", first.display()))?
        .spec();

    let mut writer = WavWriter::create(output, spec)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut written: u64 = 0;

    for input in inputs {
        let reader = WavReader::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        if reader.spec() != spec {
            anyhow::bail!(
                "{} has format {:?}, expected {:?}",
                input.display(),
                reader.spec(),
                spec
            );
        }

        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.into_samples::<f32>() {
                    writer.write_sample(sample?)?;
                    written += 1;
                }
            }
            SampleFormat::Int => {
                for sample in reader.into_samples::<i32>() {
                    writer.write_sample(sample?)?;
                    written += 1;
                }
            }
        }
    }

    writer.finalize()
        .with_context(|| format!("Failed to finalize {}", output.display()))?;
    Ok(written)
}
