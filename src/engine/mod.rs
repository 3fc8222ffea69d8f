pub mod command_tts;

use std::pin::Pin;
use anyhow::Result;
use futures_util::Stream;
use serde::{Serialize, Deserialize};

use crate::settings::Settings;

/// Synthesis runtime type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Command,
}

impl Default for EngineType {
    fn default() -> Self {
        Self::Command
    }
}

/// Audio buffer for passing audio data between modules
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate, channels: 1 }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// Synthesis options handed to the engine for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOptions {
    pub voice: String,
    pub speed: f32,
    pub split_pattern: String,
    pub sample_rate: u32,
}

/// One item yielded by a synthesizer, in generation order
#[derive(Debug, Clone)]
pub struct GeneratedSegment {
    pub text: String,
    pub phonemes: Option<String>,
    pub audio: AudioBuffer,
}

/// Lazy, finite stream of generated segments. Consumed exactly once.
pub type SegmentStream = Pin<Box<dyn Stream<Item = Result<GeneratedSegment>> + Send>>;

/// Text -> ordered stream of audio segments
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<SegmentStream>;
    fn name(&self) -> &str;
}

/// Factory to create the configured synthesizer
pub fn create_synthesizer(settings: &Settings) -> Result<Box<dyn Synthesizer>> {
    match settings.engine.engine_type {
        EngineType::Command => {
            let engine = command_tts::CommandSynthesizer::new(
                &settings.engine.program,
                settings.engine.args.clone(),
            )?;
            Ok(Box::new(engine))
        }
    }
}
