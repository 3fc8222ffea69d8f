use serde::{Serialize, Deserialize};

use crate::audio::wav::WavEncoding;
use crate::engine::{EngineType, SynthesisOptions};

/// Voices the bundled model ships with
pub const KNOWN_VOICES: &[&str] = &[
    "af_bella", "af_nicole", "af_sarah", "af_sky",
    "am_adam", "am_michael",
    "bf_emma", "bf_isabella",
    "bm_george", "bm_lewis",
];

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tts: TtsSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Settings {
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            voice: self.tts.voice.clone(),
            speed: self.tts.speed,
            split_pattern: self.tts.split_pattern.clone(),
            sample_rate: self.tts.sample_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    pub voice: String,
    pub speed: f32,
    pub split_pattern: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice: "af_bella".to_string(),
            speed: 1.0,
            split_pattern: r"\n+".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    pub play: bool,
    pub save: bool,
    #[serde(default)]
    pub keep_segments: bool,
    #[serde(default)]
    pub encoding: WavEncoding,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            play: true,
            save: true,
            keep_segments: false,
            encoding: WavEncoding::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// How long the collector waits on the queue per poll
    pub poll_timeout_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub engine_type: EngineType,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            engine_type: EngineType::Command,
            program: "kokoro".to_string(),
            args: vec![
                "--voice".to_string(),
                "{voice}".to_string(),
                "--speed".to_string(),
                "{speed}".to_string(),
            ],
        }
    }
}
