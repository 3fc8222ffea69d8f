use std::path::PathBuf;
use clap::Parser;

use crate::audio::wav::WavEncoding;
use crate::settings::Settings;

/// Convert text files to speech
#[derive(Debug, Parser)]
#[command(name = "auto-reader", version)]
#[command(about = "AutoReader - convert text files to speech with a neural TTS engine")]
pub struct Cli {
    /// Path to the input .txt file
    pub input_file: PathBuf,

    /// Output audio file name
    #[arg(short, long, default_value = "output.wav")]
    pub output: PathBuf,

    /// Voice to use (af_bella, af_nicole, af_sarah, af_sky, am_adam, am_michael, bf_emma, bf_isabella, bm_george, bm_lewis)
    #[arg(short, long)]
    pub voice: Option<String>,

    /// Play audio out loud during generation
    #[arg(short, long, overrides_with = "no_play")]
    pub play: bool,

    /// Don't play audio out loud during generation
    #[arg(long)]
    pub no_play: bool,

    /// Save audio files to disk
    #[arg(short, long, overrides_with = "no_save")]
    pub save: bool,

    /// Don't save audio files to disk, just play them
    #[arg(long)]
    pub no_save: bool,

    /// Speech speed multiplier
    #[arg(long)]
    pub speed: Option<f32>,

    /// Regex used to split the text into segments
    #[arg(long)]
    pub split_pattern: Option<String>,

    /// Keep per-segment files next to the merged output
    #[arg(long)]
    pub keep_segments: bool,

    #[arg(long, value_enum)]
    pub encoding: Option<WavEncoding>,

    /// Collector poll timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save the effective settings back to the settings file
    #[arg(long)]
    pub write_config: bool,

    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Layers command-line values over stored settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(voice) = &self.voice {
            settings.tts.voice = voice.clone();
        }
        if let Some(speed) = self.speed {
            settings.tts.speed = speed;
        }
        if let Some(pattern) = &self.split_pattern {
            settings.tts.split_pattern = pattern.clone();
        }
        if self.play {
            settings.output.play = true;
        }
        if self.no_play {
            settings.output.play = false;
        }
        if self.save {
            settings.output.save = true;
        }
        if self.no_save {
            settings.output.save = false;
        }
        if self.keep_segments {
            settings.output.keep_segments = true;
        }
        if let Some(encoding) = self.encoding {
            settings.output.encoding = encoding;
        }
        if let Some(timeout) = self.timeout_ms {
            settings.pipeline.poll_timeout_ms = timeout;
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}
