use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, Context};

use crate::audio::AudioPlayer;
use crate::engine::{self, Synthesizer};
use crate::error::ReaderError;
use crate::pipeline::{self, PipelineConfig, PipelineReport};
use crate::platform;
use crate::settings::{Settings, KNOWN_VOICES};

/// Outcome of one text-to-speech conversion
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub segments: usize,
    pub failed: usize,
    pub played_secs: f32,
    pub output: Option<PathBuf>,
    pub leftovers: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
}

impl From<PipelineReport> for ConversionSummary {
    fn from(report: PipelineReport) -> Self {
        let (output, leftovers, manifest) = match report.assembled {
            Some(assembled) => (Some(assembled.output), assembled.leftovers, assembled.manifest),
            None => (None, Vec::new(), None),
        };
        Self {
            segments: report.generated,
            failed: report.failed,
            played_secs: report.played_secs,
            output,
            leftovers,
            manifest,
        }
    }
}

/// Validates settings in place: trims the voice and rejects unusable combinations.
pub fn validate_settings(settings: &mut Settings) -> Result<()> {
    settings.tts.voice = settings.tts.voice.trim().to_string();
    if !KNOWN_VOICES.contains(&settings.tts.voice.as_str()) {
        tracing::warn!("'{}' may not be a valid voice.", settings.tts.voice);
        tracing::warn!("Valid voices are: {}", KNOWN_VOICES.join(", "));
    }

    if !settings.output.save && !settings.output.play {
        return Err(ReaderError::PlaybackAndSaveDisabled.into());
    }
    if !settings.tts.speed.is_finite() || settings.tts.speed <= 0.0 {
        return Err(ReaderError::InvalidSetting(format!(
            "speed must be a positive number, got {}",
            settings.tts.speed
        )).into());
    }
    if settings.pipeline.poll_timeout_ms == 0 {
        return Err(ReaderError::InvalidSetting("poll timeout must be positive".into()).into());
    }
    if settings.tts.sample_rate == 0 {
        return Err(ReaderError::InvalidSetting("sample rate must be positive".into()).into());
    }
    Ok(())
}

/// Reads the whole input file, classifying failures before any work starts.
pub fn read_input(input: &Path) -> Result<String> {
    if !input.exists() {
        return Err(ReaderError::InputNotFound(input.to_path_buf()).into());
    }
    if input.extension().and_then(|e| e.to_str()) != Some("txt") {
        tracing::warn!("Input file '{}' does not have a .txt extension.", input.display());
    }

    tracing::info!("Reading text from {}...", input.display());
    std::fs::read_to_string(input).map_err(|source| {
        ReaderError::InputUnreadable {
            path: input.to_path_buf(),
            source,
        }
        .into()
    })
}

fn prepare_output_dir(output: &Path) -> Result<()> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            tracing::info!("Created output directory: {}", dir.display());
        }
    }
    Ok(())
}

/// Full conversion with explicit collaborators.
pub async fn convert_with(
    settings: &Settings,
    input: &Path,
    output: &Path,
    synthesizer: &dyn Synthesizer,
    player: Option<Arc<dyn AudioPlayer>>,
    interactive: bool,
) -> Result<ConversionSummary> {
    let text = read_input(input)?;

    if settings.output.save {
        prepare_output_dir(output)?;
    }

    tracing::info!(
        "Generating speech using voice: '{}' ({})...",
        settings.tts.voice,
        synthesizer.name()
    );
    let stream = synthesizer
        .synthesize(&text, &settings.synthesis_options())
        .map_err(|e| ReaderError::Synthesis(format!("{:#}", e)))?;

    let config = PipelineConfig {
        output: output.to_path_buf(),
        save: settings.output.save,
        keep_segments: settings.output.keep_segments,
        encoding: settings.output.encoding,
        poll_timeout: Duration::from_millis(settings.pipeline.poll_timeout_ms),
        interactive,
    };

    let report = pipeline::run_pipeline(stream, player, &config).await?;
    Ok(report.into())
}

/// Builds the configured engine and player, then converts on a single-threaded runtime.
pub fn do_convert(settings: &Settings, input: &Path, output: &Path) -> Result<ConversionSummary> {
    let synthesizer = engine::create_synthesizer(settings)?;
    let player: Option<Arc<dyn AudioPlayer>> = if settings.output.play {
        let player: Arc<dyn AudioPlayer> = Arc::from(platform::default_player());
        tracing::info!("Audio playback via {}", player.name());
        Some(player)
    } else {
        None
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let interactive = std::io::IsTerminal::is_terminal(&std::io::stdout());
    runtime.block_on(convert_with(
        settings,
        input,
        output,
        synthesizer.as_ref(),
        player,
        interactive,
    ))
}
