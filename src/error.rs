use std::path::PathBuf;
use thiserror::Error;

use crate::settings::KNOWN_VOICES;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Input file '{0}' does not exist")]
    InputNotFound(PathBuf),

    #[error("Failed to read input file '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("You've disabled both saving and playing audio. At least one of these options must be enabled.")]
    PlaybackAndSaveDisabled,

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("No audio was generated")]
    NoSegments,
}

/// Diagnostic for errors that look like a missing voice file.
pub fn voice_hint(error: &anyhow::Error, voice: &str) -> Option<String> {
    let text = format!("{:#}", error);
    let voice_file_missing = (text.contains("voices") && text.contains(".pt"))
        || text.to_lowercase().contains("voice not found");
    if !voice_file_missing {
        return None;
    }

    Some(format!(
        "Likely cause: Voice file not found. Valid voices are: {}\nTried to use voice: '{}'",
        KNOWN_VOICES.join(", "),
        voice
    ))
}
