#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::*;

use std::path::Path;
use std::process::Command;
use anyhow::{Result, Context};

use crate::audio::AudioPlayer;

/// Plays files through an external command, passing the path as the last argument
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .with_context(|| format!("Failed to run '{}'", self.program))?;
        if !status.success() {
            anyhow::bail!("'{}' exited with {}", self.program, status);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Picks the playback backend for the host platform
pub fn default_player() -> Box<dyn AudioPlayer> {
    #[cfg(target_os = "macos")]
    {
        Box::new(afplay_player())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(crate::audio::CpalPlayer::new())
    }
}
