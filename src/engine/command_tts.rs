use std::io::{Cursor, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use anyhow::{Result, Context};
use regex::Regex;

use super::{AudioBuffer, GeneratedSegment, SegmentStream, SynthesisOptions, Synthesizer};
use crate::audio::{processing, wav};

/// External TTS engine driven through a child process.
///
/// The program receives one text fragment on stdin and must write a WAV file
/// to stdout. `{voice}` and `{speed}` in the argument list are substituted
/// per run.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(program: &str, args: Vec<String>) -> Result<Self> {
        let program = program.trim();
        if program.is_empty() {
            anyhow::bail!("No synthesis engine program configured");
        }
        Ok(Self {
            program: program.to_string(),
            args,
        })
    }

    fn expand_args(&self, options: &SynthesisOptions) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", &options.voice)
                    .replace("{speed}", &options.speed.to_string())
            })
            .collect()
    }
}

/// Splits `text` on `pattern`, dropping fragments that are only whitespace.
pub fn split_fragments(text: &str, pattern: &str) -> Result<Vec<String>> {
    let re = Regex::new(pattern)
        .with_context(|| format!("Invalid split pattern: {}", pattern))?;
    Ok(re
        .split(text)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect())
}

struct Invocation {
    program: String,
    args: Vec<String>,
    sample_rate: u32,
}

impl Invocation {
    fn run(&self, text: String) -> Result<GeneratedSegment> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start synthesis engine '{}'", self.program))?;

        // Feed stdin from a separate thread so a chatty engine can't deadlock on a full stdout pipe.
        let mut stdin = child.stdin.take().context("Synthesis engine stdin unavailable")?;
        let input = text.clone();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()
            .context("Failed to wait for synthesis engine")?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Synthesis engine closed stdin early: {}", e),
            Err(_) => anyhow::bail!("Synthesis stdin writer panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Synthesis engine '{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }
        if output.stdout.is_empty() {
            anyhow::bail!("Synthesis engine '{}' produced no audio", self.program);
        }

        let reader = hound::WavReader::new(Cursor::new(output.stdout))
            .context("Synthesis engine output is not a WAV stream")?;
        let decoded = wav::decode(reader)?;
        let mono = processing::downmix(&decoded.samples, decoded.channels);
        let samples = processing::resample(&mono, decoded.sample_rate, self.sample_rate)?;

        Ok(GeneratedSegment {
            text,
            phonemes: None,
            audio: AudioBuffer::mono(samples, self.sample_rate),
        })
    }
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<SegmentStream> {
        let fragments = split_fragments(text, &options.split_pattern)?;
        tracing::info!("Synthesizing {} text fragment(s) with '{}'", fragments.len(), self.program);

        let invocation = Arc::new(Invocation {
            program: self.program.clone(),
            args: self.expand_args(options),
            sample_rate: options.sample_rate,
        });

        let stream = futures_util::stream::unfold(
            (fragments.into_iter(), invocation),
            |(mut fragments, invocation)| async move {
                let Some(fragment) = fragments.next() else {
                    return None;
                };
                let job = Arc::clone(&invocation);
                let result = tokio::task::spawn_blocking(move || job.run(fragment))
                    .await
                    .map_err(|e| anyhow::anyhow!("Synthesis task failed: {}", e))
                    .and_then(|r| r);
                Some((result, (fragments, invocation)))
            },
        );

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.program
    }
}
