//! End-to-end tests for the text -> segments -> output pipeline.
//!
//! A scripted synthesizer stands in for the neural engine, and a recording
//! player stands in for the audio device.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use auto_reader_lib::audio::wav::{self, WavEncoding};
use auto_reader_lib::audio::AudioPlayer;
use auto_reader_lib::commands::convert::convert_with;
use auto_reader_lib::engine::command_tts::{split_fragments, CommandSynthesizer};
use auto_reader_lib::engine::{AudioBuffer, GeneratedSegment, SegmentStream, SynthesisOptions, Synthesizer};
use auto_reader_lib::error::{voice_hint, ReaderError};
use auto_reader_lib::settings::Settings;

/// Emits one segment per fragment; fragment `i` gets `(i + 1) * 2400` samples of value `(i + 1) / 10`.
struct ScriptedSynthesizer {
    fail_at: Option<usize>,
    delay: Duration,
}

impl ScriptedSynthesizer {
    fn new() -> Self {
        Self { fail_at: None, delay: Duration::ZERO }
    }
}

fn scripted_audio(index: usize, sample_rate: u32) -> AudioBuffer {
    let value = (index + 1) as f32 / 10.0;
    AudioBuffer::mono(vec![value; 2400 * (index + 1)], sample_rate)
}

impl Synthesizer for ScriptedSynthesizer {
    fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<SegmentStream> {
        let fragments = split_fragments(text, &options.split_pattern)?;
        let rate = options.sample_rate;
        let fail_at = self.fail_at;
        let delay = self.delay;

        let stream = futures_util::stream::unfold(
            (fragments.into_iter().enumerate(), fail_at),
            move |(mut fragments, fail_at)| async move {
                let Some((index, text)) = fragments.next() else {
                    return None;
                };
                tokio::time::sleep(delay).await;
                let item = if Some(index) == fail_at {
                    Err(anyhow::anyhow!("voices/af_missing.pt not found"))
                } else {
                    Ok(GeneratedSegment {
                        text,
                        phonemes: Some("həlˈoʊ".to_string()),
                        audio: scripted_audio(index, rate),
                    })
                };
                Some((item, (fragments, fail_at)))
            },
        );
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingPlayer {
    played: Mutex<Vec<PathBuf>>,
    existed: Mutex<Vec<bool>>,
}

impl AudioPlayer for RecordingPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        self.played.lock().unwrap().push(path.to_path_buf());
        self.existed.lock().unwrap().push(path.exists());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FailingPlayer;

impl AudioPlayer for FailingPlayer {
    fn play(&self, _path: &Path) -> Result<()> {
        anyhow::bail!("no audio device")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn settings(play: bool, save: bool) -> Settings {
    let mut settings = Settings::default();
    settings.output.play = play;
    settings.output.save = save;
    settings.output.encoding = WavEncoding::Float32;
    settings.pipeline.poll_timeout_ms = 200;
    settings
}

fn write_input(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("input.txt");
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn two_lines_are_merged_into_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "Hello.\nWorld.");
    let output = dir.path().join("out.wav");

    let summary = convert_with(&settings(false, true), &input, &output, &ScriptedSynthesizer::new(), None, false)
        .await
        .unwrap();

    assert_eq!(summary.segments, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.output.as_deref(), Some(output.as_path()));
    assert!(summary.leftovers.is_empty());
    assert!(summary.manifest.is_none());

    assert!(!dir.path().join("out_segment_1.wav").exists());
    assert!(!dir.path().join("out_segment_2.wav").exists());

    let merged = wav::read_wav(&output).unwrap();
    let first = scripted_audio(0, 24_000);
    let second = scripted_audio(1, 24_000);
    assert_eq!(merged.sample_rate, 24_000);
    assert_eq!(merged.samples.len(), first.samples.len() + second.samples.len());
    assert_eq!(&merged.samples[..first.samples.len()], &first.samples[..]);
    assert_eq!(&merged.samples[first.samples.len()..], &second.samples[..]);
    assert!((merged.duration_secs() - (first.duration_secs() + second.duration_secs())).abs() < 1e-3);
}

#[tokio::test]
async fn single_segment_output_matches_segment_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "Only one line.\n");
    let output = dir.path().join("single.wav");

    convert_with(&settings(false, true), &input, &output, &ScriptedSynthesizer::new(), None, false)
        .await
        .unwrap();

    let expected = dir.path().join("expected.wav");
    wav::write_wav(&expected, &scripted_audio(0, 24_000), WavEncoding::Float32).unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&expected).unwrap());
    assert!(!dir.path().join("single_segment_1.wav").exists());
}

#[tokio::test]
async fn play_only_leaves_no_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "one\ntwo\nthree");
    let output = dir.path().join("out.wav");
    let player = Arc::new(RecordingPlayer::default());

    let summary = convert_with(
        &settings(true, false),
        &input,
        &output,
        &ScriptedSynthesizer::new(),
        Some(player.clone() as Arc<dyn AudioPlayer>),
        false,
    )
    .await
    .unwrap();

    assert_eq!(summary.segments, 3);
    assert!(summary.output.is_none());
    assert!(!output.exists());

    let played = player.played.lock().unwrap().clone();
    assert_eq!(played.len(), 3);
    assert!(player.existed.lock().unwrap().iter().all(|&e| e));
    for path in &played {
        assert!(!path.exists(), "{} should have been deleted", path.display());
    }
}

#[tokio::test]
async fn playback_follows_sequence_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "a\nb\nc\nd\ne");
    let output = dir.path().join("ordered.wav");
    let player = Arc::new(RecordingPlayer::default());
    let synthesizer = ScriptedSynthesizer { fail_at: None, delay: Duration::from_millis(5) };

    convert_with(
        &settings(true, true),
        &input,
        &output,
        &synthesizer,
        Some(player.clone() as Arc<dyn AudioPlayer>),
        false,
    )
    .await
    .unwrap();

    let played = player.played.lock().unwrap().clone();
    let expected: Vec<PathBuf> = (1..=5)
        .map(|n| dir.path().join(format!("ordered_segment_{}.wav", n)))
        .collect();
    assert_eq!(played, expected);
}

#[tokio::test]
async fn playback_failure_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "a\nb");
    let output = dir.path().join("out.wav");

    let summary = convert_with(
        &settings(true, true),
        &input,
        &output,
        &ScriptedSynthesizer::new(),
        Some(Arc::new(FailingPlayer) as Arc<dyn AudioPlayer>),
        false,
    )
    .await
    .unwrap();

    assert_eq!(summary.played_secs, 0.0);
    assert!(output.exists());
}

#[tokio::test]
async fn keep_segments_writes_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "a\nb");
    let output = dir.path().join("book.wav");
    let mut settings = settings(false, true);
    settings.output.keep_segments = true;

    let summary = convert_with(&settings, &input, &output, &ScriptedSynthesizer::new(), None, false)
        .await
        .unwrap();

    let manifest = summary.manifest.unwrap();
    let listed = std::fs::read_to_string(&manifest).unwrap();
    assert_eq!(listed.lines().count(), 2);
    assert!(dir.path().join("book_segment_1.wav").exists());
    assert!(dir.path().join("book_segment_2.wav").exists());
}

#[tokio::test]
async fn output_directory_is_created_when_saving() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "a\nb");
    let output = dir.path().join("nested").join("out.wav");

    convert_with(&settings(false, true), &input, &output, &ScriptedSynthesizer::new(), None, false)
        .await
        .unwrap();

    assert!(output.exists());
}

#[tokio::test]
async fn synthesis_failure_is_fatal_and_hinted() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "a\nb\nc");
    let output = dir.path().join("out.wav");
    let synthesizer = ScriptedSynthesizer { fail_at: Some(1), delay: Duration::ZERO };

    let err = convert_with(&settings(false, true), &input, &output, &synthesizer, None, false)
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<ReaderError>(), Some(ReaderError::Synthesis(_))));
    assert!(voice_hint(&err, "af_missing").is_some());
    assert!(!output.exists());
    // Completed segments are not rolled back.
    assert!(dir.path().join("out_segment_1.wav").exists());
}

#[tokio::test]
async fn blank_input_produces_no_segments_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "\n\n   \n");
    let output = dir.path().join("out.wav");

    let err = convert_with(&settings(false, true), &input, &output, &ScriptedSynthesizer::new(), None, false)
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<ReaderError>(), Some(ReaderError::NoSegments)));
}

#[tokio::test]
async fn missing_input_fails_before_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.wav");

    let err = convert_with(
        &settings(false, true),
        &dir.path().join("absent.txt"),
        &output,
        &ScriptedSynthesizer::new(),
        None,
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(err.downcast_ref::<ReaderError>(), Some(ReaderError::InputNotFound(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn command_engine_output_is_downmixed_and_resampled() {
    let dir = tempfile::tempdir().unwrap();

    // `cat <voice>` ignores stdin and replays a canned 16 kHz stereo clip.
    let canned = dir.path().join("canned.wav");
    let stereo: Vec<f32> = (0..16_000).flat_map(|i| {
        let s = (i as f32 * 0.02).sin() * 0.5;
        [s, s]
    }).collect();
    let clip = AudioBuffer { samples: stereo, sample_rate: 16_000, channels: 2 };
    wav::write_wav(&canned, &clip, WavEncoding::Pcm16).unwrap();

    let synthesizer = CommandSynthesizer::new("cat", vec!["{voice}".to_string()]).unwrap();
    let mut settings = settings(false, true);
    settings.tts.voice = canned.display().to_string();

    let input = write_input(dir.path(), "first\nsecond");
    let output = dir.path().join("cmd.wav");

    let summary = convert_with(&settings, &input, &output, &synthesizer, None, false)
        .await
        .unwrap();
    assert_eq!(summary.segments, 2);

    let merged = wav::read_wav(&output).unwrap();
    assert_eq!(merged.channels, 1);
    assert_eq!(merged.sample_rate, 24_000);
    // two one-second clips at 24 kHz
    assert!((merged.samples.len() as i64 - 48_000).abs() < 200, "got {}", merged.samples.len());
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_engine_surfaces_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let synthesizer = CommandSynthesizer::new(
        "sh",
        vec!["-c".to_string(), "echo 'voices/{voice}.pt: No such file' >&2; exit 3".to_string()],
    )
    .unwrap();
    let mut settings = settings(false, true);
    settings.tts.voice = "zz_ghost".to_string();

    let input = write_input(dir.path(), "hello");
    let err = convert_with(&settings, &input, &dir.path().join("out.wav"), &synthesizer, None, false)
        .await
        .unwrap_err();

    let text = format!("{:#}", err);
    assert!(text.contains("voices/zz_ghost.pt"), "{}", text);
    let hint = voice_hint(&err, "zz_ghost").unwrap();
    assert!(hint.contains("Tried to use voice: 'zz_ghost'"));
}
