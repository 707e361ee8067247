use async_trait::async_trait;
use newsreel::captions::{build_caption_track, segment_phrases, CaptionStyle};
use newsreel::config::Config;
use newsreel::error::NewsreelError;
use newsreel::pipeline::Composer;
use newsreel::story::{detect_boundaries, StorySegment};
use newsreel::transcribe::{Transcriber, Transcript, WordTiming};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transcriber stub that records whether it was ever invoked.
struct RecordingTranscriber {
    called: AtomicBool,
}

impl RecordingTranscriber {
    fn new() -> Self {
        Self {
            called: AtomicBool::new(false),
        }
    }

    fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for RecordingTranscriber {
    async fn transcribe(&self, _audio: &Path) -> newsreel::Result<Transcript> {
        self.called.store(true, Ordering::SeqCst);
        Ok(Transcript::default())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn test_config(temp_root: &Path) -> Config {
    Config {
        show_progress: false,
        temp_root: Some(temp_root.to_path_buf()),
        ..Config::default()
    }
}

/// Write one second of 16kHz mono silence.
fn write_silence_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..16_000 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Generate a solid-color test image with ffmpeg.
fn write_test_image(path: &Path) -> bool {
    Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", "color=c=gray:s=64x64", "-frames:v", "1"])
        .arg(path)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn gapless_boundaries(count: usize, step: f64) -> Vec<StorySegment> {
    (0..count)
        .map(|i| StorySegment {
            start: i as f64 * step,
            end: (i + 1) as f64 * step,
            text: format!("story {i}"),
        })
        .collect()
}

#[tokio::test]
async fn mismatched_images_and_boundaries_fail_before_any_external_tool() {
    let transcriber = Arc::new(RecordingTranscriber::new());
    let composer = Composer::new(
        Config {
            show_progress: false,
            ..Config::default()
        },
        transcriber.clone(),
    );

    // Inputs deliberately do not exist: the mismatch check must come first
    let images = vec![PathBuf::from("/nonexistent/a.png")];
    let boundaries = gapless_boundaries(2, 1.0);

    let result = composer
        .compose_multi_story_video(
            Path::new("/nonexistent/audio.mp3"),
            &images,
            &boundaries,
            Path::new("/nonexistent/out.mp4"),
        )
        .await;

    assert!(matches!(result, Err(NewsreelError::InputMismatch(_))));
    assert!(!transcriber.was_called());
}

#[tokio::test]
async fn missing_audio_fails_with_file_not_found() {
    let transcriber = Arc::new(RecordingTranscriber::new());
    let composer = Composer::new(
        Config {
            show_progress: false,
            ..Config::default()
        },
        transcriber,
    );

    let result = composer
        .compose_narrated_video(
            Path::new("/nonexistent/audio.mp3"),
            Path::new("/nonexistent/image.png"),
            Path::new("/nonexistent/out.mp4"),
        )
        .await;

    assert!(matches!(result, Err(NewsreelError::FileNotFound(_))));
}

#[tokio::test]
async fn failed_segment_render_leaves_no_temp_files() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let inputs = tempfile::tempdir().unwrap();
    let workspace_root = tempfile::tempdir().unwrap();

    let audio = inputs.path().join("narration.wav");
    write_silence_wav(&audio);

    // Three decodable images plus one corrupt one at index 2
    let mut images = Vec::new();
    for i in 0..4 {
        let image = inputs.path().join(format!("story_{i}.png"));
        if i == 2 {
            std::fs::write(&image, b"this is not an image").unwrap();
        } else if !write_test_image(&image) {
            eprintln!("Skipping test: could not generate test image");
            return;
        }
        images.push(image);
    }

    let boundaries = gapless_boundaries(4, 0.5);
    let output = inputs.path().join("out.mp4");

    let composer = Composer::new(
        test_config(workspace_root.path()),
        Arc::new(RecordingTranscriber::new()),
    );

    let result = composer
        .compose_multi_story_video(&audio, &images, &boundaries, &output)
        .await;

    assert!(matches!(result, Err(NewsreelError::Render(_))));
    assert!(!output.exists());

    // The run's workspace, and every clip inside it, must be gone
    let leftovers: Vec<_> = std::fs::read_dir(workspace_root.path())
        .unwrap()
        .collect();
    assert!(
        leftovers.is_empty(),
        "temp files left behind: {leftovers:?}"
    );
}

#[test]
fn boundaries_to_caption_track_chain() {
    let words: Vec<WordTiming> = [
        "Markets", "closed", "higher", "today.", "Meanwhile,", "storms", "hit", "the", "coast.",
    ]
    .iter()
    .enumerate()
    .map(|(i, t)| WordTiming::new(i as f64 * 0.5, i as f64 * 0.5 + 0.4, *t).unwrap())
    .collect();

    let segments = detect_boundaries(&words, 2, 6.0).unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].end, 6.0);
    assert_eq!(segments[0].end, segments[1].start);

    let phrases = segment_phrases(&words, 4);
    let track = build_caption_track(&phrases, &CaptionStyle::default());

    assert_eq!(track.matches("Dialogue:").count(), 3);
    assert!(track.contains("Markets closed higher today."));
    assert!(track.contains("Meanwhile, storms hit the"));
    assert!(track.contains("coast."));
}
