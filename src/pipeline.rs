use crate::captions::{build_caption_track, segment_phrases, CaptionStyle};
use crate::config::Config;
use crate::error::{NewsreelError, Result};
use crate::media;
use crate::render::{self, Effect};
use crate::story::{detect_boundaries, StorySegment};
use crate::transcribe::{sort_words, Transcriber, WordTiming};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Statistics from one composition run.
#[derive(Debug, Clone)]
pub struct CompositionStats {
    /// Total time taken for the entire pipeline.
    pub total_time: Duration,
    /// Time spent in speech-to-text.
    pub transcription_time: Duration,
    /// Time spent in external rendering stages.
    pub render_time: Duration,
    /// Number of transcribed words.
    pub words: usize,
    /// Number of caption phrases burned in.
    pub phrases: usize,
    /// Number of visual segments rendered.
    pub segments: usize,
    /// Probed audio duration in seconds.
    pub audio_duration: f64,
}

/// Result of a successful composition.
#[derive(Debug)]
pub struct CompositionResult {
    pub output_path: PathBuf,
    pub stats: CompositionStats,
}

/// Per-run temporary namespace.
///
/// Every ephemeral artifact of one composition run (normalized audio,
/// segment clips, concat manifest, intermediate muxes, caption file) lives
/// inside one uniquely named directory, so concurrent runs never collide.
/// Dropping the workspace deletes everything, on success and failure alike.
struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    fn create(temp_root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("newsreel-");
        let dir = match temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Run workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Sequences the composition stages and owns every temporary artifact.
///
/// Built from an explicit config plus transcriber; there is no process-wide
/// client state, so callers control the lifecycle of both.
pub struct Composer {
    config: Config,
    transcriber: Arc<dyn Transcriber>,
    style: CaptionStyle,
}

impl Composer {
    pub fn new(config: Config, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            config,
            transcriber,
            style: CaptionStyle::default(),
        }
    }

    /// Override the caption style.
    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    /// Transcribe audio and partition it into `story_count` story segments.
    ///
    /// This is the entry the CLI uses before the multi-story path: the final
    /// segment ends at the container-probed duration so trailing silence
    /// survives into the video.
    pub async fn detect_story_boundaries(
        &self,
        audio: &Path,
        story_count: usize,
    ) -> Result<Vec<StorySegment>> {
        if !audio.exists() {
            return Err(NewsreelError::FileNotFound(audio.display().to_string()));
        }
        media::check_ffmpeg()?;
        media::check_ffprobe()?;

        let workspace = RunWorkspace::create(self.config.temp_root.as_deref())?;
        let words = self.transcribe_words(audio, &workspace).await?;
        let total_duration = media::probe_duration(audio)?;

        if let Some(last) = words.last() {
            debug!(
                "Audio duration: {:.2}s (last word ends at {:.2}s)",
                total_duration, last.end
            );
        }

        detect_boundaries(&words, story_count, total_duration)
    }

    /// Compose a single-image narrated video with burned-in captions.
    ///
    /// One ffmpeg pass loops the image for the probed audio duration with
    /// the default zoom effect, burns the caption track, and muxes the
    /// audio, truncated to the audio duration.
    pub async fn compose_narrated_video(
        &self,
        audio: &Path,
        image: &Path,
        output: &Path,
    ) -> Result<CompositionResult> {
        let start_time = Instant::now();

        for input in [audio, image] {
            if !input.exists() {
                return Err(NewsreelError::FileNotFound(input.display().to_string()));
            }
        }
        media::check_ffmpeg()?;
        media::check_ffprobe()?;

        let workspace = RunWorkspace::create(self.config.temp_root.as_deref())?;

        info!("Stage 1/3: Transcribing {}", audio.display());
        let transcription_start = Instant::now();
        let words = self.transcribe_words(audio, &workspace).await?;
        let transcription_time = transcription_start.elapsed();

        info!("Stage 2/3: Building caption track ({} words)", words.len());
        let phrases = segment_phrases(&words, self.config.words_per_phrase);
        let caption_path = workspace.path("captions.ass");
        std::fs::write(&caption_path, build_caption_track(&phrases, &self.style))?;

        info!("Stage 3/3: Rendering video with captions");
        let render_start = Instant::now();
        let audio_duration = media::probe_duration(audio)?;

        let spinner = self.stage_spinner("Rendering video...");
        let render_result = self.render_captioned_loop(
            audio,
            image,
            &caption_path,
            audio_duration,
            output,
        );
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        if let Err(e) = render_result {
            discard_partial_output(output);
            return Err(e);
        }
        let render_time = render_start.elapsed();

        info!("Composed narrated video: {}", output.display());

        Ok(CompositionResult {
            output_path: output.to_path_buf(),
            stats: CompositionStats {
                total_time: start_time.elapsed(),
                transcription_time,
                render_time,
                words: words.len(),
                phrases: phrases.len(),
                segments: 1,
                audio_duration,
            },
        })
    }

    /// Compose a multi-story video: one effect-animated still per story over
    /// one continuous audio track, captions burned in last.
    pub async fn compose_multi_story_video(
        &self,
        audio: &Path,
        images: &[PathBuf],
        boundaries: &[StorySegment],
        output: &Path,
    ) -> Result<CompositionResult> {
        // Checked before any side effect or external tool
        if images.len() != boundaries.len() {
            return Err(NewsreelError::InputMismatch(format!(
                "{} images for {} story boundaries",
                images.len(),
                boundaries.len()
            )));
        }

        let start_time = Instant::now();

        if !audio.exists() {
            return Err(NewsreelError::FileNotFound(audio.display().to_string()));
        }
        for image in images {
            if !image.exists() {
                return Err(NewsreelError::FileNotFound(image.display().to_string()));
            }
        }
        media::check_ffmpeg()?;
        media::check_ffprobe()?;

        let workspace = RunWorkspace::create(self.config.temp_root.as_deref())?;

        info!("Stage 1/4: Rendering {} visual segments", images.len());
        let render_start = Instant::now();
        let clips = self
            .render_segments(images, boundaries, &workspace)
            .await?;

        info!("Stage 2/4: Concatenating segments");
        let silent_path = workspace.path("video_silent.mp4");
        concat_clips(&clips, &workspace, &silent_path)?;

        info!("Stage 3/4: Muxing continuous audio track");
        let audio_duration = media::probe_duration(audio)?;
        debug!("Audio duration: {:.2}s", audio_duration);
        let muxed_path = workspace.path("video_muxed.mp4");
        mux_audio(&silent_path, audio, audio_duration, &muxed_path)?;
        let render_time = render_start.elapsed();

        info!("Stage 4/4: Burning in word-level captions");
        let transcription_start = Instant::now();
        let words = self.transcribe_words(audio, &workspace).await?;
        let transcription_time = transcription_start.elapsed();

        let phrases = segment_phrases(&words, self.config.words_per_phrase);
        let caption_path = workspace.path("captions.ass");
        std::fs::write(&caption_path, build_caption_track(&phrases, &self.style))?;

        let spinner = self.stage_spinner("Burning in captions...");
        let burn_result = burn_captions(&muxed_path, &caption_path, output);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        if let Err(e) = burn_result {
            discard_partial_output(output);
            return Err(e);
        }

        info!("Composed multi-story video: {}", output.display());

        Ok(CompositionResult {
            output_path: output.to_path_buf(),
            stats: CompositionStats {
                total_time: start_time.elapsed(),
                transcription_time,
                render_time,
                words: words.len(),
                phrases: phrases.len(),
                segments: boundaries.len(),
                audio_duration,
            },
        })
    }

    /// Normalize audio into the workspace and run speech-to-text on it.
    async fn transcribe_words(
        &self,
        audio: &Path,
        workspace: &RunWorkspace,
    ) -> Result<Vec<WordTiming>> {
        let normalized = workspace.path("audio_16k.wav");
        media::extract_audio_wav(audio, &normalized)?;

        let spinner = self.stage_spinner(&format!(
            "Transcribing with {}...",
            self.transcriber.name()
        ));
        let result = self.transcriber.transcribe(&normalized).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let mut words = result?.words;
        // The model should already emit words in order; do not depend on it
        sort_words(&mut words);
        Ok(words)
    }

    /// Render one silent clip per (image, boundary) pair, effects assigned
    /// round-robin. Renders run concurrently up to the configured limit and
    /// are all joined before concatenation; any failure aborts the run and
    /// the workspace drop removes every clip rendered so far.
    async fn render_segments(
        &self,
        images: &[PathBuf],
        boundaries: &[StorySegment],
        workspace: &RunWorkspace,
    ) -> Result<Vec<PathBuf>> {
        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(images.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} segments")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.config.render_concurrency));
        let mut futures = FuturesUnordered::new();

        for (i, (image, boundary)) in images.iter().zip(boundaries).enumerate() {
            let effect = Effect::ROTATION[i % Effect::ROTATION.len()];
            let clip = workspace.path(&format!("segment_{i:03}.mp4"));
            let image = image.clone();
            let duration = boundary.duration();
            let fps = self.config.fps;
            let sem = semaphore.clone();
            let pb = progress.clone();

            debug!(
                "Segment {}/{}: {:.2}s with {}",
                i + 1,
                images.len(),
                duration,
                effect
            );

            futures.push(async move {
                let _permit = sem.acquire().await.expect("Semaphore closed");
                let clip_path = clip.clone();
                let result = tokio::task::spawn_blocking(move || {
                    render::render_segment(&image, duration, effect, &clip, fps)
                })
                .await
                .map_err(|e| NewsreelError::Render(format!("Render task failed: {e}")))?;
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                result.map(|()| (i, clip_path))
            });
        }

        let mut clips: Vec<(usize, PathBuf)> = Vec::with_capacity(images.len());
        let mut first_error = None;
        while let Some(result) = futures.next().await {
            match result {
                Ok(entry) => clips.push(entry),
                Err(e) => {
                    warn!("Segment render failed: {}", e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        // Concat order is boundary order, not completion order
        clips.sort_by_key(|(i, _)| *i);
        Ok(clips.into_iter().map(|(_, path)| path).collect())
    }

    /// Single ffmpeg pass: loop the image with the default zoom, burn the
    /// caption track, mux the audio, truncate to the audio duration.
    fn render_captioned_loop(
        &self,
        audio: &Path,
        image: &Path,
        captions: &Path,
        audio_duration: f64,
        output: &Path,
    ) -> Result<()> {
        let fps = self.config.fps;
        let frames = render::frame_count(audio_duration, fps);
        let filter = format!(
            "{};[v]ass={}[vout]",
            Effect::default().filter_chain(frames, fps),
            captions.display()
        );
        let duration_arg = format!("{audio_duration:.3}");

        media::run_ffmpeg([
            "-loop".as_ref(),
            "1".as_ref(),
            "-i".as_ref(),
            image.as_os_str(),
            "-i".as_ref(),
            audio.as_os_str(),
            "-filter_complex".as_ref(),
            filter.as_ref(),
            "-map".as_ref(),
            "[vout]".as_ref(),
            "-map".as_ref(),
            "1:a".as_ref(),
            "-c:v".as_ref(),
            "libx264".as_ref(),
            "-preset".as_ref(),
            "medium".as_ref(),
            "-c:a".as_ref(),
            "aac".as_ref(),
            "-b:a".as_ref(),
            "192k".as_ref(),
            "-pix_fmt".as_ref(),
            "yuv420p".as_ref(),
            "-t".as_ref(),
            duration_arg.as_ref(),
            output.as_os_str(),
        ])
    }

    fn stage_spinner(&self, msg: &str) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Stream-copy concat of already-rendered clips via a manifest file.
fn concat_clips(clips: &[PathBuf], workspace: &RunWorkspace, output: &Path) -> Result<()> {
    let manifest_path = workspace.path("concat.txt");
    let mut manifest = String::new();
    for clip in clips {
        manifest.push_str(&format!("file '{}'\n", clip.display()));
    }
    std::fs::write(&manifest_path, manifest)?;

    media::run_ffmpeg([
        "-f".as_ref(),
        "concat".as_ref(),
        "-safe".as_ref(),
        "0".as_ref(),
        "-i".as_ref(),
        manifest_path.as_os_str(),
        "-c".as_ref(),
        "copy".as_ref(),
        output.as_os_str(),
    ])
}

/// Mux the continuous audio under the concatenated video: video stream is
/// copied, audio re-encoded, output truncated to the probed audio duration.
fn mux_audio(video: &Path, audio: &Path, audio_duration: f64, output: &Path) -> Result<()> {
    let duration_arg = format!("{audio_duration:.3}");
    media::run_ffmpeg([
        "-i".as_ref(),
        video.as_os_str(),
        "-i".as_ref(),
        audio.as_os_str(),
        "-c:v".as_ref(),
        "copy".as_ref(),
        "-c:a".as_ref(),
        "aac".as_ref(),
        "-b:a".as_ref(),
        "192k".as_ref(),
        "-t".as_ref(),
        duration_arg.as_ref(),
        output.as_os_str(),
    ])
}

/// Burn the caption track into video pixels; audio is copied through.
fn burn_captions(video: &Path, captions: &Path, output: &Path) -> Result<()> {
    let filter = format!("ass={}", captions.display());
    media::run_ffmpeg([
        "-i".as_ref(),
        video.as_os_str(),
        "-vf".as_ref(),
        filter.as_ref(),
        "-c:v".as_ref(),
        "libx264".as_ref(),
        "-preset".as_ref(),
        "medium".as_ref(),
        "-c:a".as_ref(),
        "copy".as_ref(),
        "-pix_fmt".as_ref(),
        "yuv420p".as_ref(),
        output.as_os_str(),
    ])
}

/// A failed run must leave no output file behind.
fn discard_partial_output(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!("Failed to remove partial output {}: {}", output.display(), e);
        }
    }
}

/// Print a summary of the composition results.
pub fn print_summary(result: &CompositionResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Composition Complete                      ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Audio:      {:.1}s", result.stats.audio_duration);
    println!("  Segments:   {}", result.stats.segments);
    println!(
        "  Captions:   {} phrases from {} words",
        result.stats.phrases, result.stats.words
    );
    println!();
    println!("  Timing:");
    println!(
        "    Transcribe:  {:.2}s",
        result.stats.transcription_time.as_secs_f64()
    );
    println!(
        "    Render:      {:.2}s",
        result.stats.render_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_paths_are_namespaced() {
        let a = RunWorkspace::create(None).unwrap();
        let b = RunWorkspace::create(None).unwrap();
        assert_ne!(a.path("captions.ass"), b.path("captions.ass"));
        assert!(a
            .dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("newsreel-"));
    }

    #[test]
    fn test_workspace_cleans_up_on_drop() {
        let workspace = RunWorkspace::create(None).unwrap();
        let marker = workspace.path("segment_000.mp4");
        std::fs::write(&marker, b"clip").unwrap();
        let root = workspace.dir.path().to_path_buf();
        assert!(marker.exists());

        drop(workspace);
        assert!(!marker.exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_composition_stats_fields() {
        let stats = CompositionStats {
            total_time: Duration::from_secs(30),
            transcription_time: Duration::from_secs(10),
            render_time: Duration::from_secs(15),
            words: 120,
            phrases: 30,
            segments: 3,
            audio_duration: 45.0,
        };
        assert_eq!(stats.phrases, 30);
        assert_eq!(stats.segments, 3);
    }
}
