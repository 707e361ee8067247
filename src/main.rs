use anyhow::{Context, Result};
use clap::Parser;
use newsreel::config::{Config, ModelSize};
use newsreel::pipeline::{print_summary, Composer};
use newsreel::transcribe::WhisperTranscriber;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "newsreel")]
#[command(version, about = "Compose narrated videos with word-accurate captions")]
#[command(
    long_about = "Turn a voice recording and one or more still images into a finished video \
with synchronized burned-in captions. With multiple images, story boundaries are detected \
from the narration and each story gets its own Ken Burns style visual effect."
)]
struct Cli {
    /// Input audio file (the narration)
    audio: PathBuf,

    /// Still image; repeat for one image per story
    #[arg(short, long = "image", required = true)]
    images: Vec<PathBuf>,

    /// Output video file (defaults to the audio name with .mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of stories to detect (defaults to the image count)
    #[arg(short, long)]
    stories: Option<usize>,

    /// Whisper model size: tiny, base, small, medium, large
    #[arg(short, long)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(audio: &Path) -> PathBuf {
    let stem = audio.file_stem().unwrap_or_default();
    let mut output = audio.to_path_buf();
    output.set_file_name(format!("{}.mp4", stem.to_string_lossy()));
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.audio.exists() {
        anyhow::bail!("Audio file not found: {}", cli.audio.display());
    }
    for image in &cli.images {
        if !image.exists() {
            anyhow::bail!("Image file not found: {}", image.display());
        }
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(ref model) = cli.model {
        config.model = model
            .parse::<ModelSize>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    config.validate().context("Configuration validation failed")?;

    let stories = cli.stories.unwrap_or(cli.images.len());
    if stories == 0 {
        anyhow::bail!("Story count must be at least 1");
    }
    if stories != cli.images.len() {
        anyhow::bail!(
            "Need one image per story: {} stories but {} images",
            stories,
            cli.images.len()
        );
    }

    let output = cli
        .output
        .unwrap_or_else(|| derive_output_path(&cli.audio));

    info!("Audio:   {}", cli.audio.display());
    info!("Images:  {}", cli.images.len());
    info!("Output:  {}", output.display());
    info!("Model:   {}", config.model);

    let transcriber = Arc::new(WhisperTranscriber::new(
        config.model,
        config.language.clone(),
    ));
    let composer = Composer::new(config, transcriber);

    let result = if stories == 1 {
        composer
            .compose_narrated_video(&cli.audio, &cli.images[0], &output)
            .await?
    } else {
        let boundaries = composer
            .detect_story_boundaries(&cli.audio, stories)
            .await?;
        composer
            .compose_multi_story_video(&cli.audio, &cli.images, &boundaries, &output)
            .await?
    };

    print_summary(&result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        let audio = PathBuf::from("/path/to/story.mp3");
        assert_eq!(derive_output_path(&audio), PathBuf::from("/path/to/story.mp4"));
    }
}
