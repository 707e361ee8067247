//! Thin wrappers around the ffmpeg/ffprobe command-line tools.
//!
//! Every invocation is blocking and awaited to completion; non-zero exits
//! surface the tool's captured stderr so failures are never silent.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{NewsreelError, Result};

/// How much of ffmpeg's stderr to keep in error messages.
const STDERR_TAIL_BYTES: usize = 800;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        NewsreelError::Render(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(NewsreelError::Render("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            NewsreelError::Probe(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(NewsreelError::Probe("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Probe a media file's container duration in seconds, without decoding it.
pub fn probe_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| NewsreelError::Probe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NewsreelError::Probe(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str.trim().parse().map_err(|e| {
        NewsreelError::Probe(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(duration)
}

/// Run ffmpeg with the given arguments, capturing output.
///
/// On a non-zero exit the tail of stderr is attached to the error so the
/// underlying diagnostic is preserved for the caller.
pub fn run_ffmpeg<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(args)
        .output()
        .map_err(|e| NewsreelError::Render(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NewsreelError::Render(format!(
            "FFmpeg exited with {}: {}",
            output.status,
            stderr_tail(&stderr)
        )));
    }

    Ok(())
}

/// Extract/normalize audio to mono 16-bit PCM WAV at 16kHz, which is what
/// the speech model expects.
pub fn extract_audio_wav(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(NewsreelError::FileNotFound(input.display().to_string()));
    }

    info!("Normalizing audio from {}", input.display());

    run_ffmpeg([
        "-i".as_ref(),
        input.as_os_str(),
        "-vn".as_ref(),
        "-acodec".as_ref(),
        "pcm_s16le".as_ref(),
        "-ar".as_ref(),
        "16000".as_ref(),
        "-ac".as_ref(),
        "1".as_ref(),
        output.as_os_str(),
    ])?;

    if !output.exists() {
        return Err(NewsreelError::Render(
            "Normalized audio file was not created".to_string(),
        ));
    }

    Ok(())
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_string();
    }
    let start = trimmed.len() - STDERR_TAIL_BYTES;
    // Avoid splitting a UTF-8 code point
    let start = (start..trimmed.len())
        .find(|&i| trimmed.is_char_boundary(i))
        .unwrap_or(start);
    format!("...{}", &trimmed[start..])
}

#[cfg(test)]
pub(crate) fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ffmpeg() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        assert!(check_ffmpeg().is_ok());
    }

    #[test]
    fn test_probe_duration_missing_file() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let result = probe_duration(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(NewsreelError::Probe(_))));
    }

    #[test]
    fn test_run_ffmpeg_failure_captures_stderr() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let result = run_ffmpeg(["-i", "/nonexistent/input.mp4", "/tmp/newsreel-test-out.mp4"]);
        match result {
            Err(NewsreelError::Render(msg)) => {
                assert!(msg.contains("FFmpeg exited with"));
            }
            other => panic!("Expected Render error, got {other:?}"),
        }
    }

    #[test]
    fn test_stderr_tail_short_input() {
        assert_eq!(stderr_tail("error text\n"), "error text");
    }

    #[test]
    fn test_stderr_tail_truncates_long_input() {
        let long = "x".repeat(2000);
        let tail = stderr_tail(&long);
        assert!(tail.starts_with("..."));
        assert_eq!(tail.len(), STDERR_TAIL_BYTES + 3);
    }
}
