pub mod whisper;

use crate::error::{NewsreelError, Result};
use async_trait::async_trait;
use std::path::Path;

pub use whisper::WhisperTranscriber;

/// One transcribed word with its start/end timestamps in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct WordTiming {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl WordTiming {
    /// Build a word timing, enforcing non-negative times and `end > start`.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(NewsreelError::InvalidTiming(format!(
                "word times must be finite and non-negative, got {start}..{end}"
            )));
        }
        if end <= start {
            return Err(NewsreelError::InvalidTiming(format!(
                "word end must be after start, got {start}..{end}"
            )));
        }
        Ok(Self {
            start,
            end,
            text: text.into(),
        })
    }
}

/// A full word-level transcript of one audio file.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub words: Vec<WordTiming>,
    pub language: Option<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// The speech-to-text seam. Implementations must return words sorted by
/// start time ascending.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}

/// Sort words by start time. The model is expected to emit them in order
/// already, but the pipeline must not depend on that.
pub fn sort_words(words: &mut [WordTiming]) {
    words.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_timing_valid() {
        let w = WordTiming::new(1.0, 1.5, "hello").unwrap();
        assert_eq!(w.start, 1.0);
        assert_eq!(w.end, 1.5);
        assert_eq!(w.text, "hello");
    }

    #[test]
    fn test_word_timing_rejects_inverted_range() {
        assert!(matches!(
            WordTiming::new(2.0, 1.0, "x"),
            Err(NewsreelError::InvalidTiming(_))
        ));
        assert!(matches!(
            WordTiming::new(1.0, 1.0, "x"),
            Err(NewsreelError::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_word_timing_rejects_negative_and_nan() {
        assert!(WordTiming::new(-0.5, 1.0, "x").is_err());
        assert!(WordTiming::new(f64::NAN, 1.0, "x").is_err());
        assert!(WordTiming::new(0.0, f64::INFINITY, "x").is_err());
    }

    #[test]
    fn test_sort_words() {
        let mut words = vec![
            WordTiming::new(2.0, 2.5, "b").unwrap(),
            WordTiming::new(0.0, 0.5, "a").unwrap(),
            WordTiming::new(1.0, 1.5, "c").unwrap(),
        ];
        sort_words(&mut words);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "b"]);
    }
}
