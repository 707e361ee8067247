pub mod ass;

use crate::transcribe::WordTiming;

pub use ass::{build_caption_track, format_ass_time};

/// A caption-sized group of consecutive words.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Visual style for burned-in captions.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub font: String,
    pub font_size: u32,
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub margin_v: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 60,
            play_res_x: 1024,
            play_res_y: 1024,
            margin_v: 100,
        }
    }
}

/// Group words into fixed-size phrases in original order.
///
/// Each phrase spans from its first word's start to its last word's end; the
/// final phrase may hold fewer than `words_per_phrase` words. Empty input
/// yields an empty sequence.
pub fn segment_phrases(words: &[WordTiming], words_per_phrase: usize) -> Vec<PhraseSegment> {
    assert!(words_per_phrase > 0, "words_per_phrase must be positive");

    words
        .chunks(words_per_phrase)
        .map(|chunk| PhraseSegment {
            start: chunk[0].start,
            end: chunk[chunk.len() - 1].end,
            text: chunk
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}
