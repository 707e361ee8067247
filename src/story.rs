//! Heuristic partitioning of one continuous transcript into story segments.
//!
//! Boundaries come from lexical transition cues when the transcript carries
//! exactly the right number of them, else from equal word-count division.
//! Equal division may split mid-sentence; that is accepted behavior.

use tracing::{debug, info};

use crate::error::{NewsreelError, Result};
use crate::transcribe::WordTiming;

/// Words and phrases that typically introduce the next story in a newscast.
const TRANSITION_MARKERS: &[&str] = &[
    "meanwhile",
    "finally",
    "in other news",
    "additionally",
    "also",
    "furthermore",
];

/// One detected story: a contiguous time range plus its transcript text.
#[derive(Debug, Clone, PartialEq)]
pub struct StorySegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl StorySegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Lowercase a word and strip surrounding punctuation for marker matching.
fn clean_word(word: &str) -> String {
    word.to_lowercase()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}

/// Word indices where a transition marker begins. Multi-word markers match
/// as a window of consecutive cleaned words. Index 0 is never a boundary.
fn marker_indices(words: &[WordTiming]) -> Vec<usize> {
    let cleaned: Vec<String> = words.iter().map(|w| clean_word(&w.text)).collect();
    let mut indices = Vec::new();

    for i in 1..cleaned.len() {
        for marker in TRANSITION_MARKERS {
            let marker_words: Vec<&str> = marker.split_whitespace().collect();
            if i + marker_words.len() > cleaned.len() {
                continue;
            }
            let window_matches = marker_words
                .iter()
                .enumerate()
                .all(|(k, mw)| cleaned[i + k] == *mw);
            if window_matches {
                if !indices.contains(&i) {
                    debug!("Found transition marker '{}' at word {}", words[i].text, i);
                    indices.push(i);
                }
                break;
            }
        }
    }

    indices
}

/// Partition `words` into exactly `story_count` contiguous, gapless segments.
///
/// `total_duration` is the container-probed audio duration; the final
/// segment ends there rather than at the last word's end, so trailing
/// silence is not truncated.
pub fn detect_boundaries(
    words: &[WordTiming],
    story_count: usize,
    total_duration: f64,
) -> Result<Vec<StorySegment>> {
    if words.is_empty() {
        return Err(NewsreelError::Boundary(
            "transcript contains no words".to_string(),
        ));
    }
    if story_count == 0 {
        return Err(NewsreelError::Boundary(
            "story count must be at least 1".to_string(),
        ));
    }
    if words.len() < story_count {
        return Err(NewsreelError::Boundary(format!(
            "transcript has {} words but {} stories were requested",
            words.len(),
            story_count
        )));
    }

    let total_words = words.len();

    let mut boundaries = vec![0];
    boundaries.extend(marker_indices(words));
    boundaries.push(total_words);
    boundaries.sort_unstable();
    boundaries.dedup();

    if boundaries.len() == story_count + 1 {
        info!("Using {} natural story boundaries", story_count);
    } else {
        debug!(
            "Found {} natural boundaries, need {}; using equal division",
            boundaries.len() - 1,
            story_count
        );
        let words_per_story = total_words / story_count;
        boundaries = (0..story_count).map(|i| i * words_per_story).collect();
        boundaries.push(total_words);
    }

    let mut segments: Vec<StorySegment> = Vec::with_capacity(story_count);
    for (i, pair) in boundaries.windows(2).enumerate() {
        let segment_words = &words[pair[0]..pair[1]];

        // Continuity: every segment after the first starts where the
        // previous one ended.
        let start = if i == 0 {
            segment_words[0].start
        } else {
            segments[i - 1].end
        };
        let end = if i == boundaries.len() - 2 {
            total_duration
        } else {
            segment_words[segment_words.len() - 1].end
        };

        let text = segment_words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(
            "Story {}: {:.1}s - {:.1}s ({} words)",
            i + 1,
            start,
            end,
            segment_words.len()
        );

        segments.push(StorySegment { start, end, text });
    }

    Ok(segments)
}
