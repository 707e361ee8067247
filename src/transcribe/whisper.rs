//! In-process speech-to-text using whisper.cpp via whisper-rs.
//!
//! The ggml model artifact is fetched from the Hugging Face hub on first use
//! and cached by the hub client, so repeated runs are offline. Audio must be
//! 16kHz mono WAV; the pipeline normalizes inputs before calling in here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hf_hub::api::sync::Api;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{sort_words, Transcriber, Transcript, WordTiming};
use crate::config::ModelSize;
use crate::error::{NewsreelError, Result};

/// Hugging Face repository hosting the whisper.cpp ggml models.
const MODEL_REPO: &str = "ggerganov/whisper.cpp";

/// Duration assigned when the model reports a zero-length token span.
const MIN_WORD_SECS: f64 = 0.01;

pub struct WhisperTranscriber {
    model: ModelSize,
    language: String,
    context: OnceCell<Arc<WhisperContext>>,
}

impl WhisperTranscriber {
    pub fn new(model: ModelSize, language: impl Into<String>) -> Self {
        Self {
            model,
            language: language.into(),
            context: OnceCell::new(),
        }
    }

    /// Resolve the model artifact, downloading into the hub cache on first
    /// use. Idempotent: subsequent calls hit the cache.
    fn fetch_model(model: ModelSize) -> Result<PathBuf> {
        let api = Api::new().map_err(|e| {
            NewsreelError::Transcription(format!("Failed to reach model hub: {e}"))
        })?;
        api.model(MODEL_REPO.to_string())
            .get(model.filename())
            .map_err(|e| {
                NewsreelError::Transcription(format!(
                    "Failed to fetch model {}: {e}",
                    model.filename()
                ))
            })
    }

    fn load_context(model: ModelSize) -> Result<Arc<WhisperContext>> {
        let model_path = Self::fetch_model(model)?;
        info!(
            "Loading whisper model '{}' from {}",
            model,
            model_path.display()
        );
        let path_str = model_path.to_str().ok_or_else(|| {
            NewsreelError::Transcription("Model path is not valid UTF-8".to_string())
        })?;
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| NewsreelError::Transcription(format!("Failed to load model: {e}")))?;
        Ok(Arc::new(ctx))
    }

    /// Lazily load the model once per transcriber instance.
    async fn context(&self) -> Result<Arc<WhisperContext>> {
        let model = self.model;
        self.context
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || Self::load_context(model))
                    .await
                    .map_err(|e| {
                        NewsreelError::Transcription(format!("Model load task failed: {e}"))
                    })?
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        if !audio.exists() {
            return Err(NewsreelError::FileNotFound(audio.display().to_string()));
        }

        let ctx = self.context().await?;
        let language = self.language.clone();
        let audio = audio.to_path_buf();

        let words = tokio::task::spawn_blocking(move || {
            let samples = load_samples(&audio)?;
            debug!("Loaded {} samples from {}", samples.len(), audio.display());
            run_inference(&ctx, &samples, &language)
        })
        .await
        .map_err(|e| NewsreelError::Transcription(format!("Inference task failed: {e}")))??;

        info!("Transcribed {} words", words.len());

        Ok(Transcript {
            words,
            language: Some(self.language.clone()),
        })
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}

/// Load 16kHz mono 16-bit PCM samples normalized to [-1.0, 1.0].
fn load_samples(path: &Path) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| NewsreelError::Transcription(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    if spec.sample_rate != 16_000 || spec.channels != 1 {
        return Err(NewsreelError::Transcription(format!(
            "Expected 16kHz mono audio, got {}Hz with {} channel(s)",
            spec.sample_rate, spec.channels
        )));
    }
    if spec.bits_per_sample != 16 {
        return Err(NewsreelError::Transcription(format!(
            "Expected 16-bit samples, got {}-bit",
            spec.bits_per_sample
        )));
    }

    Ok(reader
        .into_samples::<i16>()
        .filter_map(std::result::Result::ok)
        .map(|s| s as f32 / 32768.0)
        .collect())
}

fn run_inference(ctx: &WhisperContext, samples: &[f32], language: &str) -> Result<Vec<WordTiming>> {
    let mut state = ctx
        .create_state()
        .map_err(|e| NewsreelError::Transcription(format!("Failed to create state: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_token_timestamps(true);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    state
        .full(params, samples)
        .map_err(|e| NewsreelError::Transcription(format!("Inference failed: {e}")))?;

    let num_segments = state
        .full_n_segments()
        .map_err(|e| NewsreelError::Transcription(format!("Failed to read segments: {e}")))?;

    let mut tokens = Vec::new();
    for seg in 0..num_segments {
        let num_tokens = state
            .full_n_tokens(seg)
            .map_err(|e| NewsreelError::Transcription(format!("Failed to read tokens: {e}")))?;
        for tok in 0..num_tokens {
            let text = state.full_get_token_text(seg, tok).map_err(|e| {
                NewsreelError::Transcription(format!("Failed to read token text: {e}"))
            })?;
            // Control tokens like [_BEG_] carry no speech
            if text.starts_with("[_") {
                continue;
            }
            let data = state.full_get_token_data(seg, tok).map_err(|e| {
                NewsreelError::Transcription(format!("Failed to read token timing: {e}"))
            })?;
            tokens.push(TokenSpan {
                text,
                // Token timestamps are in centiseconds
                start: data.t0 as f64 / 100.0,
                end: data.t1 as f64 / 100.0,
            });
        }
    }

    merge_tokens_into_words(&tokens)
}

#[derive(Debug, Clone)]
struct TokenSpan {
    text: String,
    start: f64,
    end: f64,
}

/// Whisper emits sub-word tokens; a leading space marks the start of a new
/// word, and punctuation tokens attach to the preceding word.
fn merge_tokens_into_words(tokens: &[TokenSpan]) -> Result<Vec<WordTiming>> {
    let mut words = Vec::new();
    let mut current: Option<(f64, f64, String)> = None;

    for tok in tokens {
        if tok.text.starts_with(' ') || current.is_none() {
            if let Some(word) = current.take() {
                push_word(&mut words, word)?;
            }
            current = Some((tok.start, tok.end, tok.text.trim_start().to_string()));
        } else if let Some(cur) = current.as_mut() {
            cur.1 = cur.1.max(tok.end);
            cur.2.push_str(&tok.text);
        }
    }
    if let Some(word) = current.take() {
        push_word(&mut words, word)?;
    }

    sort_words(&mut words);
    Ok(words)
}

fn push_word(words: &mut Vec<WordTiming>, (start, end, text): (f64, f64, String)) -> Result<()> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Ok(());
    }
    let start = start.max(0.0);
    let end = if end > start { end } else { start + MIN_WORD_SECS };
    words.push(WordTiming::new(start, end, text)?);
    Ok(())
}
