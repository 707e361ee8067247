use crate::error::{NewsreelError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whisper model size used for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// Filename of the ggml model artifact on the Hugging Face hub.
    pub fn filename(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::Large => "ggml-large-v3.bin",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(format!(
                "Unknown model size: {}. Use 'tiny', 'base', 'small', 'medium', or 'large'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whisper model size for transcription.
    pub model: ModelSize,
    /// Source language code passed to the speech model.
    pub language: String,
    /// Number of words grouped into one caption phrase.
    pub words_per_phrase: usize,
    /// Frame rate of rendered video.
    pub fps: u32,
    /// Maximum segment renders running at the same time.
    pub render_concurrency: usize,
    /// Show progress bars.
    pub show_progress: bool,
    /// Root directory for per-run temp workspaces (system temp when unset).
    pub temp_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelSize::default(),
            language: "en".to_string(),
            words_per_phrase: 4,
            fps: 25,
            render_concurrency: 2,
            show_progress: true,
            temp_root: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(model) = std::env::var("NEWSREEL_MODEL") {
            if let Ok(m) = model.parse() {
                config.model = m;
            }
        }
        if let Ok(language) = std::env::var("NEWSREEL_LANGUAGE") {
            config.language = language;
        }
        if let Ok(fps) = std::env::var("NEWSREEL_FPS") {
            if let Ok(f) = fps.parse() {
                config.fps = f;
            }
        }
        if let Ok(concurrency) = std::env::var("NEWSREEL_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.render_concurrency = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.words_per_phrase == 0 {
            return Err(NewsreelError::Config(
                "words_per_phrase must be greater than 0".to_string(),
            ));
        }
        if self.fps == 0 {
            return Err(NewsreelError::Config(
                "fps must be greater than 0".to_string(),
            ));
        }
        if self.render_concurrency == 0 {
            return Err(NewsreelError::Config(
                "render_concurrency must be greater than 0".to_string(),
            ));
        }
        if let Some(ref root) = self.temp_root {
            if !root.is_dir() {
                return Err(NewsreelError::Config(format!(
                    "temp_root is not a directory: {}",
                    root.display()
                )));
            }
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("newsreel").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("base".parse::<ModelSize>().unwrap(), ModelSize::Base);
        assert_eq!("TINY".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("Large".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("huge".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_model_filename() {
        assert_eq!(ModelSize::Tiny.filename(), "ggml-tiny.bin");
        assert_eq!(ModelSize::Base.filename(), "ggml-base.bin");
        assert_eq!(ModelSize::Large.filename(), "ggml-large-v3.bin");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, ModelSize::Base);
        assert_eq!(config.words_per_phrase, 4);
        assert_eq!(config.fps, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            words_per_phrase: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            fps: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            render_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
