use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsreelError {
    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Boundary detection failed: {0}")]
    Boundary(String),

    #[error("Input mismatch: {0}")]
    InputMismatch(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NewsreelError>;
