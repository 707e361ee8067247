pub mod captions;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod render;
pub mod story;
pub mod transcribe;

pub use config::Config;
pub use error::{NewsreelError, Result};
pub use pipeline::{print_summary, Composer, CompositionResult, CompositionStats};
