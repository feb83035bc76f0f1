use crate::script::Violation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Script failed validation with {} violation(s): {}", .0.len(), join_violations(.0))]
    InvalidScript(Vec<Violation>),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Speech synthesis error: {0}")]
    Tts(String),

    #[error("Environment variable error: {0}")]
    Env(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ReelError>;
