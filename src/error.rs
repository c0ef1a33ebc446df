use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("No files matched: {0}")]
    NoFilesMatched(String),

    #[error("Invalid input pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
}

impl Error {
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Errors that are reported before any external process starts (exit code 1).
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Toml(_)
                | Error::Usage(_)
                | Error::NoFilesMatched(_)
                | Error::InvalidPattern { .. }
                | Error::InvalidSelection(_)
                | Error::FileNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
