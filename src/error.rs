use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("{provider} request failed: {message}")]
    SourceUnreachable { provider: String, message: String },

    #[error("{provider} returned status {status}")]
    SourceStatus { provider: String, status: u16 },

    #[error("{provider} returned an unexpected response: {message}")]
    SourceMalformed { provider: String, message: String },

    #[error("image could not be decoded: {0}")]
    ImageDecodeFailed(String),

    #[error("image could not be stored: {0}")]
    ImageStorageFailed(String),

    #[error("upload root {path} is not usable: {message}")]
    UploadRoot { path: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("invalid config: {0}")]
    ConfigParse(String),
}

impl ResolveError {
    pub fn unreachable(provider: &str, err: impl ToString) -> Self {
        ResolveError::SourceUnreachable {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn malformed(provider: &str, err: impl ToString) -> Self {
        ResolveError::SourceMalformed {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ResolveError::SourceUnreachable { .. }
                | ResolveError::SourceStatus { .. }
                | ResolveError::SourceMalformed { .. }
                | ResolveError::ImageDecodeFailed(_)
                | ResolveError::ImageStorageFailed(_)
        )
    }
}
