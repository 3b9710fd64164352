use std::io;
use std::path::{Path, PathBuf};

use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },
    #[error("failed to load .env: {0}")]
    DotEnv(#[source] dotenvy::Error),
    #[error("environment variable {var} is not set")]
    MissingToken { var: &'static str },
    #[error("upload limiter closed")]
    LimiterClosed,
    #[error("file name is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        AppError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid blob api url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("blob store responded {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected blob store response: {0}")]
    Decode(#[source] serde_json::Error),
}
