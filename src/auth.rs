use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::AppError;

pub static TOKEN_ENV: &str = "BLOB_READ_WRITE_TOKEN";

/// Read-write token for the blob store. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BlobToken(String);

impl BlobToken {
    pub fn new(token: impl Into<String>) -> Result<Self, AppError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::MissingToken { var: TOKEN_ENV });
        }
        Ok(Self(token))
    }

    pub fn from_env() -> Result<Self, AppError> {
        let token = env::var(TOKEN_ENV).unwrap_or_default();
        Self::new(token)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BlobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlobToken(***)")
    }
}

/// Loads `.env` from the working directory into the process environment.
/// Returns the file that was loaded, or `None` when there is none.
pub fn load_dotenv() -> Result<Option<PathBuf>, AppError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(AppError::DotEnv(e)),
    }
}
