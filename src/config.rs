use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::env;

use crate::error::AppError;

static CONFIG_FILE_PATH: &str = "config.yml";
pub static API_URL_ENV: &str = "VERCEL_BLOB_API_URL";

/// One year, in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u64 = 60 * 60 * 24 * 365;
pub const DEFAULT_CONCURRENCY: usize = 8;

/// What the dispatcher does when a file cannot be stat'd or read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BlobConfig {
    pub api_url: Option<String>,
    pub cache_control_max_age: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            cache_control_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub concurrency: usize,
    pub on_read_error: ReadErrorPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./blob"),
            concurrency: DEFAULT_CONCURRENCY,
            on_read_error: ReadErrorPolicy::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub blob: BlobConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Fills `blob.api_url` from the environment when the file left it unset,
    /// then checks the values that serde cannot.
    pub fn resolve(mut self, env_api_url: Option<String>) -> Result<Self, AppError> {
        if self.blob.api_url.is_none() {
            self.blob.api_url = env_api_url.filter(|url| !url.trim().is_empty());
        }
        if self.upload.concurrency == 0 {
            return Err(AppError::InvalidSetting {
                field: "upload.concurrency",
                reason: "must be at least 1",
            });
        }
        Ok(self)
    }
}

pub fn get_config() -> Result<Config, AppError> {
    load_from(Path::new(CONFIG_FILE_PATH))
}

/// Reads `path` if it exists. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config, AppError> {
    let config = if !path.exists() {
        Config::default()
    } else {
        let config_file =
            File::open(path).map_err(|source| AppError::io("open config", path, source))?;
        serde_yaml::from_reader(config_file).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })?
    };
    config.resolve(env::var(API_URL_ENV).ok())
}
