use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::config::{Config, ReadErrorPolicy};
use crate::console::Console;
use crate::error::AppError;
use crate::store::{guess_content_type, storage_key, BlobStore, PutOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { file_name: String, url: String },
    Failed { file_name: String, reason: String },
}

impl UploadOutcome {
    pub fn success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }

    pub fn file_name(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { file_name, .. } | UploadOutcome::Failed { file_name, .. } => {
                file_name
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialFailure,
    Fatal,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PartialFailure => 1,
            RunStatus::Fatal => 2,
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Aggregate of one dispatch. `outcomes` is in dispatch order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
    pub read_failures: Vec<PathBuf>,
    pub aborted: bool,
    /// Upload tasks that panicked or were cancelled.
    pub join_failures: usize,
}

impl UploadReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len() + self.join_failures
    }

    pub fn failed(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    pub fn first_failed(&self) -> Option<&str> {
        self.failed().next().map(UploadOutcome::file_name)
    }

    pub fn all_succeeded(&self) -> bool {
        self.join_failures == 0 && self.failed().next().is_none()
    }

    pub fn status(&self) -> RunStatus {
        if self.all_succeeded() && self.read_failures.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        }
    }
}

pub struct Uploader {
    store: Arc<dyn BlobStore>,
    console: Console,
    limiter: Arc<Semaphore>,
    cache_control_max_age: u64,
    on_read_error: ReadErrorPolicy,
}

impl Uploader {
    pub fn new(store: Arc<dyn BlobStore>, config: &Config, console: Console) -> Uploader {
        Self {
            store,
            console,
            limiter: Arc::new(Semaphore::new(config.upload.concurrency)),
            cache_control_max_age: config.blob.cache_control_max_age,
            on_read_error: config.upload.on_read_error,
        }
    }

    pub async fn upload_files(&self, files: &[PathBuf], root: &Path) -> UploadReport {
        let mut report = UploadReport::default();
        let mut uploads: Vec<JoinHandle<UploadOutcome>> = Vec::new();
        self.console.start_progress(files.len() as u64);

        for file in files {
            let file_path = root.join(file);
            let prepared = match storage_key(file) {
                Some(file_name) => self
                    .read_file(&file_path)
                    .await
                    .map(|read| read.map(|(permit, data)| (file_name, permit, data))),
                None => Err(AppError::NonUtf8Path {
                    path: file_path.clone(),
                }),
            };
            let (file_name, permit, data) = match prepared {
                Ok(Some(read)) => read,
                Ok(None) => {
                    self.console
                        .warn(format!("Skipping directory {}", file_path.display()));
                    self.console.inc_progress();
                    continue;
                }
                Err(e) => {
                    self.console.error(format!("Error processing file: {e}"));
                    report.read_failures.push(file.clone());
                    if self.on_read_error == ReadErrorPolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                    self.console.inc_progress();
                    continue;
                }
            };

            let options = PutOptions::public(self.cache_control_max_age)
                .with_content_type(guess_content_type(&file_name));
            let store = Arc::clone(&self.store);
            let console = self.console.clone();
            uploads.push(tokio::spawn(async move {
                let outcome = upload_to_blob(store.as_ref(), &console, file_name, data, &options).await;
                drop(permit);
                console.inc_progress();
                outcome
            }));
        }

        for upload in uploads {
            match upload.await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    self.console.error(format!("Error in parallel uploads: {e}"));
                    report.join_failures += 1;
                }
            }
        }
        self.console.finish_progress();

        self.console.info(format!(
            "{} of {} files dispatched",
            report.attempted(),
            files.len()
        ));
        self.log_summary(&report);
        report
    }

    /// `None` for directories. The permit is taken before the contents are
    /// read so in-flight payloads stay bounded too.
    async fn read_file(
        &self,
        file_path: &Path,
    ) -> Result<Option<(OwnedSemaphorePermit, Vec<u8>)>, AppError> {
        let stat = fs::metadata(file_path)
            .await
            .map_err(|source| AppError::io("stat", file_path, source))?;
        if stat.is_dir() {
            return Ok(None);
        }
        let permit = Arc::clone(&self.limiter)
            .acquire_owned()
            .await
            .map_err(|_| AppError::LimiterClosed)?;
        let data = fs::read(file_path)
            .await
            .map_err(|source| AppError::io("read", file_path, source))?;
        Ok(Some((permit, data)))
    }

    fn log_summary(&self, report: &UploadReport) {
        match summary(report) {
            Ok(line) => self.console.success(line),
            Err(line) => self.console.error(line),
        }
    }
}

/// Final status line: `Ok` when every dispatched upload succeeded.
pub fn summary(report: &UploadReport) -> Result<String, String> {
    if report.join_failures > 0 {
        return Err(format!(
            "Error in parallel uploads: {} upload tasks did not finish",
            report.join_failures
        ));
    }
    match report.first_failed() {
        Some(first) => Err(format!(
            "{} uploads failed : {}",
            report.failed().count(),
            first
        )),
        None => Ok("All uploads completed successfully.".to_string()),
    }
}

/// Puts one file. Store failures are logged and folded into the outcome.
pub async fn upload_to_blob(
    store: &dyn BlobStore,
    console: &Console,
    file_name: String,
    data: Vec<u8>,
    options: &PutOptions,
) -> UploadOutcome {
    match store.put(&file_name, data, options).await {
        Ok(blob) => {
            console.highlight(format!("Uploaded {}", blob.url));
            UploadOutcome::Uploaded {
                file_name,
                url: blob.url,
            }
        }
        Err(e) => {
            console.error(format!("Error uploading {file_name}: {e}"));
            UploadOutcome::Failed {
                file_name,
                reason: e.to_string(),
            }
        }
    }
}
