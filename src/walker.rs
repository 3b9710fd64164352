use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs;

use crate::error::AppError;

type WalkFuture = Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, AppError>> + Send>>;

/// Every non-directory entry under `root`, relative to `root`, depth first in
/// listing order. Symlinks are followed when deciding whether an entry is a
/// directory.
pub async fn get_file_path_list(root: &Path) -> Result<Vec<PathBuf>, AppError> {
    walk(root.to_path_buf(), PathBuf::new()).await
}

fn walk(dir: PathBuf, prefix: PathBuf) -> WalkFuture {
    Box::pin(async move {
        let mut results = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|source| AppError::io("list directory", &dir, source))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| AppError::io("list directory", &dir, source))?
        {
            let file_path = entry.path();
            let relative = prefix.join(entry.file_name());
            let stat = fs::metadata(&file_path)
                .await
                .map_err(|source| AppError::io("stat", &file_path, source))?;

            if stat.is_dir() {
                results.extend(walk(file_path, relative).await?);
            } else {
                results.push(relative);
            }
        }

        Ok(results)
    })
}
