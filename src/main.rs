mod auth;
mod config;
mod console;
mod error;
mod request;
mod store;
mod uploader;
mod walker;

use std::process::ExitCode;
use std::sync::Arc;

use auth::BlobToken;
use console::Console;
use error::AppError;
use request::BlobClient;
use uploader::{RunStatus, UploadReport, Uploader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let console = Console::new();
    match run(&console).await {
        Ok(report) => {
            console.success("Done");
            report.status().into()
        }
        Err(e) => {
            console.error(e.to_string());
            RunStatus::Fatal.into()
        }
    }
}

async fn run(console: &Console) -> Result<UploadReport, AppError> {
    if let Some(path) = auth::load_dotenv()? {
        console.info(format!("Loaded environment from {}", path.display()));
    }
    let cfg = config::get_config()?;
    let token = BlobToken::from_env()?;
    let store = BlobClient::new(&token, cfg.blob.api_url.as_deref())?;

    let root = &cfg.upload.root;
    console.info(format!("Scanning {}", root.display()));
    let files = walker::get_file_path_list(root).await?;
    console.info(format!("Found {} files", files.len()));

    let uploader = Uploader::new(Arc::new(store), &cfg, console.clone());
    Ok(uploader.upload_files(&files, root).await)
}
