//! Append-only transcript file
//!
//! Written only by the broadcast hub, read in full once per joining session.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Flat log of every rendered event line
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: File,
}

impl Transcript {
    /// Create the transcript at `path`, discarding any previous content
    ///
    /// Missing parent directories are created.
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        debug!("Transcript created at {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline and flush it to the file
    pub async fn append(&mut self, line: &str) -> std::io::Result<()> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        self.file.write_all(record.as_bytes()).await?;
        self.file.flush().await
    }

    /// Full current content
    pub async fn read_all(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.path).await
    }
}

#[cfg(test)]
pub(crate) fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("tcp_chat_{}_{}", tag, uuid::Uuid::new_v4()))
        .join("data.txt")
}
