use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use archiver_core::{plan_batches, SyncEvent, DEFAULT_BATCH_SIZE};
use async_trait::async_trait;
use engine_logging::{engine_info, engine_warn};
use thiserror::Error;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::progress::{Journal, ProgressSink};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to execute 'git {command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
    #[error("failed to enumerate archive files: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Version-control sink the archive is published into.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn pull(&self) -> Result<(), PublishError>;
    async fn stage(&self, path: &Path) -> Result<(), PublishError>;
    async fn commit(&self, message: &str) -> Result<(), PublishError>;
    async fn push(&self) -> Result<(), PublishError>;
}

/// Runs the `git` executable inside a working copy.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn run(&self, args: &[&OsStr]) -> Result<(), PublishError> {
        let command = args
            .first()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|source| PublishError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(PublishError::Command {
                command,
                stderr: detail,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for GitCli {
    async fn pull(&self) -> Result<(), PublishError> {
        self.run(&[OsStr::new("pull")]).await
    }

    async fn stage(&self, path: &Path) -> Result<(), PublishError> {
        self.run(&[OsStr::new("add"), OsStr::new("--"), path.as_os_str()])
            .await
    }

    async fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.run(&[OsStr::new("commit"), OsStr::new("-m"), OsStr::new(message)])
            .await
    }

    async fn push(&self) -> Result<(), PublishError> {
        self.run(&[OsStr::new("push")]).await
    }
}

/// Every regular file under `dir`, sorted by path. `.git` directories are
/// not descended into.
pub fn archive_files(dir: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Pushes the archive in batches so that a single commit never carries the
/// whole archive.
pub struct Publisher<'a> {
    repository: &'a dyn Repository,
    sink: &'a dyn ProgressSink,
    batch_size: usize,
}

impl<'a> Publisher<'a> {
    pub fn new(repository: &'a dyn Repository, sink: &'a dyn ProgressSink) -> Self {
        Self {
            repository,
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Stages, commits and pushes every file under `archive_dir`. Git
    /// failures are logged and the next batch is attempted.
    pub async fn publish(
        &self,
        archive_dir: &Path,
        message: &str,
    ) -> Result<Vec<SyncEvent>, PublishError> {
        let files = archive_files(archive_dir)?;
        let batches = plan_batches(&files, self.batch_size);
        engine_info!(
            "Publishing {} files in {} batches",
            files.len(),
            batches.len()
        );

        let mut journal = Journal::new(self.sink);
        for batch in &batches {
            for file in batch.files {
                if let Err(err) = self.repository.stage(file).await {
                    engine_warn!("Failed to stage {}: {}", file.display(), err);
                }
            }

            let commit_message = batch.commit_message(message);
            let pushed = match self.repository.commit(&commit_message).await {
                Ok(()) => match self.repository.push().await {
                    Ok(()) => true,
                    Err(err) => {
                        engine_warn!("Push of batch {} failed: {}", batch.number, err);
                        false
                    }
                },
                Err(err) => {
                    engine_warn!("Commit of batch {} failed: {}", batch.number, err);
                    false
                }
            };

            journal.record(SyncEvent::BatchPublished {
                number: batch.number,
                total: batch.total,
                files: batch.files.len(),
                pushed,
            });
        }
        Ok(journal.into_events())
    }
}
