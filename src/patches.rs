use std::io;
use std::path::PathBuf;
use tracing::info;

/// Durable patch artifacts, one `pr-<n>.patch` per pull request
///
/// A newer job for the same PR overwrites the previous artifact.
#[derive(Debug, Clone)]
pub struct PatchStore {
    dir: PathBuf,
}

impl PatchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, pr_number: u64) -> PathBuf {
        self.dir.join(format!("pr-{pr_number}.patch"))
    }

    /// Persist the diff exactly as produced; a trailing newline matters to
    /// `git apply`
    pub async fn write(&self, pr_number: u64, diff: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(pr_number);
        tokio::fs::write(&path, diff).await?;
        info!(patch = %path.display(), bytes = diff.len(), "patch written");
        Ok(path)
    }

    pub async fn read(&self, pr_number: u64) -> io::Result<String> {
        tokio::fs::read_to_string(self.path_for(pr_number)).await
    }
}
