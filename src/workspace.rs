//! The single shared local checkout every job runs in
//!
//! Only one process may own a data directory at a time (guarded by a lock
//! file), and within the process only the worker touches it. Every job runs
//! inside [`Workspace::scoped`], which resets the workspace before the job
//! starts and again afterwards no matter how the job ended.

use crate::config::{RetrievalMode, StyleGuardConfig};
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::external::{CommandExecutor, GitClient};
use crate::patches::PatchStore;
use fd_lock::{RwLock, RwLockWriteGuard};
use futures::FutureExt;
use std::fs::File;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where everything lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub data_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub styler_dir: PathBuf,
    pub patches_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn from_config(config: &StyleGuardConfig) -> Self {
        Self {
            data_dir: config.data_dir(),
            repo_dir: config.repo_dir(),
            styler_dir: config.styler_dir(),
            patches_dir: config.patches_dir(),
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join("workspace.lock")
    }
}

pub struct Workspace {
    layout: WorkspaceLayout,
    mode: RetrievalMode,
    idle_branch: String,
    git: GitClient,
    patches: PatchStore,
    _lock_guard: Option<RwLockWriteGuard<'static, File>>,
}

impl Workspace {
    pub fn open(
        config: &StyleGuardConfig,
        executor: Arc<dyn CommandExecutor>,
    ) -> PipelineResult<Self> {
        Self::new(
            WorkspaceLayout::from_config(config),
            config.retrieval_mode()?,
            config.repository.idle_branch.clone(),
            executor,
        )
    }

    /// Take ownership of the data directory
    pub fn new(
        layout: WorkspaceLayout,
        mode: RetrievalMode,
        idle_branch: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> PipelineResult<Self> {
        std::fs::create_dir_all(&layout.data_dir)?;

        let lock_file = File::create(layout.lock_path())?;
        let lock = Box::leak(Box::new(RwLock::new(lock_file)));
        let guard = lock.try_write().map_err(|_| {
            PipelineError::Configuration(format!(
                "Another style-guard is already using {}. Only one instance can run per data directory.",
                layout.data_dir.display()
            ))
        })?;

        Ok(Self {
            git: GitClient::new(executor, &layout.repo_dir),
            patches: PatchStore::new(&layout.patches_dir),
            layout,
            mode,
            idle_branch: idle_branch.into(),
            _lock_guard: Some(guard),
        })
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn repo_dir(&self) -> &Path {
        &self.layout.repo_dir
    }

    pub fn styler_dir(&self) -> &Path {
        &self.layout.styler_dir
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    pub fn idle_branch(&self) -> &str {
        &self.idle_branch
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    pub fn patches(&self) -> &PatchStore {
        &self.patches
    }

    /// Startup check. A mirror must already be a clean clone; everything
    /// else is created here.
    pub async fn prepare(&self) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.layout.patches_dir)?;
        recreate_dir(&self.layout.styler_dir)?;

        match self.mode {
            RetrievalMode::Mirror => {
                if !self.git.is_repository().await {
                    return Err(PipelineError::Configuration(format!(
                        "{} is not a git checkout; clone the repository there first",
                        self.layout.repo_dir.display()
                    )));
                }
                let status = self.git.status(false).await?;
                if !status.is_clean {
                    return Err(PipelineError::Configuration(format!(
                        "{} has uncommitted changes: {:?}",
                        self.layout.repo_dir.display(),
                        status
                            .staged_files
                            .iter()
                            .chain(&status.unstaged_files)
                            .collect::<Vec<_>>()
                    )));
                }
                self.git.checkout(&self.idle_branch).await?;
            }
            RetrievalMode::PerFile => recreate_dir(&self.layout.repo_dir)?,
        }

        info!(
            data_dir = %self.layout.data_dir.display(),
            mode = ?self.mode,
            "workspace ready"
        );
        Ok(())
    }

    /// Run one job's workspace-touching body between two resets
    ///
    /// If the workspace cannot be brought back to idle first, the body never
    /// runs. Teardown runs after success, after an error and after a panic. A
    /// panic is re-raised once the workspace is clean again.
    pub async fn scoped<F, T>(&self, event: &ChangeEvent, body: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        if let Err(e) = self.reset_to_idle().await {
            error!(pr = event.number, "workspace not clean at job start: {e}");
            return Err(e);
        }

        let outcome = AssertUnwindSafe(body).catch_unwind().await;

        if let Err(e) = self.teardown(event).await {
            error!(pr = event.number, "workspace teardown incomplete: {e}");
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Discard anything a previous job or an operator left behind. Unlike
    /// teardown, the first failure stops here.
    async fn reset_to_idle(&self) -> PipelineResult<()> {
        match self.mode {
            RetrievalMode::Mirror => {
                self.git.reset_hard().await?;
                self.git.clean().await?;
                self.git.checkout(&self.idle_branch).await?;
            }
            RetrievalMode::PerFile => recreate_dir(&self.layout.repo_dir)?,
        }
        recreate_dir(&self.layout.styler_dir)?;
        Ok(())
    }

    /// Return the workspace to its idle state. Every step is attempted even
    /// if an earlier one fails.
    pub async fn teardown(&self, event: &ChangeEvent) -> PipelineResult<()> {
        let mut failures = Vec::new();

        match self.mode {
            RetrievalMode::Mirror => {
                if let Err(e) = self.git.reset_hard().await {
                    failures.push(format!("reset: {e}"));
                }
                if let Err(e) = self.git.clean().await {
                    failures.push(format!("clean: {e}"));
                }
                if let Err(e) = self.git.checkout(&self.idle_branch).await {
                    failures.push(format!("checkout {}: {e}", self.idle_branch));
                }
                if let Err(e) = self.git.submodule_update().await {
                    failures.push(format!("submodule update: {e}"));
                }
                let branch = event.local_branch();
                match self.git.branch_exists(&branch).await {
                    Ok(true) => {
                        if let Err(e) = self.git.delete_branch(&branch, true).await {
                            failures.push(format!("delete {branch}: {e}"));
                        }
                    }
                    Ok(false) => {}
                    Err(e) => failures.push(format!("inspect {branch}: {e}")),
                }
            }
            RetrievalMode::PerFile => {
                if let Err(e) = recreate_dir(&self.layout.repo_dir) {
                    failures.push(format!("repo dir: {e}"));
                }
            }
        }

        if let Err(e) = recreate_dir(&self.layout.styler_dir) {
            failures.push(format!("styler dir: {e}"));
        }

        if failures.is_empty() {
            debug!(pr = event.number, "workspace torn down");
            Ok(())
        } else {
            warn!(pr = event.number, failures = failures.len(), "teardown had failures");
            Err(PipelineError::Cleanup(failures.join("; ")))
        }
    }
}

/// Remove a directory with everything in it and create it empty
fn recreate_dir(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dir)
}
