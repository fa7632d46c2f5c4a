use super::{FileSets, Retriever};
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::filter::FileFilter;
use crate::github::HostingPlatform;
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Downloads only the in-scope changed files and commits them into a
/// throwaway repository, so the verifier has a baseline to diff against
pub struct PerFileRetriever {
    platform: Arc<dyn HostingPlatform>,
    filter: FileFilter,
}

impl PerFileRetriever {
    pub fn new(platform: Arc<dyn HostingPlatform>, filter: FileFilter) -> Self {
        Self { platform, filter }
    }
}

/// Join a repository path under `root`, refusing anything that would land
/// outside it
fn destination(root: &Path, relative: &str) -> PipelineResult<PathBuf> {
    let path = Path::new(relative);
    if path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Ok(root.join(path))
    } else {
        Err(PipelineError::Retrieval(format!(
            "refusing to write outside the workspace: {relative}"
        )))
    }
}

#[async_trait]
impl Retriever for PerFileRetriever {
    async fn fetch_changes(
        &self,
        event: &ChangeEvent,
        workspace: &Workspace,
    ) -> PipelineResult<FileSets> {
        info!("fetching PR files, this will take a while");
        let files = self
            .platform
            .list_pull_request_files(event.base_full_name(), event.number)
            .await?;

        let mut sets = FileSets::default();
        for file in files.into_iter().filter(|f| f.status.has_new_content()) {
            if self.filter.accepts(&file.filename) {
                let target = destination(workspace.repo_dir(), &file.filename)?;
                let url = file.raw_url.as_deref().ok_or_else(|| {
                    PipelineError::Retrieval(format!("no raw URL for {}", file.filename))
                })?;

                debug!(file = %file.filename, "fetching");
                let content = self.platform.download_raw(url).await?;
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, content).await?;
                sets.in_scope.push(file.filename.clone());
            }
            sets.changed.push(file.filename);
        }

        info!("creating temporary git repository");
        let git = workspace.git();
        tokio::fs::create_dir_all(workspace.repo_dir()).await?;
        git.init().await?;
        git.config_set("core.autocrlf", "input").await?;
        git.config_set("core.filemode", "false").await?;
        git.commit_all(&format!("PR #{} snapshot", event.number))
            .await?;

        Ok(sets)
    }
}
