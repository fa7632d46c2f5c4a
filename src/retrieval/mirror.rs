use super::{FileSets, Retriever};
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::filter::FileFilter;
use crate::workspace::Workspace;
use async_trait::async_trait;
use tracing::{debug, info};

/// Brings a long-lived clone up to date and checks out the PR head
///
/// The clone must already have a remote pointing at the base repository.
pub struct MirrorRetriever {
    filter: FileFilter,
}

impl MirrorRetriever {
    pub fn new(filter: FileFilter) -> Self {
        Self { filter }
    }

    async fn find_base_remote(
        &self,
        event: &ChangeEvent,
        workspace: &Workspace,
    ) -> PipelineResult<String> {
        let base = event.base_repo().ok_or_else(|| {
            PipelineError::Retrieval(format!("PR #{} has no base repository", event.number))
        })?;

        let remotes = workspace.git().remotes().await?;
        for remote in &remotes {
            debug!(remote = %remote.name, url = %remote.url, "found remote");
        }

        remotes
            .into_iter()
            .find(|remote| base.matches_url(&remote.url))
            .map(|remote| remote.name)
            .ok_or_else(|| {
                PipelineError::Retrieval(format!(
                    "Base remote does not exist yet, with URL {}. Please create it first in the local git repo.",
                    base.urls().next().unwrap_or(&base.full_name)
                ))
            })
    }
}

#[async_trait]
impl Retriever for MirrorRetriever {
    async fn fetch_changes(
        &self,
        event: &ChangeEvent,
        workspace: &Workspace,
    ) -> PipelineResult<FileSets> {
        let git = workspace.git();
        git.checkout(workspace.idle_branch()).await?;
        git.submodule_update().await?;

        let remote = self.find_base_remote(event, workspace).await?;
        info!(remote = %remote, "updating base branch");
        git.fetch(&remote).await?;

        let base_branch = &event.base.name;
        let upstream = format!("{remote}/{base_branch}");
        if git.branch_exists(base_branch).await? {
            git.checkout(base_branch).await?;
            git.merge(&upstream).await?;
        } else {
            git.checkout_new_branch(base_branch, &upstream).await?;
        }
        git.submodule_update().await?;
        let head = git.head_summary().await?;
        info!(head = %head, "base branch ready");

        let pr_branch = event.local_branch();
        let refspec = format!("+pull/{}/head:{pr_branch}", event.number);
        git.fetch_refspec(&remote, &refspec).await?;
        git.checkout(&pr_branch).await?;
        git.submodule_update().await?;
        let head = git.head_summary().await?;
        info!(head = %head, "PR branch ready");

        let changed = git.changed_files(base_branch, &pr_branch).await?;
        let in_scope = self.filter.filter(&changed);
        Ok(FileSets { changed, in_scope })
    }
}
