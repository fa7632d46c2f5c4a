//! Populating the workspace with a pull request's files
//!
//! Two strategies exist, selected by configuration: a long-lived mirror
//! clone, or a snapshot of just the changed files fetched over the API.
//! Either way the formatter's own files are fetched afterwards.

pub mod mirror;
pub mod per_file;
pub mod styler;

pub use mirror::MirrorRetriever;
pub use per_file::PerFileRetriever;
pub use styler::StylerFetcher;

use crate::config::RetrievalMode;
use crate::errors::PipelineResult;
use crate::event::ChangeEvent;
use crate::filter::FileFilter;
use crate::github::HostingPlatform;
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Changed files of a pull request, before and after filtering
///
/// Paths are repository-relative, in the order the source listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSets {
    pub changed: Vec<String>,
    pub in_scope: Vec<String>,
}

/// One way of getting a pull request's files into the workspace
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn fetch_changes(
        &self,
        event: &ChangeEvent,
        workspace: &Workspace,
    ) -> PipelineResult<FileSets>;
}

/// Build the strategy for the configured mode
pub fn for_mode(
    mode: RetrievalMode,
    platform: Arc<dyn HostingPlatform>,
    filter: FileFilter,
) -> Box<dyn Retriever> {
    match mode {
        RetrievalMode::Mirror => Box::new(MirrorRetriever::new(filter)),
        RetrievalMode::PerFile => Box::new(PerFileRetriever::new(platform, filter)),
    }
}

/// Changed files plus formatter files, the full retrieval step
pub struct Retrieval {
    retriever: Box<dyn Retriever>,
    styler: StylerFetcher,
}

impl Retrieval {
    pub fn new(retriever: Box<dyn Retriever>, styler: StylerFetcher) -> Self {
        Self { retriever, styler }
    }

    pub async fn retrieve(
        &self,
        event: &ChangeEvent,
        workspace: &Workspace,
    ) -> PipelineResult<FileSets> {
        let files = self.retriever.fetch_changes(event, workspace).await?;
        info!(
            changed = files.changed.len(),
            in_scope = files.in_scope.len(),
            "retrieved pull request files"
        );

        self.styler
            .fetch(event, &files.changed, workspace.styler_dir())
            .await?;
        Ok(files)
    }
}
