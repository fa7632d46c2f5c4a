//! Formats the in-scope files and turns the difference into a patch

use crate::config::RetrievalMode;
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::external::Formatter;
use crate::workspace::Workspace;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome of one verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub pr_number: u64,
    pub pr_url: String,
    /// Set when the formatter changed something; the patch re-applies
    /// cleanly to the retrieved files
    pub patch: Option<PathBuf>,
    /// Files the formatter could not process
    pub format_failures: Vec<PathBuf>,
}

impl VerificationResult {
    pub fn conforms(&self) -> bool {
        self.patch.is_none()
    }
}

pub struct StyleVerifier {
    formatter: Formatter,
}

impl StyleVerifier {
    pub fn new(formatter: Formatter) -> Self {
        Self { formatter }
    }

    /// Format, diff, persist, and prove the patch re-applies
    ///
    /// The workspace is reset to its last commit before this returns,
    /// whatever the outcome.
    pub async fn verify(
        &self,
        event: &ChangeEvent,
        in_scope: &[String],
        workspace: &Workspace,
    ) -> PipelineResult<VerificationResult> {
        let outcome = self.format_and_diff(event, in_scope, workspace).await;

        let git = workspace.git();
        let reset = git.reset_hard().await;
        if workspace.mode() == RetrievalMode::Mirror {
            if let Err(e) = git.submodule_update().await {
                warn!("submodule update after verification failed: {e}");
            }
        }

        let result = outcome?;
        reset?;
        Ok(result)
    }

    async fn format_and_diff(
        &self,
        event: &ChangeEvent,
        in_scope: &[String],
        workspace: &Workspace,
    ) -> PipelineResult<VerificationResult> {
        let mut result = VerificationResult {
            pr_number: event.number,
            pr_url: event.html_url.clone(),
            patch: None,
            format_failures: Vec::new(),
        };

        if in_scope.is_empty() {
            info!("no files to style");
            return Ok(result);
        }

        let files: Vec<PathBuf> = in_scope
            .iter()
            .map(|path| workspace.repo_dir().join(path))
            .collect();
        let report = self.formatter.format_all(&files).await;
        info!(
            formatted = report.formatted.len(),
            failed = report.failed.len(),
            "formatter finished"
        );
        result.format_failures = report.failed;

        let git = workspace.git();
        let status = git.status(false).await?;
        if status.is_clean {
            info!("PR conforms to code style");
            return Ok(result);
        }

        let diff = git.diff_head().await?;
        let patch = workspace.patches().write(event.number, &diff).await?;

        git.reset_hard().await?;
        if let Err(e) = git.apply_check(&patch).await {
            error!(patch = %patch.display(), "generated patch does not re-apply: {e}");
            return Err(PipelineError::PatchIntegrity {
                patch,
                reason: e.to_string(),
            });
        }

        info!(patch = %patch.display(), "PR does not conform to code style");
        result.patch = Some(patch);
        Ok(result)
    }
}
