//! Pipeline error kinds
//!
//! Every failure a job can hit maps to one variant here, and every variant
//! maps to exactly one [`Disposition`]. The worker decides what to do from
//! the disposition alone.

use crate::external::{CommandError, GitError};
use crate::github::GitHubError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The event should not be processed. Not retried.
    #[error("PR #{pr_number} rejected: {reason}")]
    Validation { pr_number: u64, reason: String },

    /// Bad or unsupported configuration, missing credentials or scopes.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The PR's files or the formatter could not be put in the workspace.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The generated patch does not re-apply to a clean checkout.
    #[error("patch {} does not apply cleanly: {reason}", patch.display())]
    PatchIntegrity { patch: PathBuf, reason: String },

    #[error(transparent)]
    ExternalCall(#[from] ExternalCallError),

    /// Workspace teardown did not complete.
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

/// A subprocess or platform call failed
#[derive(Debug, Error)]
pub enum ExternalCallError {
    #[error("git: {0}")]
    Git(#[from] GitError),
    #[error("command: {0}")]
    Command(#[from] CommandError),
    #[error("{0}")]
    GitHub(#[from] GitHubError),
    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),
}

/// What the worker does after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Drop the job quietly and move on
    Skip,
    /// Abandon this job, tear down, continue with the next
    AbortJob,
    /// Stop the process
    AbortProcess,
}

impl PipelineError {
    pub fn disposition(&self) -> Disposition {
        match self {
            PipelineError::Validation { .. } => Disposition::Skip,
            PipelineError::Configuration(_) => Disposition::AbortProcess,
            PipelineError::Retrieval(_)
            | PipelineError::PatchIntegrity { .. }
            | PipelineError::ExternalCall(_) => Disposition::AbortJob,
            // teardown problems are logged and the worker carries on
            PipelineError::Cleanup(_) => Disposition::AbortJob,
        }
    }
}

impl From<GitError> for PipelineError {
    fn from(err: GitError) -> Self {
        PipelineError::ExternalCall(err.into())
    }
}

impl From<GitHubError> for PipelineError {
    fn from(err: GitHubError) -> Self {
        PipelineError::ExternalCall(err.into())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::ExternalCall(err.into())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
