//! Turning inbound events into queued jobs
//!
//! Whatever transport receives webhooks hands them to
//! [`EventIngest::accept_webhook`] together with the peer address. Manual
//! checks go through [`EventIngest::trigger`].

use crate::event::ChangeEvent;
use crate::github::{GitHubError, HostingPlatform};
use crate::worker::{JobSender, JobSource, QueueClosed};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `pull_request` actions that change what the check would see
const CHECKED_ACTIONS: [&str; 3] = ["opened", "reopened", "synchronize"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("event from untrusted origin {0}")]
    UntrustedOrigin(IpAddr),
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("cannot look up pull request: {0}")]
    Platform(#[from] GitHubError),
    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

/// What happened to an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Enqueued(Uuid),
    Ignored(String),
}

pub struct EventIngest {
    sender: JobSender,
    platform: Arc<dyn HostingPlatform>,
    repo_slug: String,
    trusted_origins: Vec<IpAddr>,
    snapshot_path: PathBuf,
}

impl EventIngest {
    pub fn new(
        sender: JobSender,
        platform: Arc<dyn HostingPlatform>,
        repo_slug: impl Into<String>,
        trusted_origins: Vec<IpAddr>,
        snapshot_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sender,
            platform,
            repo_slug: repo_slug.into(),
            trusted_origins,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Accept a raw webhook delivery. `event_kind` is the delivery's event
    /// header (`pull_request`, `ping`, ...).
    pub fn accept_webhook(
        &self,
        origin: IpAddr,
        event_kind: &str,
        body: &[u8],
    ) -> Result<IngestOutcome, IngestError> {
        if !self.trusted_origins.contains(&origin) {
            warn!(%origin, "rejecting event from untrusted origin");
            return Err(IngestError::UntrustedOrigin(origin));
        }

        match event_kind {
            "ping" => Ok(IngestOutcome::Ignored("ping".to_string())),
            "pull_request" => {
                let payload: serde_json::Value = serde_json::from_slice(body)?;
                self.accept_payload(payload, JobSource::Webhook)
            }
            other => {
                debug!(event = other, "ignoring event kind");
                Ok(IngestOutcome::Ignored(format!("event kind '{other}'")))
            }
        }
    }

    /// Enqueue a parsed payload: a webhook envelope or a bare pull request
    pub fn accept_payload(
        &self,
        payload: serde_json::Value,
        source: JobSource,
    ) -> Result<IngestOutcome, IngestError> {
        self.write_snapshot(&payload);

        let (event, action) = ChangeEvent::from_payload(payload)?;
        if let Some(action) = action.as_deref() {
            if !CHECKED_ACTIONS.contains(&action) {
                debug!(pr = event.number, action, "ignoring pull request action");
                return Ok(IngestOutcome::Ignored(format!("action '{action}'")));
            }
        }

        let number = event.number;
        let id = self.sender.enqueue(event, source)?;
        info!(pr = number, job.id = %id, source = source.as_str(), "job enqueued");
        Ok(IngestOutcome::Enqueued(id))
    }

    /// Check a pull request by number
    pub async fn trigger(&self, pr_number: u64) -> Result<Uuid, IngestError> {
        let event = self
            .platform
            .get_pull_request(&self.repo_slug, pr_number)
            .await?;
        let id = self.sender.enqueue(event, JobSource::Manual)?;
        info!(pr = pr_number, job.id = %id, "manual check enqueued");
        Ok(id)
    }

    /// Diagnostic copy of the last payload; failures are only logged
    fn write_snapshot(&self, payload: &serde_json::Value) {
        let written = serde_json::to_vec_pretty(payload)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&self.snapshot_path, bytes));
        if let Err(e) = written {
            warn!(path = %self.snapshot_path.display(), "cannot write payload snapshot: {e}");
        }
    }
}
