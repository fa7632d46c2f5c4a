//! Startup: credentials, platform client, workspace, worker

use crate::config::{credential_error, Credential, StyleGuardConfig, REQUIRED_SCOPES};
use crate::errors::{PipelineError, PipelineResult};
use crate::external::{CommandExecutor, ProcessCommandExecutor};
use crate::github::{GitHubClient, GitHubError, HostingPlatform};
use crate::ingest::EventIngest;
use crate::pipeline::Pipeline;
use crate::worker::{job_queue, Worker};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// A running worker plus the ingest handle that feeds it
pub struct Service {
    ingest: EventIngest,
    worker: JoinHandle<PipelineResult<()>>,
}

impl Service {
    /// Load credentials, check the token works, and start the worker
    pub async fn start(config: &StyleGuardConfig) -> PipelineResult<Self> {
        config.validate()?;

        let credential = Credential::load_status(&config.credentials_path())?;
        let client = GitHubClient::new(credential.token)?;
        verify_token(&client).await?;

        Self::with_parts(config, Arc::new(client), Arc::new(ProcessCommandExecutor)).await
    }

    /// Start with an explicit platform and executor
    pub async fn with_parts(
        config: &StyleGuardConfig,
        platform: Arc<dyn HostingPlatform>,
        executor: Arc<dyn CommandExecutor>,
    ) -> PipelineResult<Self> {
        let pipeline = Pipeline::from_config(config, platform.clone(), executor)?;
        pipeline.workspace().prepare().await?;

        let (sender, receiver) = job_queue();
        let ingest = EventIngest::new(
            sender,
            platform,
            config.repository_slug()?,
            config.trusted_origins()?,
            config.last_payload_path(),
        );
        let worker = tokio::spawn(Worker::new(receiver, Arc::new(pipeline)).run());

        Ok(Self { ingest, worker })
    }

    pub fn ingest(&self) -> &EventIngest {
        &self.ingest
    }

    /// Stop accepting work and wait until every queued job has finished
    pub async fn drain(self) -> PipelineResult<()> {
        drop(self.ingest);
        self.worker
            .await
            .map_err(|e| PipelineError::Cleanup(format!("worker task failed: {e}")))?
    }
}

/// One authenticated call before any job runs; a rejected token is a
/// configuration problem, not a job failure
async fn verify_token(platform: &dyn HostingPlatform) -> PipelineResult<String> {
    let login = platform.authenticated_user().await.map_err(|e| {
        credential_error(GitHubError::TokenScopeInsufficient {
            required_scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            current_error: format!("token was rejected: {e}"),
        })
    })?;
    info!(login = %login, "authenticated with GitHub");
    Ok(login)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Disposition;
    use crate::github::client::MockHostingPlatform;

    #[tokio::test]
    async fn test_rejected_token_stops_the_process() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_authenticated_user()
            .times(1)
            .returning(|| Err(GitHubError::DecodeError("Bad credentials".into())));

        let err = verify_token(&platform).await.unwrap_err();

        assert!(matches!(&err, PipelineError::Configuration(msg) if msg.contains("token was rejected")));
        assert_eq!(err.disposition(), Disposition::AbortProcess);
    }

    #[tokio::test]
    async fn test_accepted_token_returns_login() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_authenticated_user()
            .returning(|| Ok("style-bot".to_string()));

        assert_eq!(verify_token(&platform).await.unwrap(), "style-bot");
    }
}
