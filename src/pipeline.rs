//! One job, end to end: validate, retrieve, verify, publish, tear down

use crate::config::StyleGuardConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::external::{CommandExecutor, Formatter};
use crate::feedback::FeedbackPublisher;
use crate::filter::FileFilter;
use crate::github::{CommitStatus, HostingPlatform};
use crate::retrieval::{self, Retrieval, StylerFetcher};
use crate::validator::{EventValidator, Validation};
use crate::verifier::{StyleVerifier, VerificationResult};
use crate::worker::{Job, JobProcessor};
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// What a finished job did
#[derive(Debug, Clone)]
pub struct JobReport {
    pub result: VerificationResult,
    pub bundle_url: Option<String>,
    pub status: CommitStatus,
}

pub struct Pipeline {
    validator: EventValidator,
    retrieval: Retrieval,
    verifier: StyleVerifier,
    feedback: Arc<FeedbackPublisher>,
    workspace: Workspace,
}

impl Pipeline {
    pub fn new(
        validator: EventValidator,
        retrieval: Retrieval,
        verifier: StyleVerifier,
        feedback: Arc<FeedbackPublisher>,
        workspace: Workspace,
    ) -> Self {
        Self {
            validator,
            retrieval,
            verifier,
            feedback,
            workspace,
        }
    }

    /// Wire every stage from configuration. The workspace is opened (and
    /// locked) but not yet prepared.
    pub fn from_config(
        config: &StyleGuardConfig,
        platform: Arc<dyn HostingPlatform>,
        executor: Arc<dyn CommandExecutor>,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let workspace = Workspace::open(config, executor.clone())?;
        let mut publisher =
            FeedbackPublisher::new(platform.clone(), &config.feedback, config.suppress_feedback);
        if let Some(template) = config.usage_note_template()? {
            publisher = publisher.with_usage_note(template);
        }
        let feedback = Arc::new(publisher);
        let validator = EventValidator::new(
            platform.clone(),
            config.repository.url.clone(),
            config.retry_config(),
            feedback.clone(),
        );
        let retrieval = Retrieval::new(
            retrieval::for_mode(
                config.retrieval_mode()?,
                platform.clone(),
                FileFilter::from_config(&config.filter),
            ),
            StylerFetcher::new(platform, &config.formatter),
        );
        let verifier = StyleVerifier::new(Formatter::new(
            executor,
            workspace.styler_dir(),
            config.formatter.executable.clone(),
        ));

        Ok(Self::new(validator, retrieval, verifier, feedback, workspace))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self, event: &ChangeEvent) -> PipelineResult<JobReport> {
        if let Validation::Rejected(reason) = self.validator.validate(event).await? {
            return Err(PipelineError::Validation {
                pr_number: event.number,
                reason,
            });
        }

        self.workspace
            .scoped(event, self.check(event))
            .await
    }

    async fn check(&self, event: &ChangeEvent) -> PipelineResult<JobReport> {
        let files = self.retrieval.retrieve(event, &self.workspace).await?;
        let result = self
            .verifier
            .verify(event, &files.in_scope, &self.workspace)
            .await?;

        let bundle_url = match &result.patch {
            Some(_) if !self.feedback.is_suppressed() => {
                let patch = self.workspace.patches().read(event.number).await?;
                Some(self.feedback.create_bundle(event, &result, &patch).await?)
            }
            _ => None,
        };

        let status = self
            .feedback
            .publish(event, &result, bundle_url.as_deref())
            .await?;
        info!(state = %status.state, "job finished");

        Ok(JobReport {
            result,
            bundle_url,
            status,
        })
    }
}

#[async_trait]
impl JobProcessor for Pipeline {
    async fn process(&self, job: &Job) -> PipelineResult<()> {
        self.run(&job.event).await.map(|_| ())
    }
}
