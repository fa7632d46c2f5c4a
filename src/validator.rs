//! Decides whether an event is worth a style check right now

use crate::errors::PipelineResult;
use crate::event::{ChangeEvent, Mergeability, PrState};
use crate::feedback::{FeedbackPublisher, CONFLICT_DESCRIPTION, UNKNOWN_MERGEABILITY_DESCRIPTION};
use crate::github::{HostingPlatform, RetryConfig};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(String),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted)
    }
}

pub struct EventValidator {
    platform: Arc<dyn HostingPlatform>,
    repo_url: String,
    retry: RetryConfig,
    feedback: Arc<FeedbackPublisher>,
}

impl EventValidator {
    pub fn new(
        platform: Arc<dyn HostingPlatform>,
        repo_url: impl Into<String>,
        retry: RetryConfig,
        feedback: Arc<FeedbackPublisher>,
    ) -> Self {
        Self {
            platform,
            repo_url: repo_url.into(),
            retry,
            feedback,
        }
    }

    /// Identity, open, not merged, mergeable. Only the mergeability step
    /// talks to the platform; its network errors propagate.
    pub async fn validate(&self, event: &ChangeEvent) -> PipelineResult<Validation> {
        let identity_ok = event
            .base_repo()
            .is_some_and(|repo| repo.matches_url(&self.repo_url));
        debug!(check = "identity", passed = identity_ok);
        if !identity_ok {
            return Ok(Validation::Rejected(format!(
                "base repository '{}' is not {}",
                event.base_full_name(),
                self.repo_url
            )));
        }

        debug!(check = "open", passed = event.state == PrState::Open);
        if event.state != PrState::Open {
            return Ok(Validation::Rejected("PR is closed".to_string()));
        }

        debug!(check = "not merged", passed = !event.merged);
        if event.merged {
            return Ok(Validation::Rejected("PR is already merged".to_string()));
        }

        match self.resolve_mergeability(event).await? {
            Mergeability::Mergeable => {
                info!("PR #{} is valid", event.number);
                Ok(Validation::Accepted)
            }
            Mergeability::Conflicting => {
                self.feedback
                    .publish_pending(event, CONFLICT_DESCRIPTION)
                    .await?;
                Ok(Validation::Rejected("PR is not mergeable".to_string()))
            }
            Mergeability::Unknown => {
                self.feedback
                    .publish_pending(event, UNKNOWN_MERGEABILITY_DESCRIPTION)
                    .await?;
                Ok(Validation::Rejected(
                    "PR mergeability is not known yet".to_string(),
                ))
            }
        }
    }

    /// Re-query with backoff until the platform gives a definite answer or
    /// the attempts run out
    async fn resolve_mergeability(&self, event: &ChangeEvent) -> PipelineResult<Mergeability> {
        let mut mergeable = event.mergeable;
        debug!(check = "mergeable", state = ?mergeable);
        if mergeable == Mergeability::Mergeable {
            return Ok(mergeable);
        }

        for (attempt, delay) in self.retry.delays().enumerate() {
            info!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "mergeability is {mergeable:?}, asking again"
            );
            tokio::time::sleep(delay).await;

            let fresh = self
                .platform
                .get_pull_request(event.base_full_name(), event.number)
                .await?;
            mergeable = fresh.mergeable;
            if mergeable != Mergeability::Unknown {
                break;
            }
        }

        Ok(mergeable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleGuardConfig;
    use crate::event::tests::sample_event;
    use crate::github::client::MockHostingPlatform;
    use crate::github::{GitHubError, StatusState};
    use std::time::Duration;

    const REPO_URL: &str = "git://github.com/openframeworks/openFrameworks.git";

    fn validator(platform: MockHostingPlatform, suppressed: bool) -> EventValidator {
        let platform: Arc<dyn HostingPlatform> = Arc::new(platform);
        let feedback = Arc::new(FeedbackPublisher::new(
            platform.clone(),
            &StyleGuardConfig::default().feedback,
            suppressed,
        ));
        EventValidator::new(
            platform,
            REPO_URL,
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(30),
            },
            feedback,
        )
    }

    fn with_mergeable(number: u64, mergeable: Mergeability) -> ChangeEvent {
        ChangeEvent {
            mergeable,
            ..sample_event(number)
        }
    }

    #[tokio::test]
    async fn test_mergeable_open_pr_is_accepted_without_calls() {
        let mut platform = MockHostingPlatform::new();
        platform.expect_get_pull_request().never();

        let result = validator(platform, false).validate(&sample_event(42)).await.unwrap();
        assert_eq!(result, Validation::Accepted);
    }

    #[tokio::test]
    async fn test_merged_pr_short_circuits() {
        let mut platform = MockHostingPlatform::new();
        platform.expect_get_pull_request().never();
        platform.expect_create_status().never();
        let event = ChangeEvent {
            merged: true,
            ..sample_event(42)
        };

        let result = validator(platform, false).validate(&event).await.unwrap();
        assert!(matches!(result, Validation::Rejected(reason) if reason.contains("merged")));
    }

    #[tokio::test]
    async fn test_closed_and_foreign_prs_are_rejected() {
        let closed = ChangeEvent {
            state: PrState::Closed,
            ..sample_event(1)
        };
        let mut foreign = sample_event(2);
        if let Some(repo) = foreign.base.repo.as_mut() {
            repo.full_name = "someone/fork".into();
            repo.git_url = "git://github.com/someone/fork.git".into();
            repo.ssh_url = "git@github.com:someone/fork.git".into();
            repo.clone_url = "https://github.com/someone/fork.git".into();
            repo.html_url = "https://github.com/someone/fork".into();
        }

        let validator = validator(MockHostingPlatform::new(), false);
        assert!(!validator.validate(&closed).await.unwrap().is_accepted());
        assert!(!validator.validate(&foreign).await.unwrap().is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_mergeability_resolved_by_requery() {
        let mut platform = MockHostingPlatform::new();
        let mut answers = vec![Mergeability::Mergeable, Mergeability::Unknown];
        platform
            .expect_get_pull_request()
            .times(2)
            .returning(move |_, number| {
                Ok(with_mergeable(number, answers.pop().unwrap_or(Mergeability::Unknown)))
            });

        let result = validator(platform, false)
            .validate(&with_mergeable(42, Mergeability::Unknown))
            .await
            .unwrap();
        assert_eq!(result, Validation::Accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_pr_gets_pending_status() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_pull_request()
            .times(1)
            .returning(|_, number| Ok(with_mergeable(number, Mergeability::Conflicting)));
        platform
            .expect_create_status()
            .withf(|_, _, status| {
                status.state == StatusState::Pending && status.description == CONFLICT_DESCRIPTION
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let result = validator(platform, false)
            .validate(&with_mergeable(42, Mergeability::Conflicting))
            .await
            .unwrap();
        assert!(!result.is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_unknown_after_all_attempts_is_pending() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_pull_request()
            .times(3)
            .returning(|_, number| Ok(with_mergeable(number, Mergeability::Unknown)));
        platform.expect_create_status().never();

        let result = validator(platform, true)
            .validate(&with_mergeable(42, Mergeability::Unknown))
            .await
            .unwrap();
        assert!(matches!(result, Validation::Rejected(reason) if reason.contains("not known")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_during_requery_propagates() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_pull_request()
            .returning(|_, _| Err(GitHubError::DecodeError("connection reset".into())));

        let result = validator(platform, false)
            .validate(&with_mergeable(42, Mergeability::Unknown))
            .await;
        assert!(result.is_err());
    }
}
