//! Reporting results back to the pull request

use crate::config::FeedbackConfig;
use crate::errors::PipelineResult;
use crate::event::ChangeEvent;
use crate::github::types::GistFile;
use crate::github::{CommitStatus, HostingPlatform, NewGist, StatusState};
use crate::verifier::VerificationResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const SUCCESS_DESCRIPTION: &str = "PR conforms to code style.";
pub const FAILURE_DESCRIPTION: &str = "PR does not conform to style. Click for details.";
pub const CONFLICT_DESCRIPTION: &str = "Code style check postponed until PR is mergeable";
pub const UNKNOWN_MERGEABILITY_DESCRIPTION: &str =
    "Code style check postponed: mergeability not yet known";

const DEFAULT_USAGE_NOTE: &str = "\
# Code style patch for PR #{pr_number}

{pr_url}

The changed files in this pull request do not follow the code style.
The attached patch contains the changes the formatter would make.

To apply it, download `pr-{pr_number}.patch` into the root of your checkout
with the PR branch checked out, then run:

    git apply pr-{pr_number}.patch
    git commit -am \"Apply code style\"

and push the commit to update the pull request.
";

pub struct FeedbackPublisher {
    platform: Arc<dyn HostingPlatform>,
    context: String,
    usage_note: String,
    suppressed: bool,
}

impl FeedbackPublisher {
    pub fn new(platform: Arc<dyn HostingPlatform>, config: &FeedbackConfig, suppressed: bool) -> Self {
        Self {
            platform,
            context: config.status_context.clone(),
            usage_note: DEFAULT_USAGE_NOTE.to_string(),
            suppressed,
        }
    }

    /// Replace the built-in usage note with a template's text
    pub fn with_usage_note(mut self, template: impl Into<String>) -> Self {
        self.usage_note = template.into();
        self
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Report the verification outcome as a commit status on the PR head
    pub async fn publish(
        &self,
        event: &ChangeEvent,
        result: &VerificationResult,
        patch_link: Option<&str>,
    ) -> PipelineResult<CommitStatus> {
        let status = match (&result.patch, patch_link) {
            (Some(_), Some(link)) => self.status(StatusState::Failure, FAILURE_DESCRIPTION, Some(link)),
            (Some(_), None) => self.status(StatusState::Failure, FAILURE_DESCRIPTION, None),
            (None, _) => self.status(StatusState::Success, SUCCESS_DESCRIPTION, None),
        };
        self.send(event, status).await
    }

    /// A `pending` status, used when the check has to wait
    pub async fn publish_pending(
        &self,
        event: &ChangeEvent,
        description: &str,
    ) -> PipelineResult<CommitStatus> {
        let status = self.status(StatusState::Pending, description, None);
        self.send(event, status).await
    }

    /// Publish the usage note and the patch as one public gist; returns its URL
    pub async fn create_bundle(
        &self,
        event: &ChangeEvent,
        result: &VerificationResult,
        patch: &str,
    ) -> PipelineResult<String> {
        let gist = self.bundle(event, result, patch);
        let url = self.platform.create_gist(&gist).await?;
        info!(url = %url, "created patch bundle");
        Ok(url)
    }

    pub fn bundle(&self, event: &ChangeEvent, result: &VerificationResult, patch: &str) -> NewGist {
        let note = self
            .usage_note
            .replace("{pr_number}", &result.pr_number.to_string())
            .replace("{pr_url}", &result.pr_url);

        let mut files = BTreeMap::new();
        files.insert(
            format!("PR{}-{}.md", result.pr_number, event.short_head_sha()),
            GistFile { content: note },
        );
        files.insert(
            format!("pr-{}.patch", result.pr_number),
            GistFile {
                content: patch.to_string(),
            },
        );

        NewGist {
            description: format!("Code style patch for PR {}", result.pr_number),
            public: true,
            files,
        }
    }

    fn status(&self, state: StatusState, description: &str, target_url: Option<&str>) -> CommitStatus {
        CommitStatus {
            state,
            description: description.to_string(),
            target_url: target_url.map(str::to_string),
            context: self.context.clone(),
        }
    }

    async fn send(&self, event: &ChangeEvent, status: CommitStatus) -> PipelineResult<CommitStatus> {
        if self.suppressed {
            info!(state = %status.state, "feedback suppressed: {}", status.description);
            return Ok(status);
        }

        info!(state = %status.state, sha = %event.head.sha, "adding status to PR");
        self.platform
            .create_status(event.base_full_name(), &event.head.sha, &status)
            .await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleGuardConfig;
    use crate::event::tests::sample_event;
    use crate::github::client::MockHostingPlatform;
    use std::path::PathBuf;

    const HEAD_SHA: &str = "abcdef0123456789abcdef0123456789abcdef01";

    fn result(patch: Option<&str>) -> VerificationResult {
        VerificationResult {
            pr_number: 42,
            pr_url: "https://github.com/openframeworks/openFrameworks/pull/42".into(),
            patch: patch.map(PathBuf::from),
            format_failures: Vec::new(),
        }
    }

    fn publisher(platform: MockHostingPlatform, suppressed: bool) -> FeedbackPublisher {
        FeedbackPublisher::new(
            Arc::new(platform),
            &StyleGuardConfig::default().feedback,
            suppressed,
        )
    }

    #[tokio::test]
    async fn test_success_status_without_patch() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_create_status()
            .withf(|repo, sha, status| {
                repo == "openframeworks/openFrameworks"
                    && sha == HEAD_SHA
                    && status.state == StatusState::Success
                    && status.description == SUCCESS_DESCRIPTION
                    && status.target_url.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        publisher(platform, false)
            .publish(&sample_event(42), &result(None), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_status_links_bundle() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_create_status()
            .withf(|_, _, status| {
                status.state == StatusState::Failure
                    && status.target_url.as_deref() == Some("https://gist.github.com/1")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let status = publisher(platform, false)
            .publish(
                &sample_event(42),
                &result(Some("patches/pr-42.patch")),
                Some("https://gist.github.com/1"),
            )
            .await
            .unwrap();
        assert_eq!(status.description, FAILURE_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_suppressed_feedback_makes_no_calls() {
        let mut platform = MockHostingPlatform::new();
        platform.expect_create_status().never();

        let status = publisher(platform, true)
            .publish_pending(&sample_event(42), CONFLICT_DESCRIPTION)
            .await
            .unwrap();
        assert_eq!(status.state, StatusState::Pending);
    }

    #[test]
    fn test_bundle_contents() {
        let gist = publisher(MockHostingPlatform::new(), false).bundle(
            &sample_event(42),
            &result(Some("patches/pr-42.patch")),
            "diff --git a/x b/x\n",
        );

        assert!(gist.public);
        assert_eq!(gist.description, "Code style patch for PR 42");
        assert_eq!(gist.files["pr-42.patch"].content, "diff --git a/x b/x\n");
        let note = &gist.files["PR42-abcdef0.md"].content;
        assert!(note.contains("PR #42"));
        assert!(note.contains("https://github.com/openframeworks/openFrameworks/pull/42"));
        assert!(note.contains("git apply pr-42.patch"));
    }

    #[test]
    fn test_custom_usage_note_is_templated() {
        let gist = publisher(MockHostingPlatform::new(), false)
            .with_usage_note("Fix for {pr_url} (#{pr_number})")
            .bundle(&sample_event(42), &result(Some("patches/pr-42.patch")), "");

        assert_eq!(
            gist.files["PR42-abcdef0.md"].content,
            "Fix for https://github.com/openframeworks/openFrameworks/pull/42 (#42)"
        );
    }
}
