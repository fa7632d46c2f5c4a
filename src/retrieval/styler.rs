use crate::config::FormatterConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::event::ChangeEvent;
use crate::github::HostingPlatform;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the formatter files are taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylerSource {
    /// The PR changes its own style rules; check it against them
    Head,
    Base,
}

/// Downloads the formatter and its configuration into the styler directory
pub struct StylerFetcher {
    platform: Arc<dyn HostingPlatform>,
    support_files: Vec<String>,
    executable: String,
}

impl StylerFetcher {
    pub fn new(platform: Arc<dyn HostingPlatform>, config: &FormatterConfig) -> Self {
        Self {
            platform,
            support_files: config.support_files.clone(),
            executable: config.executable.clone(),
        }
    }

    pub fn source_for(&self, changed: &[String]) -> StylerSource {
        if self
            .support_files
            .iter()
            .any(|file| changed.iter().any(|c| c == file))
        {
            StylerSource::Head
        } else {
            StylerSource::Base
        }
    }

    /// Files land in `styler_dir` under their base name only
    pub async fn fetch(
        &self,
        event: &ChangeEvent,
        changed: &[String],
        styler_dir: &Path,
    ) -> PipelineResult<()> {
        let source = self.source_for(changed);
        let commit = match source {
            StylerSource::Head => &event.head.sha,
            StylerSource::Base => &event.base.sha,
        };
        info!(source = ?source, commit = %commit, "fetching formatter files");

        tokio::fs::create_dir_all(styler_dir).await?;
        let repo = event.base_full_name();

        for file in &self.support_files {
            let name = file.rsplit('/').next().unwrap_or(file);
            let destination = styler_dir.join(name);
            debug!(file = %file, destination = %destination.display(), "fetching");

            let content = self
                .platform
                .get_file_contents(repo, file, commit)
                .await
                .map_err(|e| PipelineError::Retrieval(format!("cannot fetch {file}: {e}")))?;
            tokio::fs::write(&destination, content).await?;

            if name == self.executable {
                make_executable(&destination)?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleGuardConfig;
    use crate::event::tests::sample_event;
    use crate::github::client::MockHostingPlatform;
    use crate::github::GitHubError;
    use mockall::predicate::eq;

    const BASE_SHA: &str = "1111111111111111111111111111111111111111";
    const HEAD_SHA: &str = "abcdef0123456789abcdef0123456789abcdef01";

    fn fetcher(platform: MockHostingPlatform) -> StylerFetcher {
        StylerFetcher::new(Arc::new(platform), &StyleGuardConfig::default().formatter)
    }

    #[tokio::test]
    async fn test_fetches_from_base_when_pr_does_not_touch_styler() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_file_contents()
            .withf(|repo, _, git_ref| repo == "openframeworks/openFrameworks" && git_ref == BASE_SHA)
            .times(3)
            .returning(|_, path, _| Ok(path.as_bytes().to_vec()));
        let dir = tempfile::tempdir().unwrap();

        fetcher(platform)
            .fetch(&sample_event(42), &["examples/foo.cpp".to_string()], dir.path())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("openFrameworks_style.cfg")).unwrap(),
            "scripts/dev/style/openFrameworks_style.cfg"
        );
        assert!(dir.path().join("core_header.txt").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join("ofStyler"))
                .unwrap()
                .permissions()
                .mode();
            assert_ne!(mode & 0o111, 0);
        }
    }

    #[tokio::test]
    async fn test_fetches_from_head_when_pr_changes_style_config() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_file_contents()
            .withf(|_, _, git_ref| git_ref == HEAD_SHA)
            .times(3)
            .returning(|_, _, _| Ok(b"from head".to_vec()));
        let dir = tempfile::tempdir().unwrap();
        let changed = vec![
            "examples/foo.cpp".to_string(),
            "scripts/dev/style/openFrameworks_style.cfg".to_string(),
        ];

        fetcher(platform)
            .fetch(&sample_event(42), &changed, dir.path())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("openFrameworks_style.cfg")).unwrap(),
            b"from head"
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_a_retrieval_error() {
        let mut platform = MockHostingPlatform::new();
        platform
            .expect_get_file_contents()
            .with(eq("openframeworks/openFrameworks"), eq("scripts/dev/style/ofStyler"), eq(BASE_SHA))
            .returning(|_, _, _| Err(GitHubError::DecodeError("truncated".into())));
        let dir = tempfile::tempdir().unwrap();

        let result = fetcher(platform)
            .fetch(&sample_event(42), &[], dir.path())
            .await;

        assert!(matches!(result, Err(PipelineError::Retrieval(msg)) if msg.contains("ofStyler")));
    }
}
