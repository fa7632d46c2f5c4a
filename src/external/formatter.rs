//! The external style formatter
//!
//! The formatter is an opaque in-place rewriter: `<tool> <absolute-file>`,
//! run from the tool's own directory. Failures are reported per file and
//! never stop the batch.

use super::command::CommandExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

pub struct Formatter {
    executor: Arc<dyn CommandExecutor>,
    tool_dir: PathBuf,
    executable: String,
}

/// Outcome of formatting a batch of files
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormatReport {
    pub formatted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl Formatter {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        tool_dir: impl Into<PathBuf>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            tool_dir: tool_dir.into(),
            executable: executable.into(),
        }
    }

    pub fn executable_path(&self) -> PathBuf {
        self.tool_dir.join(&self.executable)
    }

    /// Format one file in place. Returns false if the tool could not be run
    /// or exited non-zero; the reason is logged.
    pub async fn format_file(&self, file: &Path) -> bool {
        let program = self.executable_path();
        let program = program.to_string_lossy();
        let target = file.to_string_lossy();

        match self
            .executor
            .execute(&self.tool_dir, &program, &[&target])
            .await
        {
            Ok(output) if output.success() => {
                let text = output.combined();
                if !text.is_empty() {
                    debug!(file = %target, "{text}");
                }
                true
            }
            Ok(output) => {
                error!(
                    file = %target,
                    status = output.status_code,
                    "{} failed: {}",
                    self.executable,
                    output.combined()
                );
                false
            }
            Err(e) => {
                error!(file = %target, "could not run {}: {e}", self.executable);
                false
            }
        }
    }

    /// Format every file; one failure does not stop the rest
    pub async fn format_all(&self, files: &[PathBuf]) -> FormatReport {
        let mut report = FormatReport::default();
        for file in files {
            if self.format_file(file).await {
                report.formatted.push(file.clone());
            } else {
                report.failed.push(file.clone());
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::super::command::tests::MockCommandExecutor;
    use super::*;

    #[tokio::test]
    async fn test_failure_on_one_file_does_not_abort_batch() {
        let mock = MockCommandExecutor::new()
            .fail("/styler/ofStyler", &["/repo/examples/bad.cpp"], "parse error")
            .ok("/styler/ofStyler", &["/repo/examples/good.cpp"], "");
        let mock = Arc::new(mock);
        let formatter = Formatter::new(mock.clone(), "/styler", "ofStyler");

        let report = formatter
            .format_all(&[
                PathBuf::from("/repo/examples/bad.cpp"),
                PathBuf::from("/repo/examples/good.cpp"),
            ])
            .await;

        assert_eq!(report.failed, vec![PathBuf::from("/repo/examples/bad.cpp")]);
        assert_eq!(report.formatted, vec![PathBuf::from("/repo/examples/good.cpp")]);
        assert_eq!(mock.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_tool_counts_as_failure() {
        let formatter = Formatter::new(Arc::new(MockCommandExecutor::new()), "/styler", "ofStyler");

        assert!(!formatter.format_file(Path::new("/repo/a.cpp")).await);
    }
}
