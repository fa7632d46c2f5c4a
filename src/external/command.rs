//! Base command execution abstraction
//!
//! Every external program the pipeline touches (git, the formatter) goes
//! through [`CommandExecutor`], so tests can swap in scripted responses.
//! A non-zero exit status is NOT an error at this layer: it is captured in
//! [`CommandOutput`] and classified by the caller.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// stdout followed by stderr, the way a terminal would have shown them
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Working directory does not exist: {}", dir.display())]
    MissingWorkingDirectory { dir: PathBuf },
    #[error("IO error running {command}: {message}")]
    Io { command: String, message: String },
}

/// Trait for executing external commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using tokio's process support
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError> {
        if !dir.is_dir() {
            return Err(CommandError::MissingWorkingDirectory {
                dir: dir.to_path_buf(),
            });
        }

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: program.to_string(),
                    }
                } else {
                    CommandError::Io {
                        command: program.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
