//! Git command abstractions
//!
//! [`GitClient`] wraps whole `git` invocations against one fixed working
//! directory. Output is captured and failures are classified into
//! [`GitError`] instead of being printed.

use super::command::{CommandError, CommandExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub type BranchName = String;

/// Identity used for the throwaway commits of per-file mode.
const COMMIT_IDENTITY: [&str; 4] = [
    "-c",
    "user.name=style-guard",
    "-c",
    "user.email=style-guard@localhost",
];

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not found or not a git repository: {}", dir.display())]
    RepositoryNotFound { dir: PathBuf },
    #[error("Branch not found: {branch}")]
    BranchNotFound { branch: BranchName },
    #[error("Merge conflict detected: {output}")]
    MergeConflict { output: String },
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("git {command} failed with exit status {status}: {output}")]
    GitCommandFailed {
        command: String,
        status: i32,
        output: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct GitStatus {
    pub is_clean: bool,
    pub staged_files: Vec<String>,
    pub unstaged_files: Vec<String>,
    pub untracked_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Real Git implementation
pub struct GitClient {
    executor: Arc<dyn CommandExecutor>,
    dir: PathBuf,
}

impl GitClient {
    pub fn new(executor: Arc<dyn CommandExecutor>, dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            dir: dir.into(),
        }
    }

    /// Run git and return its raw stdout. Callers that need exact bytes
    /// (diffs) must not trim it.
    async fn execute_git_command(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.executor.execute(&self.dir, "git", args).await?;
        debug!(dir = %self.dir.display(), command = %args.join(" "), status = output.status_code, "git");

        if !output.success() {
            return Err(self.classify_git_error(output.status_code, &output.combined(), args));
        }

        Ok(output.stdout)
    }

    fn classify_git_error(&self, status: i32, output: &str, args: &[&str]) -> GitError {
        if output.contains("not a git repository") {
            GitError::RepositoryNotFound {
                dir: self.dir.clone(),
            }
        } else if args.first() == Some(&"checkout")
            && (output.contains("did not match any") || output.contains("invalid reference"))
        {
            GitError::BranchNotFound {
                branch: args.last().unwrap_or(&"unknown").to_string(),
            }
        } else if output.contains("CONFLICT") || output.contains("merge conflict") {
            GitError::MergeConflict {
                output: output.to_string(),
            }
        } else {
            GitError::GitCommandFailed {
                command: args.join(" "),
                status,
                output: output.to_string(),
            }
        }
    }

    fn parse_status_output(output: &str) -> GitStatus {
        let mut staged_files = Vec::new();
        let mut unstaged_files = Vec::new();
        let mut untracked_files = Vec::new();

        for line in output.lines() {
            if line.len() < 3 {
                continue;
            }

            let status_chars: Vec<char> = line.chars().take(2).collect();
            let filename = line[3..].to_string();

            match (status_chars[0], status_chars[1]) {
                ('?', '?') => untracked_files.push(filename),
                (' ', _) => unstaged_files.push(filename),
                (_, ' ') => staged_files.push(filename),
                _ => {
                    staged_files.push(filename.clone());
                    unstaged_files.push(filename);
                }
            }
        }

        let is_clean =
            staged_files.is_empty() && unstaged_files.is_empty() && untracked_files.is_empty();

        GitStatus {
            is_clean,
            staged_files,
            unstaged_files,
            untracked_files,
        }
    }

    /// True if the directory is inside a git working tree
    pub async fn is_repository(&self) -> bool {
        matches!(
            self.execute_git_command(&["rev-parse", "--is-inside-work-tree"]).await,
            Ok(out) if out.trim() == "true"
        )
    }

    /// `git status --porcelain`, optionally ignoring untracked files
    pub async fn status(&self, include_untracked: bool) -> Result<GitStatus, GitError> {
        let untracked = if include_untracked {
            "--untracked-files=all"
        } else {
            "--untracked-files=no"
        };
        let output = self
            .execute_git_command(&["status", "--porcelain", untracked])
            .await?;
        Ok(Self::parse_status_output(&output))
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        let reference = format!("refs/heads/{branch}");
        match self
            .execute_git_command(&["show-ref", "--verify", "--quiet", &reference])
            .await
        {
            Ok(_) => Ok(true),
            Err(GitError::GitCommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.execute_git_command(&["checkout", branch]).await?;
        Ok(())
    }

    /// `git checkout -b <branch> <start_point>`
    pub async fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<(), GitError> {
        self.execute_git_command(&["checkout", "-b", branch, start_point])
            .await?;
        Ok(())
    }

    pub async fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.execute_git_command(&["fetch", remote]).await?;
        Ok(())
    }

    /// Fetch a single refspec, e.g. `pull/42/head:pr-42`
    pub async fn fetch_refspec(&self, remote: &str, refspec: &str) -> Result<(), GitError> {
        self.execute_git_command(&["fetch", remote, refspec]).await?;
        Ok(())
    }

    pub async fn merge(&self, revision: &str) -> Result<(), GitError> {
        self.execute_git_command(&["merge", revision]).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError> {
        let flag = if force { "-D" } else { "-d" };
        self.execute_git_command(&["branch", flag, branch]).await?;
        Ok(())
    }

    /// Fetch remotes from `git remote -v`
    pub async fn remotes(&self) -> Result<Vec<Remote>, GitError> {
        let output = self.execute_git_command(&["remote", "-v"]).await?;
        Ok(output
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    [name, url, "(fetch)"] => Some(Remote {
                        name: name.to_string(),
                        url: url.to_string(),
                    }),
                    _ => None,
                }
            })
            .collect())
    }

    /// Added/modified files between `base` and `head` (three-dot range).
    /// NUL-separated so paths with spaces or non-ASCII names come back verbatim.
    pub async fn changed_files(&self, base: &str, head: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{base}...{head}");
        let output = self
            .execute_git_command(&["diff", "--name-only", "-z", "--diff-filter=AM", &range])
            .await?;
        Ok(output
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Full working tree diff against the last commit, untrimmed
    pub async fn diff_head(&self) -> Result<String, GitError> {
        self.execute_git_command(&["diff", "HEAD"]).await
    }

    pub async fn reset_hard(&self) -> Result<(), GitError> {
        self.execute_git_command(&["reset", "--hard", "HEAD"]).await?;
        Ok(())
    }

    /// Remove untracked files and directories
    pub async fn clean(&self) -> Result<(), GitError> {
        self.execute_git_command(&["clean", "-fd"]).await?;
        Ok(())
    }

    /// `git apply --index --check <patch>`; Ok(()) means the patch applies cleanly
    pub async fn apply_check(&self, patch: &Path) -> Result<(), GitError> {
        let patch = patch.to_string_lossy();
        self.execute_git_command(&["apply", "--index", "--check", &patch])
            .await?;
        Ok(())
    }

    pub async fn submodule_update(&self) -> Result<(), GitError> {
        self.execute_git_command(&["submodule", "update", "--init"])
            .await?;
        Ok(())
    }

    pub async fn init(&self) -> Result<(), GitError> {
        self.execute_git_command(&["init", "--quiet"]).await?;
        Ok(())
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.execute_git_command(&["config", key, value]).await?;
        Ok(())
    }

    /// Stage everything and commit it
    pub async fn commit_all(&self, message: &str) -> Result<(), GitError> {
        self.execute_git_command(&["add", "--all", "."]).await?;
        let mut args: Vec<&str> = COMMIT_IDENTITY.to_vec();
        args.extend(["commit", "--quiet", "--allow-empty", "-m", message]);
        self.execute_git_command(&args).await?;
        Ok(())
    }

    /// One-line summary of HEAD for logging
    pub async fn head_summary(&self) -> Result<String, GitError> {
        let output = self
            .execute_git_command(&["log", "--pretty=format:%h - %s", "-n", "1", "HEAD"])
            .await?;
        Ok(output.trim().to_string())
    }
}
