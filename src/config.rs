use crate::errors::PipelineError;
use crate::github::{GitHubError, RetryConfig};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "style-guard.toml";

/// Scopes the `status` token needs: commit statuses and gists
pub const REQUIRED_SCOPES: [&str; 2] = ["repo:status", "gist"];

/// Main configuration structure for style-guard
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StyleGuardConfig {
    pub repository: RepositoryConfig,
    pub storage: StorageConfig,
    /// `mirror` (long-lived clone) or `per-file` (fetch changed files only)
    pub retrieval_mode: String,
    /// `status` (commit status API) or `comment` (not implemented)
    pub feedback_mode: String,
    /// Verify only, never publish anything
    pub suppress_feedback: bool,
    /// Addresses webhook deliveries are accepted from
    pub trusted_origins: Vec<String>,
    /// JSON file with named tokens, relative to `storage.data_dir`
    pub credentials_file: String,
    pub logging: LoggingConfig,
    pub mergeability: MergeabilityConfig,
    pub formatter: FormatterConfig,
    pub filter: FilterConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Canonical URL of the repository whose PRs are checked
    pub url: String,
    /// Branch the mirror rests on between jobs
    pub idle_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub repo_dir: String,
    pub styler_dir: String,
    pub patches_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// trace/debug/info/warn/error
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeabilityConfig {
    pub attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormatterConfig {
    /// File name of the formatter inside the styler directory
    pub executable: String,
    /// Repository paths of the formatter and its config files
    pub support_files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    pub extensions: Vec<String>,
    pub directories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackConfig {
    pub status_context: String,
    /// Path of the usage-note template shipped with a patch (`{pr_number}`
    /// and `{pr_url}` are filled in); built-in if unset
    pub usage_note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Mirror,
    PerFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    Status,
}

impl Default for StyleGuardConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig {
                url: "git://github.com/openframeworks/openFrameworks.git".to_string(),
                idle_branch: "master".to_string(),
            },
            storage: StorageConfig {
                data_dir: "data".to_string(),
                repo_dir: "openFrameworks_files".to_string(),
                styler_dir: "styler".to_string(),
                patches_dir: "patches".to_string(),
            },
            retrieval_mode: "per-file".to_string(),
            feedback_mode: "status".to_string(),
            suppress_feedback: false,
            trusted_origins: vec!["127.0.0.1".to_string()],
            credentials_file: "auths.json".to_string(),
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            mergeability: MergeabilityConfig {
                attempts: 3,
                initial_delay_ms: 5_000,
                max_delay_ms: 30_000,
            },
            formatter: FormatterConfig {
                executable: "ofStyler".to_string(),
                support_files: vec![
                    "scripts/dev/style/ofStyler".to_string(),
                    "scripts/dev/style/openFrameworks_style.cfg".to_string(),
                    "scripts/dev/style/core_header.txt".to_string(),
                ],
            },
            filter: FilterConfig {
                extensions: vec!["cpp".to_string(), "h".to_string()],
                directories: vec![
                    "examples".to_string(),
                    "addons".to_string(),
                    "apps".to_string(),
                    "libs/openframeworks".to_string(),
                ],
            },
            feedback: FeedbackConfig {
                status_context: "style-guard".to_string(),
                usage_note: None,
            },
        }
    }
}

impl StyleGuardConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`style-guard.toml` or `path`)
    /// 3. Environment variables (prefixed with STYLE_GUARD_, nested keys
    ///    joined with `__`)
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        Self::load_env_file();

        let defaults = Config::try_from(&StyleGuardConfig::default()).map_err(config_error)?;
        let mut builder = Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("STYLE_GUARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error)?;
        config.try_deserialize().map_err(config_error)
    }

    /// Load .env file if it exists
    fn load_env_file() {
        if Path::new(".env").exists() && dotenvy::dotenv().is_ok() {
            tracing::debug!("Loaded environment variables from .env file");
        }
    }

    /// Check every option that can only be judged as a whole. Called once at
    /// startup; anything wrong here must stop the process.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.retrieval_mode()?;
        self.feedback_mode()?;
        self.repository_slug()?;
        self.trusted_origins()?;
        if self.filter.extensions.is_empty() || self.filter.directories.is_empty() {
            return Err(PipelineError::Configuration(
                "filter.extensions and filter.directories must not be empty".to_string(),
            ));
        }
        if !self
            .formatter
            .support_files
            .iter()
            .any(|path| file_name(path) == self.formatter.executable)
        {
            return Err(PipelineError::Configuration(format!(
                "formatter.support_files must include the executable '{}'",
                self.formatter.executable
            )));
        }
        self.usage_note_template()?;
        Ok(())
    }

    pub fn retrieval_mode(&self) -> Result<RetrievalMode, PipelineError> {
        match self.retrieval_mode.as_str() {
            "mirror" | "git" => Ok(RetrievalMode::Mirror),
            "per-file" | "file" => Ok(RetrievalMode::PerFile),
            other => Err(PipelineError::Configuration(format!(
                "unknown retrieval mode '{other}' (expected 'mirror' or 'per-file')"
            ))),
        }
    }

    pub fn feedback_mode(&self) -> Result<FeedbackMode, PipelineError> {
        match self.feedback_mode.as_str() {
            "status" => Ok(FeedbackMode::Status),
            "comment" => Err(PipelineError::Configuration(
                "feedback mode 'comment' is not implemented".to_string(),
            )),
            other => Err(PipelineError::Configuration(format!(
                "unknown feedback mode '{other}'"
            ))),
        }
    }

    /// `owner/name` derived from the canonical repository URL
    pub fn repository_slug(&self) -> Result<String, PipelineError> {
        let url = crate::event::normalize_url(&self.repository.url);
        url.split_once("github.com/")
            .or_else(|| url.split_once("github.com:"))
            .map(|(_, slug)| slug.to_string())
            .filter(|slug| slug.split('/').filter(|part| !part.is_empty()).count() == 2)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "repository.url '{}' is not a GitHub repository URL",
                    self.repository.url
                ))
            })
    }

    pub fn trusted_origins(&self) -> Result<Vec<IpAddr>, PipelineError> {
        self.trusted_origins
            .iter()
            .map(|origin| {
                origin.parse().map_err(|_| {
                    PipelineError::Configuration(format!("invalid trusted origin '{origin}'"))
                })
            })
            .collect()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.mergeability.attempts,
            base_delay: Duration::from_millis(self.mergeability.initial_delay_ms),
            max_delay: Duration::from_millis(self.mergeability.max_delay_ms),
        }
    }

    /// Absolute data directory; relative values resolve against the
    /// current working directory
    pub fn data_dir(&self) -> PathBuf {
        absolute(Path::new(&self.storage.data_dir))
    }

    fn under_data_dir(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.under_data_dir(&self.storage.repo_dir)
    }

    pub fn styler_dir(&self) -> PathBuf {
        self.under_data_dir(&self.storage.styler_dir)
    }

    pub fn patches_dir(&self) -> PathBuf {
        self.under_data_dir(&self.storage.patches_dir)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.under_data_dir(&self.credentials_file)
    }

    /// Contents of the configured usage-note template, if one is set.
    /// Relative paths resolve under `data_dir`.
    pub fn usage_note_template(&self) -> Result<Option<String>, PipelineError> {
        let Some(note) = self.feedback.usage_note.as_deref() else {
            return Ok(None);
        };
        let path = self.under_data_dir(note);
        std::fs::read_to_string(&path).map(Some).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read feedback.usage_note template {}: {e}",
                path.display()
            ))
        })
    }

    /// Diagnostic snapshot of the last received event
    pub fn last_payload_path(&self) -> PathBuf {
        self.data_dir().join("last_payload.json")
    }

    pub fn to_toml(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Configuration(e.to_string()))
    }
}

fn config_error(err: config::ConfigError) -> PipelineError {
    PipelineError::Configuration(err.to_string())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// One named token in the credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Name of the credentials entry used for status feedback
pub const STATUS_CREDENTIAL: &str = "status";

impl Credential {
    /// Read the `status` entry and check it declares the required scopes
    pub fn load_status(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read credentials file {}: {e}",
                path.display()
            ))
        })?;
        let mut entries: HashMap<String, Credential> = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Configuration(format!("invalid credentials file: {e}")))?;

        let credential = entries.remove(STATUS_CREDENTIAL).ok_or_else(|| {
            credential_error(GitHubError::TokenNotFound(format!(
                "credentials file {} has no '{STATUS_CREDENTIAL}' entry",
                path.display()
            )))
        })?;

        if credential.token.trim().is_empty() {
            return Err(credential_error(GitHubError::TokenNotFound(format!(
                "credential '{STATUS_CREDENTIAL}' has an empty token"
            ))));
        }

        let missing: Vec<&str> = REQUIRED_SCOPES
            .iter()
            .copied()
            .filter(|scope| !credential.scopes.iter().any(|s| s == scope))
            .collect();
        if !missing.is_empty() {
            return Err(credential_error(GitHubError::TokenScopeInsufficient {
                required_scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
                current_error: format!(
                    "credential '{STATUS_CREDENTIAL}' lacks scopes: {}",
                    missing.join(", ")
                ),
            }));
        }

        Ok(credential)
    }
}

/// Credential problems stop the process; the GitHub error text carries the
/// operator hints
pub fn credential_error(err: GitHubError) -> PipelineError {
    PipelineError::Configuration(err.to_string())
}
