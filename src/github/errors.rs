use octocrab::Error as OctocrabError;

#[derive(Debug)]
pub enum GitHubError {
    TokenNotFound(String),
    TokenScopeInsufficient {
        required_scopes: Vec<String>,
        current_error: String,
    },
    ApiError(OctocrabError),
    DownloadError(reqwest::Error),
    DecodeError(String),
    IoError(std::io::Error),
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        GitHubError::ApiError(err)
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        GitHubError::DownloadError(err)
    }
}

impl From<std::io::Error> for GitHubError {
    fn from(err: std::io::Error) -> Self {
        GitHubError::IoError(err)
    }
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubError::TokenNotFound(msg) => {
                writeln!(f, "GitHub Authentication Error")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔑 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → Check the credentials file named by `credentials_file`")?;
                write!(
                    f,
                    "   → Create token at: https://github.com/settings/tokens"
                )
            }
            GitHubError::TokenScopeInsufficient {
                required_scopes,
                current_error,
            } => {
                writeln!(f, "GitHub Token Scope Insufficient")?;
                writeln!(f, "──────────────────────────────")?;
                write!(f, "🔐 {current_error}\n\n")?;
                writeln!(f, "📋 REQUIRED TOKEN SCOPES:")?;
                for scope in required_scopes {
                    writeln!(f, "   ✓ {scope}")?;
                }
                write!(f, "   → Edit the token at https://github.com/settings/tokens")
            }
            GitHubError::ApiError(octocrab_err) => {
                writeln!(f, "GitHub API Error")?;
                writeln!(f, "────────────────")?;

                match octocrab_err {
                    octocrab::Error::GitHub { source, .. } => {
                        writeln!(f, "🌐 HTTP {}: {}", source.status_code, source.message)?;
                        match source.status_code.as_u16() {
                            401 => write!(f, "🔧 Token is invalid or expired"),
                            403 => write!(f, "🔧 Token lacks permissions, or the rate limit is exhausted"),
                            404 => write!(f, "🔧 Repository, pull request or file not found"),
                            422 => write!(f, "🔧 Request data was rejected (bad state or sha?)"),
                            _ => write!(f, "🔧 Check https://www.githubstatus.com"),
                        }
                    }
                    octocrab::Error::Http { .. } => {
                        write!(f, "🌐 Network connection failed to GitHub API: {octocrab_err}")
                    }
                    _ => write!(f, "🌐 {octocrab_err}"),
                }
            }
            GitHubError::DownloadError(err) => {
                writeln!(f, "GitHub Download Error")?;
                writeln!(f, "─────────────────────")?;
                match err.status() {
                    Some(status) => write!(f, "🌐 HTTP {status}: {err}"),
                    None => write!(f, "🌐 {err}"),
                }
            }
            GitHubError::DecodeError(msg) => {
                writeln!(f, "GitHub Response Error")?;
                writeln!(f, "─────────────────────")?;
                write!(f, "📦 {msg}")
            }
            GitHubError::IoError(io_err) => {
                writeln!(f, "File System Error")?;
                writeln!(f, "─────────────────")?;
                write!(f, "📁 {io_err}")
            }
        }
    }
}

impl std::error::Error for GitHubError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_error_lists_required_scopes() {
        let err = GitHubError::TokenScopeInsufficient {
            required_scopes: vec!["repo:status".into(), "gist".into()],
            current_error: "token `status` lacks scopes".into(),
        };
        let text = err.to_string();

        assert!(text.contains("✓ repo:status"));
        assert!(text.contains("✓ gist"));
    }
}
