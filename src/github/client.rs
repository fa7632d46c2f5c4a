use super::errors::GitHubError;
use super::types::{
    AuthenticatedUser, ChangedFile, CommitStatus, FileContents, Gist, NewGist, PageParams,
    RefParams,
};
use crate::event::ChangeEvent;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use octocrab::Octocrab;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

const FILES_PER_PAGE: u8 = 100;
const USER_AGENT: &str = concat!("style-guard/", env!("CARGO_PKG_VERSION"));

/// The hosting platform calls the pipeline makes
///
/// Repository arguments are `owner/name` full names.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Fetch pull-request metadata by number
    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<ChangeEvent, GitHubError>;

    /// Every file the pull request touches, across all pages
    async fn list_pull_request_files(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, GitHubError>;

    /// Raw content of a file at a commit, via its `raw_url`
    async fn download_raw(&self, url: &str) -> Result<Vec<u8>, GitHubError>;

    /// File content through the repository contents API
    async fn get_file_contents(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, GitHubError>;

    async fn create_status(
        &self,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), GitHubError>;

    /// Create a gist and return its public URL
    async fn create_gist(&self, gist: &NewGist) -> Result<String, GitHubError>;

    /// Login of the token's owner; fails on a bad token
    async fn authenticated_user(&self) -> Result<String, GitHubError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self, GitHubError> {
        Self::build(token, None)
    }

    /// Client against a different API root (GitHub Enterprise, test servers)
    pub fn with_base_uri(token: String, base_uri: &str) -> Result<Self, GitHubError> {
        Self::build(token, Some(base_uri))
    }

    fn build(token: String, base_uri: Option<&str>) -> Result<Self, GitHubError> {
        let mut builder = Octocrab::builder().personal_token(token.clone());
        if let Some(uri) = base_uri {
            builder = builder.base_uri(uri)?;
        }
        let octocrab = builder.build()?;

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(GitHubClient {
            octocrab,
            http,
            token,
        })
    }

    fn decode_contents(contents: FileContents) -> Result<Vec<u8>, GitHubError> {
        match contents.encoding.as_str() {
            "base64" => general_purpose::STANDARD
                .decode(contents.content.replace('\n', ""))
                .map_err(|e| GitHubError::DecodeError(format!("invalid base64 content: {e}"))),
            "" | "utf-8" => Ok(contents.content.into_bytes()),
            other => Err(GitHubError::DecodeError(format!(
                "unsupported content encoding '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl HostingPlatform for GitHubClient {
    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<ChangeEvent, GitHubError> {
        let route = format!("/repos/{repo}/pulls/{number}");
        let pr: ChangeEvent = self.octocrab.get(route, None::<&()>).await?;
        Ok(pr)
    }

    async fn list_pull_request_files(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, GitHubError> {
        let route = format!("/repos/{repo}/pulls/{number}/files");
        let mut files = Vec::new();
        let mut page = 1;

        loop {
            let params = PageParams {
                per_page: FILES_PER_PAGE,
                page,
            };
            let batch: Vec<ChangedFile> = self.octocrab.get(&route, Some(&params)).await?;
            let done = batch.len() < FILES_PER_PAGE as usize;
            files.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        debug!(repo, number, count = files.len(), "listed pull request files");
        Ok(files)
    }

    async fn download_raw(&self, url: &str) -> Result<Vec<u8>, GitHubError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_file_contents(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, GitHubError> {
        let route = format!("/repos/{repo}/contents/{path}");
        let contents: FileContents = self
            .octocrab
            .get(route, Some(&RefParams { git_ref }))
            .await?;
        Self::decode_contents(contents)
    }

    async fn create_status(
        &self,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), GitHubError> {
        let route = format!("/repos/{repo}/statuses/{sha}");
        let _created: serde_json::Value = self.octocrab.post(route, Some(status)).await?;
        info!(repo, sha, state = %status.state, "created commit status");
        Ok(())
    }

    async fn create_gist(&self, gist: &NewGist) -> Result<String, GitHubError> {
        let created: Gist = self.octocrab.post("/gists", Some(gist)).await?;
        info!(url = %created.html_url, "created gist");
        Ok(created.html_url)
    }

    async fn authenticated_user(&self) -> Result<String, GitHubError> {
        let user: AuthenticatedUser = self.octocrab.get("/user", None::<&()>).await?;
        Ok(user.login)
    }
}
