//! Pull request change events
//!
//! A [`ChangeEvent`] is the immutable description of one pull request as
//! the hosting platform reported it. It deserializes directly from GitHub's
//! pull-request JSON, whether that arrives inside a webhook payload or from
//! the pulls API.

use serde::{Deserialize, Serialize};

/// Repository identity as advertised by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub full_name: String,
    #[serde(default)]
    pub git_url: String,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub html_url: String,
}

impl RepoIdentity {
    /// Every URL the repository can be addressed by, empty ones skipped
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        [
            self.git_url.as_str(),
            self.ssh_url.as_str(),
            self.clone_url.as_str(),
            self.html_url.as_str(),
        ]
        .into_iter()
        .filter(|url| !url.is_empty())
    }

    /// True if `url` names this repository, ignoring a trailing `.git` or `/`
    pub fn matches_url(&self, url: &str) -> bool {
        let wanted = normalize_url(url);
        self.urls().any(|candidate| normalize_url(candidate) == wanted)
    }
}

pub fn normalize_url(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}

/// One side of a pull request (base or head)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
    /// Absent when the head fork has been deleted
    pub repo: Option<RepoIdentity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

/// GitHub computes mergeability asynchronously, so `null` is a real answer:
/// "not known yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Mergeability {
    Mergeable,
    Conflicting,
    #[default]
    Unknown,
}

impl From<Option<bool>> for Mergeability {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Mergeability::Mergeable,
            Some(false) => Mergeability::Conflicting,
            None => Mergeability::Unknown,
        }
    }
}

impl From<Mergeability> for Option<bool> {
    fn from(value: Mergeability) -> Self {
        match value {
            Mergeability::Mergeable => Some(true),
            Mergeability::Conflicting => Some(false),
            Mergeability::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub html_url: String,
    pub state: PrState,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub mergeable: Mergeability,
    pub base: BranchRef,
    pub head: BranchRef,
}

/// Webhook envelope for `pull_request` events
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    action: Option<String>,
    pull_request: ChangeEvent,
}

impl ChangeEvent {
    /// Parse either a webhook envelope or a bare pull-request object
    pub fn from_payload(value: serde_json::Value) -> Result<(Self, Option<String>), serde_json::Error> {
        if value.get("pull_request").is_some() {
            let envelope: WebhookEnvelope = serde_json::from_value(value)?;
            Ok((envelope.pull_request, envelope.action))
        } else {
            Ok((serde_json::from_value(value)?, None))
        }
    }

    /// The base repository; a pull request always has one
    pub fn base_repo(&self) -> Option<&RepoIdentity> {
        self.base.repo.as_ref()
    }

    /// `owner/name` of the base repository, empty if the payload lacked it
    pub fn base_full_name(&self) -> &str {
        self.base
            .repo
            .as_ref()
            .map(|repo| repo.full_name.as_str())
            .unwrap_or_default()
    }

    /// Name of the disposable local branch the PR head is fetched into
    pub fn local_branch(&self) -> String {
        format!("pr-{}", self.number)
    }

    pub fn short_head_sha(&self) -> &str {
        let sha = self.head.sha.as_str();
        sha.get(..7).unwrap_or(sha)
    }
}
