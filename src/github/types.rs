use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a file changed in a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Other,
}

impl FileStatus {
    /// Only files that exist with new content at the head are checked
    pub fn has_new_content(self) -> bool {
        matches!(self, FileStatus::Added | FileStatus::Modified)
    }
}

/// One entry of `GET /repos/{owner}/{repo}/pulls/{n}/files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    #[serde(default)]
    pub raw_url: Option<String>,
}

/// Response of the repository contents API
#[derive(Debug, Clone, Deserialize)]
pub struct FileContents {
    pub content: String,
    pub encoding: String,
}

/// Commit status state (GitHub's four values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
    Error,
    Pending,
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StatusState::Success => "success",
            StatusState::Failure => "failure",
            StatusState::Error => "error",
            StatusState::Pending => "pending",
        };
        f.write_str(text)
    }
}

/// Body of `POST /repos/{owner}/{repo}/statuses/{sha}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: StatusState,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistFile {
    pub content: String,
}

/// Body of `POST /gists`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGist {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PageParams {
    pub per_page: u8,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefParams<'a> {
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
}
