//! Shared integration test support: a scripted hosting platform and
//! helpers for building real git repositories in temporary directories
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use style_guard::github::types::GistFile;
use style_guard::github::{ChangedFile, CommitStatus, FileStatus, NewGist};
use style_guard::{ChangeEvent, GitHubError, HostingPlatform, StyleGuardConfig};
use tempfile::TempDir;

pub const REPO: &str = "openframeworks/openFrameworks";
pub const REPO_URL: &str = "git://github.com/openframeworks/openFrameworks.git";
pub const BASE_SHA: &str = "1111111111111111111111111111111111111111";
pub const HEAD_SHA: &str = "abcdef0123456789abcdef0123456789abcdef01";

/// Applies the sed script in `openFrameworks_style.cfg` (found in the
/// working directory, i.e. the styler directory) to the file in place
pub const STYLER_SCRIPT: &str = "#!/bin/sh\n\
sed -f openFrameworks_style.cfg \"$1\" > \"$1.styled\" && mv \"$1.styled\" \"$1\"\n";

/// Style rule: spaces around `=`
pub const SPACING_RULE: &str = "s/\\([a-z]\\)=\\([0-9]\\)/\\1 = \\2/g\n";

/// Hosting platform double with canned answers; records every write
#[derive(Default)]
pub struct FakePlatform {
    pub pulls: Mutex<HashMap<u64, ChangeEvent>>,
    pub files: Mutex<HashMap<u64, Vec<ChangedFile>>>,
    pub raw: Mutex<HashMap<String, Vec<u8>>>,
    /// Keyed by (path, ref)
    pub contents: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub content_requests: Mutex<Vec<(String, String)>>,
    pub statuses: Mutex<Vec<(String, CommitStatus)>>,
    pub gists: Mutex<Vec<NewGist>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    /// Serve the formatter files at `git_ref`
    pub fn serve_styler(&self, git_ref: &str, rules: &str) {
        let mut contents = self.contents.lock().unwrap();
        for (path, body) in [
            ("scripts/dev/style/ofStyler", STYLER_SCRIPT),
            ("scripts/dev/style/openFrameworks_style.cfg", rules),
            ("scripts/dev/style/core_header.txt", "/* header */\n"),
        ] {
            contents.insert((path.to_string(), git_ref.to_string()), body.as_bytes().to_vec());
        }
    }

    /// Add a changed file whose head content is served at its raw URL
    pub fn add_changed_file(&self, pr: u64, filename: &str, status: FileStatus, content: &str) {
        let url = format!("https://raw.test/pr-{pr}/{HEAD_SHA}/{filename}");
        self.raw
            .lock()
            .unwrap()
            .insert(url.clone(), content.as_bytes().to_vec());
        self.files
            .lock()
            .unwrap()
            .entry(pr)
            .or_default()
            .push(ChangedFile {
                filename: filename.to_string(),
                status,
                raw_url: Some(url),
            });
    }

    pub fn statuses(&self) -> Vec<CommitStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(_, status)| status.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(what: &str) -> GitHubError {
    GitHubError::DecodeError(format!("fake platform has no {what}"))
}

#[async_trait]
impl HostingPlatform for FakePlatform {
    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<ChangeEvent, GitHubError> {
        self.record(format!("get_pull_request {repo} {number}"));
        self.pulls
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| not_found("pull request"))
    }

    async fn list_pull_request_files(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, GitHubError> {
        self.record(format!("list_pull_request_files {repo} {number}"));
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn download_raw(&self, url: &str) -> Result<Vec<u8>, GitHubError> {
        self.record(format!("download_raw {url}"));
        self.raw
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| not_found(url))
    }

    async fn get_file_contents(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, GitHubError> {
        self.record(format!("get_file_contents {repo} {path} {git_ref}"));
        self.content_requests
            .lock()
            .unwrap()
            .push((path.to_string(), git_ref.to_string()));
        self.contents
            .lock()
            .unwrap()
            .get(&(path.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn create_status(
        &self,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), GitHubError> {
        self.record(format!("create_status {repo} {sha} {}", status.state));
        self.statuses
            .lock()
            .unwrap()
            .push((sha.to_string(), status.clone()));
        Ok(())
    }

    async fn create_gist(&self, gist: &NewGist) -> Result<String, GitHubError> {
        self.record("create_gist".to_string());
        let mut gists = self.gists.lock().unwrap();
        gists.push(gist.clone());
        Ok(format!("https://gist.test/{}", gists.len()))
    }

    async fn authenticated_user(&self) -> Result<String, GitHubError> {
        Ok("style-bot".to_string())
    }
}

/// Pull request JSON as GitHub sends it
pub fn pull_request(number: u64, base_ref: &str, extra_base_url: &str) -> ChangeEvent {
    let payload = json!({
        "number": number,
        "title": "Tidy example",
        "html_url": format!("https://github.com/{REPO}/pull/{number}"),
        "state": "open",
        "merged": false,
        "mergeable": true,
        "base": {
            "ref": base_ref,
            "sha": BASE_SHA,
            "repo": {
                "full_name": REPO,
                "git_url": REPO_URL,
                "ssh_url": "git@github.com:openframeworks/openFrameworks.git",
                "clone_url": extra_base_url,
                "html_url": format!("https://github.com/{REPO}")
            }
        },
        "head": {
            "ref": "feature",
            "sha": HEAD_SHA,
            "repo": null
        }
    });
    ChangeEvent::from_payload(payload).unwrap().0
}

/// Temporary data directory plus configuration pointing at it
pub struct Harness {
    pub root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.data_dir().join("repo")
    }

    pub fn config(&self, mode: &str) -> StyleGuardConfig {
        let mut config = StyleGuardConfig::default();
        config.storage.data_dir = self.data_dir().to_string_lossy().into_owned();
        config.storage.repo_dir = "repo".to_string();
        config.retrieval_mode = mode.to_string();
        config.mergeability.attempts = 1;
        config.mergeability.initial_delay_ms = 10;
        config
    }
}

/// Run git in `dir`, panicking with its output on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A repository whose `master` holds `files`, with HEAD on master
pub fn init_repo(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    for (path, content) in files {
        write_file(dir, path, content);
    }
    git(dir, &["add", "--all"]);
    git(dir, &["commit", "--quiet", "-m", "initial"]);
}

pub fn gist_file<'a>(gist: &'a NewGist, name: &str) -> &'a GistFile {
    &gist.files[name]
}
