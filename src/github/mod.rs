pub mod client;
pub mod errors;
pub mod retry;
pub mod types;

pub use client::{GitHubClient, HostingPlatform};
pub use errors::GitHubError;
pub use retry::RetryConfig;
pub use types::{ChangedFile, CommitStatus, FileStatus, NewGist, StatusState};
