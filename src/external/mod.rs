//! External tool abstractions
//!
//! Trait-based wrappers around the programs the pipeline shells out to:
//! git and the style formatter. Both run through a [`CommandExecutor`] so
//! the pipeline can be exercised without touching real processes.

pub mod command;
pub mod formatter;
pub mod git;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use formatter::{FormatReport, Formatter};
pub use git::{GitClient, GitError, GitStatus, Remote};
