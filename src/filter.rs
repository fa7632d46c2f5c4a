//! Decides which changed files the formatter is run on

use crate::config::FilterConfig;

/// Extension and directory whitelist, both compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    extensions: Vec<String>,
    directories: Vec<String>,
}

impl FileFilter {
    pub fn new<E, D>(extensions: E, directories: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            directories: directories
                .into_iter()
                .map(|dir| dir.as_ref().trim_end_matches('/').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.extensions, &config.directories)
    }

    /// Keep a path iff its extension and its leading directory are both
    /// whitelisted
    pub fn accepts(&self, path: &str) -> bool {
        let lower = path.to_lowercase();

        let extension_ok = lower
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.contains('/'))
            .is_some_and(|(_, ext)| self.extensions.iter().any(|e| e == ext));

        let directory_ok = self.directories.iter().any(|dir| {
            lower
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        });

        extension_ok && directory_ok
    }

    /// Order-preserving
    pub fn filter<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| self.accepts(path))
            .map(str::to_string)
            .collect()
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(
            ["cpp", "h"],
            ["examples", "addons", "apps", "libs/openframeworks"],
        )
    }
}
