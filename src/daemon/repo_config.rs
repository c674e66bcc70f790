use super::errors::{Result, UpdateError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_gitrepo() -> String { "https://github.com/tobychui/arozos".to_string() }
fn default_interval() -> u64 { 86400 /* 1 day in seconds */ }

#[derive(Debug, Clone, Deserialize)]
pub struct RepoCfg {
    /// Remote to clone from when no checkout exists
    #[serde(default = "default_gitrepo")]
    pub gitrepo: String,
    /// Local checkout path
    #[serde(default)]
    pub folder: PathBuf,
    /// Executable run before each sync (optional)
    #[serde(default, rename = "pre-script")]
    pub pre_script: Option<PathBuf>,
    /// Executable run after each sync (optional)
    #[serde(default, rename = "post-script")]
    pub post_script: Option<PathBuf>,
    /// Poll interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl RepoCfg {
    pub fn new(gitrepo: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            gitrepo: gitrepo.into(),
            folder: folder.into(),
            pre_script: None,
            post_script: None,
            interval: default_interval(),
        }
    }

    pub fn pre_script(&self) -> Option<&Path> {
        non_empty(self.pre_script.as_deref())
    }

    pub fn post_script(&self) -> Option<&Path> {
        non_empty(self.post_script.as_deref())
    }

    /// Rejects records the update loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.gitrepo.trim().is_empty() {
            return Err(UpdateError::InvalidConfig("'gitrepo' must not be empty".into()));
        }
        if self.folder.as_os_str().is_empty() {
            return Err(UpdateError::InvalidConfig("'folder' must be set".into()));
        }
        if self.interval == 0 {
            return Err(UpdateError::InvalidConfig(
                "'interval' must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
