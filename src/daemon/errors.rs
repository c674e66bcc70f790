use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpdateError>;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("config error: could not load config file '{path}' - {source}")]
    ConfigRead { path: String, source: std::io::Error },
    #[error("config error: {0}")]
    InvalidConfig(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not open repository at '{path}' - {source}")]
    OpenRepo { path: String, source: git2::Error },
    #[error("fetch from remote '{remote}' failed - {source}")]
    Transport { remote: String, source: git2::Error },
    #[error("clone of '{url}' failed - {source}")]
    Clone { url: String, source: git2::Error },
    #[error("cannot fast-forward '{branch}': local checkout has diverged from the remote")]
    NonFastForward { branch: String },
    #[error("local changes in '{path}' block the update - {source}")]
    DirtyWorktree { path: String, source: git2::Error },
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}
