pub mod config;
pub mod cycle;
pub mod errors;
pub mod git_ops;
pub mod hooks;
pub mod repo_config;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
