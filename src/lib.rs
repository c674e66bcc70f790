//! Keeps a local checkout in sync with a remote git repository, running optional
//! hook scripts around every update.

pub mod daemon;

pub use daemon::config::load_config;
pub use daemon::cycle::{run_cycle, CycleReport, UpdateCycle};
pub use daemon::errors::{Result, UpdateError};
pub use daemon::repo_config::RepoCfg;
pub use daemon::scheduler::{Cycle, Scheduler};
