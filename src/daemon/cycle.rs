use super::git_ops::{self, SyncOutcome, SyncReport};
use super::hooks::{run_hook, HookResult, HookStage};
use super::repo_config::RepoCfg;
use super::scheduler::Cycle;
use log::{error, info};
use std::sync::Arc;

/// What happened in each stage of one update cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub pre: HookResult,
    pub sync: SyncReport,
    pub post: HookResult,
}

/// Runs pre-script, sync and post-script in that order.
///
/// Every stage runs regardless of how the previous one ended; failures only show up
/// in the logs and in the returned report.
pub fn run_cycle(cfg: &RepoCfg) -> CycleReport {
    let pre = run_hook(HookStage::Pre, cfg.pre_script());

    let sync = git_ops::sync(cfg);
    match &sync.result {
        Ok(SyncOutcome::Cloned { .. }) => {
            info!("Clone completed. Waiting for another update cycle...")
        }
        Ok(SyncOutcome::UpToDate { .. }) => info!("Already up to date"),
        Ok(SyncOutcome::FastForwarded { commits, .. }) => {
            info!("Pulled {commits} new commit(s)")
        }
        Err(err) => {
            error!("*ERROR* git {} failed: {err}", sync.action);
            error!("Waiting next update cycle...");
        }
    }

    let post = run_hook(HookStage::Post, cfg.post_script());

    CycleReport { pre, sync, post }
}

/// The update cycle bound to its configuration, as driven by the scheduler.
pub struct UpdateCycle {
    cfg: Arc<RepoCfg>,
}

impl UpdateCycle {
    pub fn new(cfg: Arc<RepoCfg>) -> Self {
        Self { cfg }
    }
}

impl Cycle for UpdateCycle {
    fn run(&self) {
        run_cycle(&self.cfg);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::daemon::git_ops::SyncAction;
    use crate::daemon::hooks::tests::write_script;
    use crate::daemon::test_support::{init_origin, url_of};
    use tempfile::TempDir;

    #[test]
    fn skipped_pre_script_still_syncs() {
        let dir = TempDir::new().unwrap();
        init_origin(&dir.path().join("origin"));
        let mut cfg = RepoCfg::new(url_of(&dir.path().join("origin")), dir.path().join("app"));
        cfg.pre_script = Some("".into());

        let report = run_cycle(&cfg);
        assert!(!report.pre.ran);
        assert_eq!(report.sync.action, SyncAction::Clone);
        assert!(report.sync.succeeded());
        assert!(dir.path().join("app/.git").exists());
    }

    #[test]
    fn failing_pre_script_does_not_block_sync_or_post() {
        let dir = TempDir::new().unwrap();
        init_origin(&dir.path().join("origin"));
        let marker = dir.path().join("post-ran");
        let mut cfg = RepoCfg::new(url_of(&dir.path().join("origin")), dir.path().join("app"));
        cfg.pre_script = Some(write_script(dir.path(), "pre.sh", "exit 1"));
        cfg.post_script = Some(write_script(
            dir.path(),
            "post.sh",
            &format!("touch '{}'", marker.display()),
        ));

        let report = run_cycle(&cfg);
        assert!(report.pre.ran);
        assert!(!report.pre.succeeded);
        assert!(report.sync.succeeded());
        assert!(report.post.ran && report.post.succeeded);
        assert!(marker.exists());
    }

    #[test]
    fn sync_failure_does_not_block_post() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("post-ran");
        let mut cfg = RepoCfg::new(url_of(&dir.path().join("unreachable")), dir.path().join("app"));
        cfg.post_script = Some(write_script(
            dir.path(),
            "post.sh",
            &format!("touch '{}'", marker.display()),
        ));

        let report = run_cycle(&cfg);
        assert_eq!(report.sync.action, SyncAction::Clone);
        assert!(!report.sync.succeeded());
        assert!(report.sync.error_detail().is_some());
        assert!(report.post.succeeded);
        assert!(marker.exists());
    }

    #[test]
    fn second_cycle_pulls_without_error() {
        let dir = TempDir::new().unwrap();
        init_origin(&dir.path().join("origin"));
        let cfg = RepoCfg::new(url_of(&dir.path().join("origin")), dir.path().join("app"));

        assert_eq!(run_cycle(&cfg).sync.action, SyncAction::Clone);
        for _ in 0..2 {
            let report = run_cycle(&cfg);
            assert_eq!(report.sync.action, SyncAction::Pull);
            assert!(matches!(report.sync.result, Ok(SyncOutcome::UpToDate { .. })));
        }
    }
}
