use autopull::daemon::git_ops::probe_remote;
use autopull::{load_config, run_cycle, Scheduler, UpdateCycle};
use clap::{ArgAction, Parser};
use log::{error, info};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task;

/// Keeps a folder in sync with a remote git repository.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to config JSON (a `.toml` file is read as TOML)
    #[arg(short, long, default_value = "./config.json")]
    config: String,
    /// Run an update as soon as the agent starts
    #[arg(short = 'b', long, default_value_t = true, action = ArgAction::Set)]
    update_on_boot: bool,
    /// Run a single update cycle and exit
    #[arg(long)]
    once: bool,
    /// Check that the configured remote is reachable and exit
    #[arg(long, conflicts_with = "once")]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    let cfg = Arc::new(load_config(&args.config)?);
    info!(
        "Starting autopull: {} -> {}",
        cfg.gitrepo,
        cfg.folder.display()
    );

    if args.check {
        let url = cfg.gitrepo.clone();
        match task::spawn_blocking(move || probe_remote(&url)).await?? {
            Some(head) => info!("Remote {} is reachable, HEAD at {head}", cfg.gitrepo),
            None => info!("Remote {} is reachable but advertises no HEAD", cfg.gitrepo),
        }
        return Ok(());
    }

    if args.once {
        let cfg = Arc::clone(&cfg);
        task::spawn_blocking(move || run_cycle(&cfg)).await?;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested, finishing the current cycle");
        let _ = shutdown_tx.send(true);
    });

    let cycles = Scheduler::new(
        UpdateCycle::new(Arc::clone(&cfg)),
        Duration::from_secs(cfg.interval),
    )
    .run_on_start(args.update_on_boot)
    .run(shutdown_rx)
    .await;

    info!("Exiting after {cycles} update cycle(s)");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(err) => error!("could not listen for SIGTERM: {err}"),
        }
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the loop runs until the process is killed.
        error!("ctrl-c handler failed: {err}");
        std::future::pending::<()>().await;
    }
}
