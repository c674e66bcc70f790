use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::{task, time};

/// One unit of work the scheduler repeats. Runs on the blocking pool.
pub trait Cycle: Send + Sync + 'static {
    fn run(&self);
}

/// Drives a [`Cycle`] forever with a fixed delay between the end of one run and the
/// start of the next. Only one run is ever in flight.
pub struct Scheduler<C> {
    cycle: Arc<C>,
    interval: Duration,
    run_on_start: bool,
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: C, interval: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            interval,
            run_on_start: true,
        }
    }

    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    /// Runs until `shutdown` turns `true` or its sender is dropped, and returns the
    /// number of cycles executed. Shutdown is only observed between cycles.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut cycles = 0;

        if self.run_on_start && !*shutdown.borrow() {
            self.tick(&mut cycles).await;
        }

        info!(
            "Update loop started. Updating every {} seconds",
            self.interval.as_secs_f64()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            info!("Running update process");
            self.tick(&mut cycles).await;
        }

        info!("Update loop stopped after {cycles} cycle(s)");
        cycles
    }

    async fn tick(&self, cycles: &mut u64) {
        let cycle = Arc::clone(&self.cycle);
        if let Err(error) = task::spawn_blocking(move || cycle.run()).await {
            error!("update cycle aborted: {error}");
        }
        *cycles += 1;
    }
}
