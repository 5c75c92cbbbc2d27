// src/pipeline/schedule.rs

//! Cycle scheduling.
//!
//! The next cycle starts one poll interval after the previous one
//! finished. Shutdown is only observed between cycles.

use std::future::Future;
use std::time::Duration;

use crate::models::Target;
use crate::pipeline::cycle::{CycleReport, CycleRunner};

/// Run exactly one cycle.
pub async fn run_once(runner: &CycleRunner<'_>, targets: &[Target]) -> CycleReport {
    runner.run_cycle(targets).await
}

/// Run cycles until Ctrl-C is received.
pub async fn run_forever(
    runner: &CycleRunner<'_>,
    targets: &[Target],
    interval: Duration,
) -> usize {
    run_until(runner, targets, interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run cycles until `shutdown` resolves, returning the number of cycles run.
pub async fn run_until<F>(
    runner: &CycleRunner<'_>,
    targets: &[Target],
    interval: Duration,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0;

    loop {
        runner.run_cycle(targets).await;
        cycles += 1;

        log::debug!("Next cycle in {}ms", interval.as_millis());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                log::info!("Shutdown requested, stopping after {} cycle(s)", cycles);
                return cycles;
            }
        }
    }
}
