// Disbursement scheduler - runs the job at startup and then every interval
//
// - First run fires immediately
// - Runs never overlap: the next tick is only considered once the current
//   run has finished, and late ticks are delayed rather than bunched up
// - A failing or panicking run is logged and the schedule carries on

use std::{future::Future, sync::Arc};
use tokio::task::JoinError;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::execution::TransactionOutcome;
use crate::settlement::job::{DisbursementJob, DisbursementRun};

/// Disbursement schedule configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Time between two run starts
    pub interval: Duration,
}

impl ScheduleConfig {
    pub fn every_hours(hours: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(hours * 3600.0),
        }
    }
}

/// Summary of a scheduler lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub runs: u64,
    pub failed_runs: u64,
}

pub struct DisbursementScheduler {
    config: ScheduleConfig,
    job: Arc<DisbursementJob>,
}

impl DisbursementScheduler {
    pub fn new(config: ScheduleConfig, job: Arc<DisbursementJob>) -> Self {
        Self { config, job }
    }

    /// Run until `shutdown` resolves; a run in flight at shutdown is aborted
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = SchedulerStats::default();

        info!("⏰ Disbursement scheduled every {:?}", self.config.interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let job = self.job.clone();
            let mut handle = tokio::spawn(async move { job.run().await });
            let abort = handle.abort_handle();

            let joined = tokio::select! {
                _ = &mut shutdown => {
                    abort.abort();
                    warn!("Shutdown requested, aborting run in flight");
                    break;
                }
                joined = &mut handle => joined,
            };

            stats.runs += 1;
            if !Self::report(joined) {
                stats.failed_runs += 1;
            }
        }

        info!("Scheduler stopped after {} run(s)", stats.runs);
        stats
    }

    /// Log how a run ended; returns false when it did not complete
    fn report(joined: Result<AppResult<DisbursementRun>, JoinError>) -> bool {
        match joined {
            Ok(Ok(run)) => {
                match &run.outcome {
                    Some(TransactionOutcome::Success { hash }) => info!(
                        "✓ Disbursement run {} sent {} of {} XLM (tx {})",
                        run.run_id,
                        run.amount,
                        run.balance,
                        hash.as_deref().unwrap_or("unknown")
                    ),
                    Some(_) => info!("✓ Disbursement run {} completed with a failed transaction", run.run_id),
                    None => info!("✓ Disbursement run {} skipped, balance {}", run.run_id, run.balance),
                }
                true
            }
            Ok(Err(e)) => {
                error!("❌ An error occurred during the job: {}", e);
                false
            }
            Err(e) if e.is_panic() => {
                error!("❌ Disbursement run panicked: {}", e);
                false
            }
            Err(e) => {
                error!("❌ Disbursement run was cancelled: {}", e);
                false
            }
        }
    }
}
