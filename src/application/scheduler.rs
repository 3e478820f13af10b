use crate::application::cycle::{CycleOutcome, CycleRunner};
use crate::application::executor::ExecutionOutcome;
use crate::domain::errors::CycleError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    /// Terminal. Only reached through cancellation.
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: usize,
    pub failed: usize,
}

/// Runs cycles back to back with a fixed wait in between until cancelled.
///
/// A failed cycle is logged and counted; the loop carries on with the next one.
/// Cancellation interrupts the wait immediately but never a cycle in progress.
pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    interval: Duration,
    shutdown: CancellationToken,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, interval: Duration, shutdown: CancellationToken) -> Self {
        let (state, _) = watch::channel(SchedulerState::Running);
        Self {
            runner,
            interval,
            shutdown,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Single cycle, outcome logged. Used for `--once` and by `run`.
    pub async fn run_once(&self) -> Result<CycleOutcome, CycleError> {
        let result = self.runner.run_cycle().await;
        match &result {
            Ok(outcome) => log_outcome(outcome),
            Err(e) if e.requires_operator() => {
                error!("Scheduler: cycle failed, operator attention required: {}", e)
            }
            Err(e) => warn!("Scheduler: cycle skipped: {}", e),
        }
        result
    }

    pub async fn run(&self) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        info!(
            "Scheduler: started, rebalancing every {}s",
            self.interval.as_secs()
        );

        while !self.shutdown.is_cancelled() {
            match self.run_once().await {
                Ok(_) => report.completed += 1,
                Err(_) => report.failed += 1,
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!(
            "Scheduler: stopped after {} completed and {} failed cycles",
            report.completed, report.failed
        );
        report
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    let execution = match &outcome.execution {
        ExecutionOutcome::Submitted(confirmation) => {
            format!("order {} {}", confirmation.order_id, confirmation.status)
        }
        ExecutionOutcome::Skipped { reason } => format!("skipped ({})", reason),
        ExecutionOutcome::NoAction => "no order".to_string(),
    };
    info!(
        "Scheduler: cycle done. {} {} at p={:.4}, best AUC {:.4} from {} trials ({} degenerate), {}",
        outcome.decision.action,
        outcome.decision.ticker,
        outcome.decision.prediction_probability,
        outcome.best_score,
        outcome.trials,
        outcome.degenerate_trials,
        execution
    );
}
