pub mod practice_cycle;

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::coach::engine::CycleError;
use crate::coach::persistence::StoreError;
use crate::services::content::ContentService;
use crate::services::feed::Feed;
use crate::services::sink::Sink;

pub use practice_cycle::{PracticeRunner, RunSummary};

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: watch::Sender<bool>,
    /// Held for the duration of a run; overlapping ticks are skipped
    run_lock: Arc<Mutex<()>>,
}

impl WorkerManager {
    pub async fn new() -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            run_lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn start<F, C, S>(&self, runner: Arc<PracticeRunner<F, C, S>>, schedule: &str) -> Result<(), WorkerError>
    where
        F: Feed + 'static,
        C: ContentService + 'static,
        S: Sink + 'static,
    {
        let scheduler = self.scheduler.lock().await;
        let shutdown_rx = self.shutdown_tx.subscribe();
        let run_lock = Arc::clone(&self.run_lock);

        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let runner = Arc::clone(&runner);
            let run_lock = Arc::clone(&run_lock);
            let shutdown_rx = shutdown_rx.clone();
            Box::pin(async move {
                if let Some(Err(e)) = guarded_run(&runner, run_lock, &shutdown_rx).await {
                    error!(error = %e, "practice run failed");
                }
            })
        })
        .map_err(WorkerError::Scheduler)?;
        scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
        scheduler.start().await.map_err(WorkerError::Scheduler)?;

        info!(schedule, "practice worker scheduled");
        Ok(())
    }

    /// Run one cycle outside the schedule, under the same lock and shutdown flag.
    pub async fn run_now<F, C, S>(&self, runner: &PracticeRunner<F, C, S>) -> Option<Result<RunSummary, WorkerError>>
    where
        F: Feed,
        C: ContentService,
        S: Sink,
    {
        guarded_run(runner, Arc::clone(&self.run_lock), &self.shutdown_tx.subscribe()).await
    }

    /// Refuse new runs, then wait for an in-flight run to finish saving.
    pub async fn stop(&self) {
        info!("Stopping workers...");
        self.shutdown_tx.send_replace(true);
        let _idle = self.run_lock.lock().await;

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }
        info!("Workers stopped");
    }
}

/// `None` when the run was skipped: another run holds the lock or shutdown began.
async fn guarded_run<F, C, S>(
    runner: &PracticeRunner<F, C, S>,
    run_lock: Arc<Mutex<()>>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Option<Result<RunSummary, WorkerError>>
where
    F: Feed,
    C: ContentService,
    S: Sink,
{
    if *shutdown_rx.borrow() {
        info!("shutdown in progress, practice run skipped");
        return None;
    }
    let Ok(_guard) = run_lock.try_lock_owned() else {
        warn!("previous practice run still in progress, tick skipped");
        return None;
    };
    // a started cycle always runs through delivery and save
    Some(runner.run_once().await)
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),
}
