use tracing::{info, warn};

use crate::coach::engine::{CycleEngine, CycleReport};
use crate::coach::persistence::DocumentStore;
use crate::coach::report::Dashboard;
use crate::config::Clock;
use crate::services::content::ContentService;
use crate::services::feed::Feed;
use crate::services::sink::{deliver_outbox, DeliveryDelays, DeliveryReport, Sink};
use crate::workers::WorkerError;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycle: CycleReport,
    pub delivery: DeliveryReport,
}

/// Load, run one cycle, deliver the outbox, save, refresh the dashboard.
pub struct PracticeRunner<F, C, S> {
    engine: CycleEngine<F, C>,
    sink: S,
    store: DocumentStore,
    dashboard: Dashboard,
    clock: Clock,
}

impl<F, C, S> PracticeRunner<F, C, S>
where
    F: Feed,
    C: ContentService,
    S: Sink,
{
    pub fn new(engine: CycleEngine<F, C>, sink: S, store: DocumentStore, dashboard: Dashboard, clock: Clock) -> Self {
        Self {
            engine,
            sink,
            store,
            dashboard,
            clock,
        }
    }

    pub fn engine(&self) -> &CycleEngine<F, C> {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub async fn run_once(&self) -> Result<RunSummary, WorkerError> {
        let documents = self.store.load().await?;
        let now = self.clock.now();
        let outcome = self.engine.run_cycle(documents, now.date_naive()).await?;

        let config = self.engine.config();
        let delays = DeliveryDelays::from_millis(config.send_delay_ms, config.answer_sheet_delay_ms);
        let delivery = deliver_outbox(&self.sink, &outcome.outbox, delays).await;

        self.store.save(&outcome.documents).await?;

        if let Err(e) = self
            .dashboard
            .write(&outcome.documents.state, config, &outcome.transcript, now)
            .await
        {
            warn!(error = %e, "dashboard not updated");
        }

        info!(
            sent = delivery.sent,
            failed = delivery.failed,
            watermark = outcome.report.watermark_after,
            "practice run complete"
        );
        Ok(RunSummary {
            cycle: outcome.report,
            delivery,
        })
    }
}
