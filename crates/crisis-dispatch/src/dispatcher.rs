//! Dispatcher
//!
//! Owns one lane per queue class and routes each submitted unit to the lane
//! of its stage. Must be started inside a tokio runtime.

use crate::config::{PipelineConfig, QueueClass};
use crate::error::PipelineError;
use crate::executor::{DefaultStageExecutor, StageExecutor};
use crate::ledger::{CompletionLedger, UnitOutcome};
use crate::pool::{DispatcherStats, Envelope, Lane, Shared};
use crate::unit::{Stage, UnitId, WorkUnit};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Handle to a submitted unit's outcome
#[derive(Debug)]
pub struct Receipt {
    /// Submitted unit
    pub unit_id: UnitId,
    /// Unit stage
    pub stage: Stage,
    /// Queue it was routed to
    pub queue: QueueClass,
    rx: oneshot::Receiver<UnitOutcome>,
}

impl Receipt {
    /// Wait for the unit to resolve
    ///
    /// # Errors
    /// The unit's terminal error, or `Cancelled` if it was dropped.
    pub async fn wait(self) -> UnitOutcome {
        self.rx.await.unwrap_or(Err(PipelineError::Cancelled))
    }
}

/// Queue router and worker-slot owner
pub struct Dispatcher {
    config: PipelineConfig,
    lanes: BTreeMap<QueueClass, Lane>,
    shared: Arc<Shared>,
    slots: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Validate config and spawn every queue's slots
    ///
    /// # Errors
    /// `PipelineError::Config` if the config is invalid.
    pub fn start(config: PipelineConfig, executor: Arc<dyn StageExecutor>) -> Result<Self, PipelineError> {
        config.validate()?;

        let shared = Arc::new(Shared::new(executor, config.ledger_capacity));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut lanes = BTreeMap::new();
        let mut slots = Vec::new();
        for class in QueueClass::ALL {
            let lane = Lane::new(class, config.policy(class).clone());
            slots.extend(lane.spawn_slots(&shared, &shutdown_rx));
            lanes.insert(class, lane);
        }

        tracing::info!(
            interactive = config.interactive.slots,
            monitor = config.monitor.slots,
            exports = config.exports.slots,
            "dispatcher started"
        );

        Ok(Self {
            config,
            lanes,
            shared,
            slots: parking_lot::Mutex::new(slots),
            shutdown,
        })
    }

    /// Start with the crisis-core stage executor
    ///
    /// # Errors
    /// As [`Self::start`].
    pub fn with_default_executor(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::start(config, Arc::new(DefaultStageExecutor::new()))
    }

    /// Queue a unit on its stage's lane
    ///
    /// Waits for queue space when the lane is full.
    ///
    /// # Errors
    /// `QueueClosed` after shutdown.
    pub async fn submit(&self, unit: WorkUnit) -> Result<Receipt, PipelineError> {
        let stage = unit.stage();
        let queue = stage.queue();
        if !self.is_running() {
            return Err(PipelineError::QueueClosed(queue));
        }
        let lane = self.lanes.get(&queue).ok_or(PipelineError::QueueClosed(queue))?;

        let unit_id = unit.id;
        let (reply, rx) = oneshot::channel();
        lane.sender
            .send(Envelope { unit, reply })
            .await
            .map_err(|_| PipelineError::QueueClosed(queue))?;
        self.shared.bump(queue, |s| s.submitted += 1);

        Ok(Receipt {
            unit_id,
            stage,
            queue,
            rx,
        })
    }

    /// Submit a unit and wait for its outcome
    ///
    /// # Errors
    /// As [`Self::submit`] and [`Receipt::wait`].
    pub async fn run(&self, unit: WorkUnit) -> UnitOutcome {
        self.submit(unit).await?.wait().await
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.shared.stats()
    }

    /// Completed-unit ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &CompletionLedger {
        &self.shared.ledger
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether new units are accepted
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    /// Stop accepting work, let in-flight units finish, cancel the rest
    pub async fn shutdown(self) -> DispatcherStats {
        self.shutdown.send_replace(true);

        let slots = std::mem::take(&mut *self.slots.lock());
        for result in futures::future::join_all(slots).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "slot task failed");
            }
        }

        let mut cancelled = 0;
        for lane in self.lanes.values() {
            cancelled += lane.drain().await;
        }

        let stats = self.stats();
        tracing::info!(
            completed = stats.total().completed,
            failed = stats.total().failed,
            cancelled,
            "dispatcher stopped"
        );
        stats
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
