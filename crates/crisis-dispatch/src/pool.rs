//! Worker slots
//!
//! Each queue class is a [`Lane`]: one bounded channel drained by `slots`
//! slot tasks. A slot runs one unit to completion before taking the next,
//! and replaces its worker identity every `max_units_per_worker` units.
//!
//! Every attempt runs in its own task under the queue's time-box:
//! - soft limit: the unit's wind-down flag is raised
//! - hard limit: the task is aborted and the attempt fails
//!
//! Transient failures are requeued with `attempt + 1` until the retry
//! budget is spent.

use crate::config::{QueueClass, QueuePolicy};
use crate::error::{PipelineError, TransientExecutionError};
use crate::executor::StageExecutor;
use crate::ledger::{CompletionLedger, UnitOutcome};
use crate::unit::{StageOutput, UnitContext, WorkUnit};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use ulid::Ulid;

/// Queued unit plus where to send its outcome
#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) unit: WorkUnit,
    pub(crate) reply: oneshot::Sender<UnitOutcome>,
}

/// Counters for one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Units accepted by `submit`
    pub submitted: u64,
    /// Units that resolved successfully
    pub completed: u64,
    /// Units that resolved with an error
    pub failed: u64,
    /// Requeues after a transient failure
    pub retried: u64,
    /// Completions discarded as redeliveries
    pub duplicates_discarded: u64,
    /// Worker identities created
    pub workers_spawned: u64,
    /// Worker identities retired
    pub workers_retired: u64,
}

impl QueueStats {
    fn merge(&mut self, other: &QueueStats) {
        self.submitted += other.submitted;
        self.completed += other.completed;
        self.failed += other.failed;
        self.retried += other.retried;
        self.duplicates_discarded += other.duplicates_discarded;
        self.workers_spawned += other.workers_spawned;
        self.workers_retired += other.workers_retired;
    }
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    /// Counters per queue
    pub queues: BTreeMap<QueueClass, QueueStats>,
}

impl DispatcherStats {
    /// Counters for one queue
    #[must_use]
    pub fn queue(&self, class: QueueClass) -> QueueStats {
        self.queues.get(&class).copied().unwrap_or_default()
    }

    /// Counters summed over all queues
    #[must_use]
    pub fn total(&self) -> QueueStats {
        let mut total = QueueStats::default();
        for stats in self.queues.values() {
            total.merge(stats);
        }
        total
    }
}

/// State shared by every slot
pub(crate) struct Shared {
    pub(crate) executor: Arc<dyn StageExecutor>,
    pub(crate) ledger: CompletionLedger,
    stats: parking_lot::Mutex<DispatcherStats>,
}

impl Shared {
    pub(crate) fn new(executor: Arc<dyn StageExecutor>, ledger_capacity: usize) -> Self {
        Self {
            executor,
            ledger: CompletionLedger::with_capacity(ledger_capacity),
            stats: parking_lot::Mutex::new(DispatcherStats::default()),
        }
    }

    pub(crate) fn bump(&self, class: QueueClass, f: impl FnOnce(&mut QueueStats)) {
        f(self.stats.lock().queues.entry(class).or_default());
    }

    pub(crate) fn stats(&self) -> DispatcherStats {
        self.stats.lock().clone()
    }
}

/// One queue class: channel plus policy
pub(crate) struct Lane {
    pub(crate) class: QueueClass,
    pub(crate) policy: QueuePolicy,
    pub(crate) sender: mpsc::Sender<Envelope>,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
}

impl Lane {
    pub(crate) fn new(class: QueueClass, policy: QueuePolicy) -> Self {
        let (sender, receiver) = mpsc::channel(policy.capacity);
        Self {
            class,
            policy,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Spawn this lane's slot tasks
    pub(crate) fn spawn_slots(
        &self,
        shared: &Arc<Shared>,
        shutdown: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        (0..self.policy.slots)
            .map(|index| {
                let slot = Slot {
                    class: self.class,
                    index,
                    policy: self.policy.clone(),
                    sender: self.sender.clone(),
                    receiver: Arc::clone(&self.receiver),
                    shared: Arc::clone(shared),
                    shutdown: shutdown.clone(),
                    worker: Ulid::new(),
                    processed: 0,
                };
                tokio::spawn(slot.run())
            })
            .collect()
    }

    /// Close the channel and cancel whatever is still queued
    pub(crate) async fn drain(&self) -> usize {
        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut cancelled = 0;
        while let Ok(envelope) = receiver.try_recv() {
            let _ = envelope.reply.send(Err(PipelineError::Cancelled));
            cancelled += 1;
        }
        cancelled
    }
}

/// One execution slot
struct Slot {
    class: QueueClass,
    index: usize,
    policy: QueuePolicy,
    sender: mpsc::Sender<Envelope>,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
    worker: Ulid,
    processed: u64,
}

impl Slot {
    async fn run(mut self) {
        self.worker_spawned();

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            let receiver = Arc::clone(&self.receiver);
            let envelope = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                next = async move { receiver.lock().await.recv().await } => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            self.process(envelope).await;

            self.processed += 1;
            if self.processed >= self.policy.max_units_per_worker {
                self.retire_worker();
            }
        }

        tracing::debug!(queue = %self.class, slot = self.index, "slot stopped");
    }

    fn worker_spawned(&self) {
        self.shared.bump(self.class, |s| s.workers_spawned += 1);
        tracing::info!(
            queue = %self.class,
            slot = self.index,
            worker_id = %self.worker,
            "worker.spawned"
        );
    }

    /// Replace the slot's worker after `max_units_per_worker` units
    ///
    /// Resets the worker identity and unit counter only. Executors are shared
    /// across slots and each attempt builds a fresh [`UnitContext`], so no
    /// other per-worker state exists to rebuild.
    fn retire_worker(&mut self) {
        self.shared.bump(self.class, |s| s.workers_retired += 1);
        tracing::info!(
            queue = %self.class,
            slot = self.index,
            worker_id = %self.worker,
            processed = self.processed,
            "worker.retired"
        );
        self.worker = Ulid::new();
        self.processed = 0;
        self.worker_spawned();
    }

    async fn process(&self, envelope: Envelope) {
        let Envelope { mut unit, reply } = envelope;

        if let Some(outcome) = self.shared.ledger.get(&unit.id) {
            self.shared.bump(self.class, |s| s.duplicates_discarded += 1);
            tracing::info!(
                incident_id = %unit.incident_id,
                unit_id = %unit.id,
                queue = %self.class,
                "unit.duplicate_discarded"
            );
            let _ = reply.send(outcome);
            return;
        }

        tracing::info!(
            incident_id = %unit.incident_id,
            artifact_id = unit.artifact_id(),
            unit_id = %unit.id,
            queue = %self.class,
            stage = %unit.stage(),
            attempt = unit.attempt,
            worker_id = %self.worker,
            "stage.start"
        );

        let outcome = match self.attempt(&unit).await {
            Err(PipelineError::Transient(transient)) => {
                tracing::warn!(
                    incident_id = %unit.incident_id,
                    unit_id = %unit.id,
                    queue = %self.class,
                    stage = %unit.stage(),
                    attempt = unit.attempt,
                    error = %transient,
                    "stage.failure"
                );
                if unit.attempt <= self.policy.retry_budget {
                    unit.attempt += 1;
                    self.requeue(Envelope { unit, reply });
                    return;
                }
                Err(PipelineError::StageFailed {
                    stage: unit.stage(),
                    attempts: unit.attempt,
                    last_error: transient,
                })
            }
            other => other,
        };

        self.finish(&unit, outcome, reply);
    }

    fn requeue(&self, envelope: Envelope) {
        self.shared.bump(self.class, |s| s.retried += 1);
        tracing::info!(
            incident_id = %envelope.unit.incident_id,
            unit_id = %envelope.unit.id,
            queue = %self.class,
            attempt = envelope.unit.attempt,
            "unit.requeued"
        );

        let sender = self.sender.clone();
        let class = self.class;
        tokio::spawn(async move {
            if let Err(mpsc::error::SendError(envelope)) = sender.send(envelope).await {
                let _ = envelope.reply.send(Err(PipelineError::QueueClosed(class)));
            }
        });
    }

    fn finish(&self, unit: &WorkUnit, outcome: UnitOutcome, reply: oneshot::Sender<UnitOutcome>) {
        let recorded = self.shared.ledger.record(unit.id, outcome);
        if recorded.is_duplicate() {
            self.shared.bump(self.class, |s| s.duplicates_discarded += 1);
            tracing::info!(
                incident_id = %unit.incident_id,
                unit_id = %unit.id,
                queue = %self.class,
                "unit.duplicate_discarded"
            );
            let _ = reply.send(recorded.into_outcome());
            return;
        }

        let outcome = recorded.into_outcome();
        match &outcome {
            Ok(_) => {
                self.shared.bump(self.class, |s| s.completed += 1);
                tracing::info!(
                    incident_id = %unit.incident_id,
                    artifact_id = unit.artifact_id(),
                    unit_id = %unit.id,
                    queue = %self.class,
                    stage = %unit.stage(),
                    attempt = unit.attempt,
                    "stage.success"
                );
            }
            Err(err) => {
                self.shared.bump(self.class, |s| s.failed += 1);
                tracing::error!(
                    incident_id = %unit.incident_id,
                    artifact_id = unit.artifact_id(),
                    unit_id = %unit.id,
                    queue = %self.class,
                    stage = %unit.stage(),
                    attempt = unit.attempt,
                    error = %err,
                    "stage.failure"
                );
            }
        }
        let _ = reply.send(outcome);
    }

    /// Run one attempt under the queue's time-box
    ///
    /// The hard limit aborts the attempt task and stops waiting for it.
    /// Aborting only lands at an await point, so executors keep CPU-bound
    /// work off the async task (see [`crate::executor::run_blocking`]); that
    /// work is abandoned rather than killed and sees the wind-down flag.
    async fn attempt(&self, unit: &WorkUnit) -> Result<StageOutput, PipelineError> {
        let ctx = UnitContext::new(unit, self.class, self.policy.soft_time_limit_ms, Utc::now());
        let executor = Arc::clone(&self.shared.executor);
        let input = unit.input.clone();
        let task_ctx = ctx.clone();
        let mut handle = tokio::spawn(async move { executor.execute(input, task_ctx).await });

        let soft = tokio::time::sleep(self.policy.soft_limit());
        let hard = tokio::time::sleep(self.policy.hard_limit());
        tokio::pin!(soft, hard);
        let mut soft_fired = false;

        loop {
            tokio::select! {
                joined = &mut handle => {
                    return joined.unwrap_or_else(|e| Err(crashed(e).into()));
                }
                () = &mut soft, if !soft_fired => {
                    soft_fired = true;
                    ctx.signal_wind_down();
                    tracing::warn!(
                        unit_id = %unit.id,
                        queue = %self.class,
                        limit_ms = self.policy.soft_time_limit_ms,
                        "soft time limit reached"
                    );
                }
                () = &mut hard => {
                    ctx.signal_wind_down();
                    handle.abort();
                    return Err(TransientExecutionError::HardTimeLimitExceeded {
                        limit_ms: self.policy.hard_time_limit_ms,
                    }
                    .into());
                }
            }
        }
    }
}

fn crashed(err: JoinError) -> TransientExecutionError {
    if !err.is_panic() {
        return TransientExecutionError::WorkerCrashed(err.to_string());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "stage panicked".to_string());
    TransientExecutionError::WorkerCrashed(message)
}
