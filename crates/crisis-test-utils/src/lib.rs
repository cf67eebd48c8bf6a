//! Testing utilities for the crisis workspace
//!
//! Shared fixtures, fault-injecting executors and dispatcher setups.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use crisis_core::{ContentRequest, ContentType, FactMap, IncidentId, Severity};
use crisis_dispatch::{
    run_blocking, DefaultStageExecutor, Dispatcher, PipelineConfig, PipelineError, QueueClass, QueuePolicy,
    Stage, StageExecutor, StageInput, StageOutput, UnitContext,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed reference time used across fixtures
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 19, 10, 0, 0).unwrap()
}

/// Incident payload with the given affected-user count
pub fn incident_payload(affected_users: u64) -> Value {
    json!({
        "title": "Customer data breach",
        "description": "Unauthorized access to the customer database",
        "detected_at": "2024-12-19T09:15:00Z",
        "affected_users": affected_users,
        "data_types": ["email", "name", "phone"],
        "jurisdictions": ["EU", "US-CA"],
    })
}

/// Critical-severity payload (Scenario A)
pub fn critical_incident() -> Value {
    incident_payload(50_000)
}

/// Medium-severity payload (Scenario B)
pub fn medium_incident() -> Value {
    let mut payload = incident_payload(50);
    payload["title"] = json!("Service outage on checkout");
    payload
}

/// Synthesis request with `incident_type` set
pub fn content_request(content_type: ContentType, severity: Severity, incident_type: &str) -> ContentRequest {
    let mut facts = FactMap::new();
    facts.insert("incident_type".to_string(), json!(incident_type));
    ContentRequest::new(IncidentId::new("inc-test"), content_type, severity, facts)
}

/// Policy with small, test-friendly limits
pub fn fast_policy(soft: Duration, hard: Duration, retries: u32) -> QueuePolicy {
    QueuePolicy::default()
        .with_slots(2)
        .with_capacity(64)
        .with_time_limits(soft, hard)
        .with_retry_budget(retries)
}

/// Same fast policy on every queue
pub fn fast_config(soft: Duration, hard: Duration, retries: u32) -> PipelineConfig {
    let policy = fast_policy(soft, hard, retries);
    QueueClass::ALL
        .into_iter()
        .fold(PipelineConfig::default(), |config, class| config.with_policy(class, policy.clone()))
}

/// Default config with one-second limits
pub fn test_config() -> PipelineConfig {
    fast_config(Duration::from_millis(500), Duration::from_secs(1), 2)
}

/// Start a dispatcher with the crisis-core executor
pub fn default_dispatcher(config: PipelineConfig) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::with_default_executor(config).unwrap())
}

/// How a [`FaultyExecutor`] misbehaves
#[derive(Debug, Clone)]
pub enum Fault {
    /// Panic
    Panic,
    /// Sleep past any limit
    Stall(Duration),
    /// Sleep, then stop at the soft-limit checkpoint
    WindDown(Duration),
    /// Busy-loop on the blocking pool without yielding or checking in
    Spin(Duration),
}

/// Wraps the default executor and injects faults
///
/// A fault fires on the first `failures` attempts of the targeted stage
/// (optionally only for one content type); later attempts run normally.
pub struct FaultyExecutor {
    inner: DefaultStageExecutor,
    stage: Stage,
    content_type: Option<ContentType>,
    fault: Fault,
    failures: usize,
    fired: AtomicUsize,
    attempts: AtomicUsize,
}

impl FaultyExecutor {
    pub fn new(stage: Stage, fault: Fault, failures: usize) -> Self {
        Self {
            inner: DefaultStageExecutor::new(),
            stage,
            content_type: None,
            fault,
            failures,
            fired: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Only fault synthesis of this content type
    pub fn only_for(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Attempts of the targeted stage so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn targets(&self, input: &StageInput) -> bool {
        if input.stage() != self.stage {
            return false;
        }
        match (&self.content_type, input) {
            (None, _) => true,
            (Some(t), StageInput::Synthesize(request)) => request.content_type == *t,
            (Some(t), StageInput::Lint(artifact)) => artifact.content_type == *t,
            (Some(_), _) => false,
        }
    }
}

#[async_trait::async_trait]
impl StageExecutor for FaultyExecutor {
    async fn execute(&self, input: StageInput, ctx: UnitContext) -> Result<StageOutput, PipelineError> {
        if self.targets(&input) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fired.fetch_add(1, Ordering::SeqCst) < self.failures {
                match &self.fault {
                    Fault::Panic => panic!("injected stage panic"),
                    Fault::Stall(d) => tokio::time::sleep(*d).await,
                    Fault::WindDown(d) => {
                        tokio::time::sleep(*d).await;
                        ctx.checkpoint()?;
                    }
                    Fault::Spin(d) => {
                        let (d, inner) = (*d, self.inner.clone());
                        return run_blocking(ctx, move |ctx| {
                            let started = std::time::Instant::now();
                            while started.elapsed() < d {
                                std::hint::spin_loop();
                            }
                            inner.run(input, ctx)
                        })
                        .await;
                    }
                }
            }
        }
        self.inner.run(input, &ctx)
    }
}

/// Counts executions per unit; used to observe redelivery handling
#[derive(Default)]
pub struct CountingExecutor {
    inner: DefaultStageExecutor,
    pub executions: AtomicUsize,
    pub seen: Mutex<HashSet<String>>,
}

#[async_trait::async_trait]
impl StageExecutor for CountingExecutor {
    async fn execute(&self, input: StageInput, ctx: UnitContext) -> Result<StageOutput, PipelineError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().insert(ctx.unit_id.to_string());
        self.inner.run(input, &ctx)
    }
}
