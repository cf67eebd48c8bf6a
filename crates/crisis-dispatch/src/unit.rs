//! Units of work
//!
//! A [`WorkUnit`] is one stage invocation with owned inputs. Its [`UnitId`]
//! is stable across retries and redeliveries, which is what the completion
//! ledger keys on.

use crate::config::QueueClass;
use crate::error::{PipelineError, TransientExecutionError};
use chrono::{DateTime, Utc};
use crisis_core::{
    ContentArtifact, ContentRequest, ExportPackage, ExportRequest, IncidentId, LintedArtifact,
    Mention, MentionRecord, NormalizedFacts, PlanResult, Rumor, SentimentPoint,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ulid::Ulid;

/// Unit identifier, stable across attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub Ulid);

impl UnitId {
    /// Generate new unit ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Intake normalization
    Normalize,
    /// Response plan
    Plan,
    /// Content synthesis
    Synthesize,
    /// Legal lint
    Lint,
    /// Social-listening ingestion
    MonitorIngest,
    /// Export packaging
    Export,
}

impl Stage {
    /// Queue this stage runs on
    #[inline]
    #[must_use]
    pub fn queue(&self) -> QueueClass {
        match self {
            Stage::Normalize | Stage::Plan | Stage::Synthesize | Stage::Lint => QueueClass::Interactive,
            Stage::MonitorIngest => QueueClass::Monitor,
            Stage::Export => QueueClass::Exports,
        }
    }

    /// Stage name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Plan => "plan",
            Stage::Synthesize => "synthesize",
            Stage::Lint => "lint",
            Stage::MonitorIngest => "monitor_ingest",
            Stage::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned input of one stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "input", rename_all = "snake_case")]
pub enum StageInput {
    /// Raw incident payload
    Normalize(serde_json::Value),
    /// Facts to plan from
    Plan(NormalizedFacts),
    /// Synthesis request
    Synthesize(ContentRequest),
    /// Artifact to lint
    Lint(ContentArtifact),
    /// Mention feed
    MonitorIngest {
        /// Raw mentions
        feed: Vec<MentionRecord>,
        /// Sentiment series length in hours
        series_hours: u32,
    },
    /// Single export
    Export(ExportRequest),
    /// Bundle linted artifacts
    Package(Vec<LintedArtifact>),
}

impl StageInput {
    /// Stage this input belongs to
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            StageInput::Normalize(_) => Stage::Normalize,
            StageInput::Plan(_) => Stage::Plan,
            StageInput::Synthesize(_) => Stage::Synthesize,
            StageInput::Lint(_) => Stage::Lint,
            StageInput::MonitorIngest { .. } => Stage::MonitorIngest,
            StageInput::Export(_) | StageInput::Package(_) => Stage::Export,
        }
    }
}

/// Mentions, rumors and sentiment for one ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    /// Scored mentions
    pub mentions: Vec<Mention>,
    /// Rumor candidates
    pub rumors: Vec<Rumor>,
    /// Hourly sentiment
    pub series: Vec<SentimentPoint>,
}

/// Owned output of one stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "output", rename_all = "snake_case")]
pub enum StageOutput {
    /// Normalized facts
    Facts(NormalizedFacts),
    /// Response plan
    Plan(PlanResult),
    /// Synthesized artifact
    Artifact(ContentArtifact),
    /// Linted artifact
    Linted(LintedArtifact),
    /// Monitor ingest result
    Monitor(MonitorReport),
    /// Rendered export
    Export(ExportPackage),
}

impl StageOutput {
    /// Unwrap normalized facts
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_facts(self) -> Result<NormalizedFacts, PipelineError> {
        match self {
            StageOutput::Facts(f) => Ok(f),
            _ => Err(PipelineError::UnexpectedOutput(Stage::Normalize)),
        }
    }

    /// Unwrap a plan
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_plan(self) -> Result<PlanResult, PipelineError> {
        match self {
            StageOutput::Plan(p) => Ok(p),
            _ => Err(PipelineError::UnexpectedOutput(Stage::Plan)),
        }
    }

    /// Unwrap a synthesized artifact
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_artifact(self) -> Result<ContentArtifact, PipelineError> {
        match self {
            StageOutput::Artifact(a) => Ok(a),
            _ => Err(PipelineError::UnexpectedOutput(Stage::Synthesize)),
        }
    }

    /// Unwrap a linted artifact
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_linted(self) -> Result<LintedArtifact, PipelineError> {
        match self {
            StageOutput::Linted(l) => Ok(l),
            _ => Err(PipelineError::UnexpectedOutput(Stage::Lint)),
        }
    }

    /// Unwrap a monitor report
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_monitor(self) -> Result<MonitorReport, PipelineError> {
        match self {
            StageOutput::Monitor(m) => Ok(m),
            _ => Err(PipelineError::UnexpectedOutput(Stage::MonitorIngest)),
        }
    }

    /// Unwrap an export package
    ///
    /// # Errors
    /// `UnexpectedOutput` for any other kind.
    pub fn into_export(self) -> Result<ExportPackage, PipelineError> {
        match self {
            StageOutput::Export(e) => Ok(e),
            _ => Err(PipelineError::UnexpectedOutput(Stage::Export)),
        }
    }
}

/// One stage invocation
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    /// Identity, stable across attempts
    pub id: UnitId,
    /// Owning incident
    pub incident_id: IncidentId,
    /// Owned input
    pub input: StageInput,
    /// Attempt number, starting at 1
    pub attempt: u32,
}

impl WorkUnit {
    /// Create new unit
    #[must_use]
    pub fn new(incident_id: impl Into<IncidentId>, input: StageInput) -> Self {
        Self {
            id: UnitId::new(),
            incident_id: incident_id.into(),
            input,
            attempt: 1,
        }
    }

    /// With a fixed identity (redelivery of a known unit)
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: UnitId) -> Self {
        self.id = id;
        self
    }

    /// Stage of this unit
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.input.stage()
    }

    /// Artifact id carried by the input, if any
    #[must_use]
    pub fn artifact_id(&self) -> Option<&str> {
        match &self.input {
            StageInput::Lint(a) => Some(a.content_id.as_str()),
            _ => None,
        }
    }
}

/// Per-attempt execution context handed to the stage
#[derive(Debug, Clone)]
pub struct UnitContext {
    /// Unit being executed
    pub unit_id: UnitId,
    /// Owning incident
    pub incident_id: IncidentId,
    /// Queue the unit runs on
    pub queue: QueueClass,
    /// Attempt number, starting at 1
    pub attempt: u32,
    /// Single clock reading for this attempt
    pub now: DateTime<Utc>,
    soft_limit_ms: u64,
    wind_down: Arc<AtomicBool>,
}

impl UnitContext {
    /// Create new context
    #[must_use]
    pub fn new(unit: &WorkUnit, queue: QueueClass, soft_limit_ms: u64, now: DateTime<Utc>) -> Self {
        Self {
            unit_id: unit.id,
            incident_id: unit.incident_id.clone(),
            queue,
            attempt: unit.attempt,
            now,
            soft_limit_ms,
            wind_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the soft limit has passed
    #[inline]
    #[must_use]
    pub fn should_wind_down(&self) -> bool {
        self.wind_down.load(Ordering::Acquire)
    }

    /// Stop here if the soft limit has passed
    ///
    /// # Errors
    /// `SoftTimeLimitExceeded` once the wind-down signal is raised.
    pub fn checkpoint(&self) -> Result<(), PipelineError> {
        if self.should_wind_down() {
            return Err(TransientExecutionError::SoftTimeLimitExceeded {
                limit_ms: self.soft_limit_ms,
            }
            .into());
        }
        Ok(())
    }

    /// Raise the wind-down signal
    pub(crate) fn signal_wind_down(&self) {
        self.wind_down.store(true, Ordering::Release);
    }
}
