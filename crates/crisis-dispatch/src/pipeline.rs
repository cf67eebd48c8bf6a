//! Incident workflow
//!
//! Sequences one incident's units on the dispatcher:
//!
//! ```text
//! normalize ──┬── plan
//!             ├── synthesize(holding_statement) ── lint
//!             ├── synthesize(faq) ── lint
//!             └── ...
//! ```
//!
//! Normalize gates everything. Each content type runs its own
//! synthesize → lint chain; one type failing does not affect the others.

use crate::dispatcher::Dispatcher;
use crate::error::PipelineError;
use crate::unit::{MonitorReport, StageInput, StageOutput, WorkUnit};
use crisis_core::{
    ContentRequest, ContentType, ExportPackage, ExportRequest, IncidentId, IncidentReport,
    LintedArtifact, MentionRecord, NormalizedFacts, PlanResult, Tone, ValidationError,
};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One artifact to produce for an incident
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactOrder {
    /// Artifact kind
    pub content_type: ContentType,
    /// Facts merged over the normalized ones
    pub facts: BTreeMap<String, Value>,
    /// Tone override
    pub tone: Option<Tone>,
    /// Audience segments
    pub audience: Vec<String>,
    /// Template variables
    pub variables: BTreeMap<String, String>,
    /// Free-text instructions
    pub instructions: Option<String>,
}

impl ArtifactOrder {
    /// Order an artifact with no overrides
    #[must_use]
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            facts: BTreeMap::new(),
            tone: None,
            audience: Vec::new(),
            variables: BTreeMap::new(),
            instructions: None,
        }
    }

    /// One order per content type
    #[must_use]
    pub fn all() -> Vec<Self> {
        ContentType::ALL.into_iter().map(Self::new).collect()
    }

    /// With an extra fact
    #[inline]
    #[must_use]
    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// With tone
    #[inline]
    #[must_use]
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    /// With a template variable
    #[inline]
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Build the synthesis request from normalized facts
    #[must_use]
    pub fn request(&self, incident_id: &IncidentId, facts: &NormalizedFacts) -> ContentRequest {
        let mut request = ContentRequest::from_facts(incident_id.clone(), self.content_type, facts, &self.facts)
            .with_audience(self.audience.clone());
        if let Some(tone) = self.tone {
            request = request.with_tone(tone);
        }
        if let Some(instructions) = &self.instructions {
            request = request.with_instructions(instructions.clone());
        }
        for (k, v) in &self.variables {
            request = request.with_variable(k.clone(), v.clone());
        }
        request
    }
}

impl From<ContentType> for ArtifactOrder {
    fn from(content_type: ContentType) -> Self {
        Self::new(content_type)
    }
}

/// Everything produced for one incident
#[derive(Debug, Clone)]
pub struct IncidentOutcome {
    /// Incident
    pub incident_id: IncidentId,
    /// Normalized facts
    pub facts: NormalizedFacts,
    /// Response plan
    pub plan: PlanResult,
    /// Content type of each entry in `artifacts`
    pub requested: Vec<ContentType>,
    /// One independent result per order, in order
    pub artifacts: Vec<Result<LintedArtifact, PipelineError>>,
}

impl IncidentOutcome {
    /// Successfully linted artifacts
    pub fn linted(&self) -> impl Iterator<Item = &LintedArtifact> {
        self.artifacts.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Number of failed artifacts
    #[must_use]
    pub fn failures(&self) -> usize {
        self.artifacts.iter().filter(|r| r.is_err()).count()
    }

    /// JSON rendering with failures inlined as error strings
    #[must_use]
    pub fn to_json(&self) -> Value {
        let artifacts: Vec<Value> = self
            .requested
            .iter()
            .zip(&self.artifacts)
            .map(|(content_type, result)| match result {
                Ok(linted) => json!({
                    "content_type": content_type,
                    "artifact": linted.artifact,
                    "lint": linted.lint,
                }),
                Err(e) => json!({
                    "content_type": content_type,
                    "error": e.to_string(),
                }),
            })
            .collect();

        json!({
            "incident_id": self.incident_id,
            "facts": self.facts,
            "plan": self.plan,
            "artifacts": artifacts,
        })
    }
}

/// Sequences incident stages on a dispatcher
#[derive(Debug, Clone)]
pub struct IncidentWorkflow {
    dispatcher: Arc<Dispatcher>,
}

impl IncidentWorkflow {
    /// Create new workflow
    #[inline]
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Underlying dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run the full workflow for a raw incident payload
    ///
    /// # Errors
    /// The normalize or plan unit's error. Artifact failures are reported
    /// per entry in [`IncidentOutcome::artifacts`].
    pub async fn run(
        &self,
        incident_id: impl Into<IncidentId>,
        report: Value,
        orders: Vec<ArtifactOrder>,
    ) -> Result<IncidentOutcome, PipelineError> {
        let incident_id = incident_id.into();
        tracing::info!(incident_id = %incident_id, artifacts = orders.len(), "workflow started");

        let facts = self
            .dispatcher
            .run(WorkUnit::new(incident_id.clone(), StageInput::Normalize(report)))
            .await
            .and_then(StageOutput::into_facts)?;

        let plan = async {
            self.dispatcher
                .run(WorkUnit::new(incident_id.clone(), StageInput::Plan(facts.clone())))
                .await
                .and_then(StageOutput::into_plan)
        };
        let artifacts = join_all(
            orders
                .iter()
                .map(|order| self.synthesize_and_lint(order.request(&incident_id, &facts))),
        );
        let (plan, artifacts) = futures::join!(plan, artifacts);
        let plan = plan?;

        let outcome = IncidentOutcome {
            incident_id,
            facts,
            plan,
            requested: orders.iter().map(|o| o.content_type).collect(),
            artifacts,
        };
        tracing::info!(
            incident_id = %outcome.incident_id,
            severity = %outcome.facts.severity,
            failures = outcome.failures(),
            "workflow finished"
        );
        Ok(outcome)
    }

    /// Run the full workflow for a typed report
    ///
    /// # Errors
    /// As [`Self::run`].
    pub async fn run_report(
        &self,
        incident_id: impl Into<IncidentId>,
        report: &IncidentReport,
        orders: Vec<ArtifactOrder>,
    ) -> Result<IncidentOutcome, PipelineError> {
        let payload = serde_json::to_value(report)
            .map_err(|e| ValidationError::malformed("incident", e.to_string()))?;
        self.run(incident_id, payload, orders).await
    }

    /// Re-run synthesize → lint for one content type
    ///
    /// # Errors
    /// The synthesize or lint unit's error.
    pub async fn resynthesize(&self, request: ContentRequest) -> Result<LintedArtifact, PipelineError> {
        self.synthesize_and_lint(request).await
    }

    /// Ingest a mention feed on the monitor queue
    ///
    /// # Errors
    /// The monitor unit's error.
    pub async fn monitor(
        &self,
        incident_id: impl Into<IncidentId>,
        feed: Vec<MentionRecord>,
        series_hours: u32,
    ) -> Result<MonitorReport, PipelineError> {
        self.dispatcher
            .run(WorkUnit::new(incident_id, StageInput::MonitorIngest { feed, series_hours }))
            .await
            .and_then(StageOutput::into_monitor)
    }

    /// Render a single export on the exports queue
    ///
    /// # Errors
    /// The export unit's error.
    pub async fn export(
        &self,
        incident_id: impl Into<IncidentId>,
        request: ExportRequest,
    ) -> Result<ExportPackage, PipelineError> {
        self.dispatcher
            .run(WorkUnit::new(incident_id, StageInput::Export(request)))
            .await
            .and_then(StageOutput::into_export)
    }

    /// Bundle an outcome's linted artifacts on the exports queue
    ///
    /// # Errors
    /// The export unit's error.
    pub async fn package(&self, outcome: &IncidentOutcome) -> Result<ExportPackage, PipelineError> {
        let artifacts = outcome.linted().cloned().collect();
        self.dispatcher
            .run(WorkUnit::new(outcome.incident_id.clone(), StageInput::Package(artifacts)))
            .await
            .and_then(StageOutput::into_export)
    }

    async fn synthesize_and_lint(&self, request: ContentRequest) -> Result<LintedArtifact, PipelineError> {
        let incident_id = request.incident_id.clone();
        let artifact = self
            .dispatcher
            .run(WorkUnit::new(incident_id.clone(), StageInput::Synthesize(request)))
            .await
            .and_then(StageOutput::into_artifact)?;
        self.dispatcher
            .run(WorkUnit::new(incident_id, StageInput::Lint(artifact)))
            .await
            .and_then(StageOutput::into_linted)
    }
}
