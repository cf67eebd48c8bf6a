//! Stage executors
//!
//! The dispatcher owns scheduling; an executor owns what a stage does.
//! Tests swap in executors that stall, panic or count invocations.

use crate::error::{PipelineError, TransientExecutionError};
use crate::unit::{MonitorReport, StageInput, StageOutput, UnitContext};
use crisis_core::monitor::{detect_rumors, ingest_mentions, sentiment_series};
use crisis_core::{
    build_export, normalize_value, package_artifacts, LegalLinter, PlanBuilder, RandomScorer,
    SentimentScorer, Synthesizer,
};
use std::sync::Arc;

/// Runs one stage invocation
#[async_trait::async_trait]
pub trait StageExecutor: Send + Sync {
    /// Execute a stage input
    ///
    /// Implementations should call [`UnitContext::checkpoint`] between
    /// expensive steps so the soft limit can take effect, and run
    /// synchronous work through [`run_blocking`] so the hard limit can.
    async fn execute(&self, input: StageInput, ctx: UnitContext) -> Result<StageOutput, PipelineError>;
}

/// Run synchronous stage work on the blocking pool
///
/// The calling task only awaits the result, so the dispatcher's hard limit
/// can abandon an attempt whose `work` never yields. Abandoned work keeps its
/// thread until it returns; the wind-down flag is raised before abandonment,
/// so it stops at its next [`UnitContext::checkpoint`].
///
/// # Errors
/// Whatever `work` returns. A panic inside `work` is resumed on the calling
/// task.
pub async fn run_blocking<F>(ctx: UnitContext, work: F) -> Result<StageOutput, PipelineError>
where
    F: FnOnce(&UnitContext) -> Result<StageOutput, PipelineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&ctx)).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(TransientExecutionError::WorkerCrashed(err.to_string()).into()),
    }
}

/// Executor backed by the crisis-core stages
///
/// Cheap to clone; clones share the synthesizer's artifact sequence.
#[derive(Clone)]
pub struct DefaultStageExecutor {
    planner: PlanBuilder,
    synthesizer: Arc<Synthesizer>,
    linter: Arc<LegalLinter>,
    scorer: Arc<dyn SentimentScorer>,
}

impl std::fmt::Debug for DefaultStageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultStageExecutor")
            .field("linter", &self.linter)
            .finish_non_exhaustive()
    }
}

impl Default for DefaultStageExecutor {
    fn default() -> Self {
        Self {
            planner: PlanBuilder::new(),
            synthesizer: Arc::new(Synthesizer::new()),
            linter: Arc::new(LegalLinter::new()),
            scorer: Arc::new(RandomScorer),
        }
    }
}

impl DefaultStageExecutor {
    /// Create with default linter and random sentiment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a custom sentiment scorer
    #[inline]
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// With a custom linter
    #[inline]
    #[must_use]
    pub fn with_linter(mut self, linter: LegalLinter) -> Self {
        self.linter = Arc::new(linter);
        self
    }

    /// Run a stage on the current thread
    ///
    /// [`StageExecutor::execute`] calls this through [`run_blocking`].
    ///
    /// # Errors
    /// Validation and content-type errors from the stage, or a soft-limit
    /// wind-down.
    pub fn run(&self, input: StageInput, ctx: &UnitContext) -> Result<StageOutput, PipelineError> {
        ctx.checkpoint()?;
        let now = ctx.now;
        let output = match input {
            StageInput::Normalize(payload) => StageOutput::Facts(normalize_value(&payload)?),
            StageInput::Plan(facts) => StageOutput::Plan(self.planner.build(&facts, now)),
            StageInput::Synthesize(request) => {
                StageOutput::Artifact(self.synthesizer.synthesize(&request, now)?)
            }
            StageInput::Lint(artifact) => StageOutput::Linted(self.linter.lint_artifact(artifact, now)),
            StageInput::MonitorIngest { feed, series_hours } => {
                let mentions = ingest_mentions(&ctx.incident_id, &feed, self.scorer.as_ref(), now);
                ctx.checkpoint()?;
                let rumors = detect_rumors(&ctx.incident_id, &mentions, now);
                let series = sentiment_series(series_hours, self.scorer.as_ref(), now);
                StageOutput::Monitor(MonitorReport {
                    mentions,
                    rumors,
                    series,
                })
            }
            StageInput::Export(request) => StageOutput::Export(build_export(&request)?),
            StageInput::Package(artifacts) => {
                StageOutput::Export(package_artifacts(&ctx.incident_id, &artifacts)?)
            }
        };
        Ok(output)
    }
}

#[async_trait::async_trait]
impl StageExecutor for DefaultStageExecutor {
    async fn execute(&self, input: StageInput, ctx: UnitContext) -> Result<StageOutput, PipelineError> {
        let stages = self.clone();
        run_blocking(ctx, move |ctx| stages.run(input, ctx)).await
    }
}
