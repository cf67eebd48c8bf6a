//! Crisis Core - incident-response stages
//!
//! The pure half of the pipeline:
//! - Normalizes a raw incident report into facts and a severity tier
//! - Builds a response plan (timeline, tasks, owners)
//! - Synthesizes communication artifacts from templates
//! - Lints artifact text for legally risky wording
//!
//! Nothing here blocks, spawns or performs I/O; scheduling lives in
//! `crisis-dispatch`.
//!
//! # Example
//!
//! ```rust,ignore
//! use crisis_core::prelude::*;
//!
//! let facts = normalize_value(&payload)?;
//! let plan = PlanBuilder.build(&facts, Utc::now());
//! let request = ContentRequest::from_facts("inc-1", ContentType::HoldingStatement, &facts, &FactMap::new());
//! let artifact = Synthesizer::new().synthesize(&request, Utc::now())?;
//! let linted = LegalLinter::new().lint_artifact(artifact, Utc::now());
//! ```

#![warn(unreachable_pub)]

// Stages
pub mod content;
pub mod intake;
pub mod legal;
pub mod plan;

// Supporting
pub mod approval;
pub mod error;
pub mod export;
pub mod monitor;
pub mod types;

// Re-exports for convenience
pub use approval::{Approval, ApprovalAction, ApprovalStatus};
pub use content::{
    ArtifactId, ContentArtifact, ContentRequest, ContentType, FaqItem, SocialPost, Synthesizer,
    Tone,
};
pub use error::{ApprovalError, ExportError, StageError, ValidationError};
pub use export::{build_export, package_artifacts, ExportPackage, ExportRequest, ExportType};
pub use intake::{classify_severity, normalize, normalize_value, parse_report};
pub use legal::{
    LegalLinter, LintReport, LintRequest, LintSummary, LintedArtifact, Redline, RiskTerm,
    SeverityCounts,
};
pub use monitor::{
    detect_rumors, ingest_mentions, sentiment_series, Mention, MentionRecord, RandomScorer, Rumor,
    SentimentPoint, SentimentScorer,
};
pub use plan::{OwnerRole, PlanBuilder, PlanResult, TaskDependency, TaskItem, TimelineItem};
pub use types::{
    Confidence, Fact, FactMap, IncidentId, IncidentReport, NormalizedFacts, Severity,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the stages
    pub use crate::{
        normalize, normalize_value, ContentArtifact, ContentRequest, ContentType, FactMap,
        IncidentId, LegalLinter, LintedArtifact, NormalizedFacts, PlanBuilder, PlanResult,
        Severity, StageError, Synthesizer,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
