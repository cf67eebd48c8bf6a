//! Crisis Dispatch - queues and workflow sequencing
//!
//! Schedules the crisis-core stages onto named queues:
//! - `interactive`: normalize, plan, synthesize, lint
//! - `monitor`: social-listening ingestion
//! - `exports`: artifact packaging
//!
//! Every unit is time-boxed (soft wind-down signal, hard abort), retried on
//! transient failure within the queue's budget, and deduplicated by unit
//! identity so redelivery is safe.
//!
//! # Example
//!
//! ```rust,ignore
//! use crisis_dispatch::prelude::*;
//! use std::sync::Arc;
//!
//! let dispatcher = Arc::new(Dispatcher::with_default_executor(PipelineConfig::default())?);
//! let workflow = IncidentWorkflow::new(dispatcher);
//! let outcome = workflow.run("inc-1", payload, ArtifactOrder::all()).await?;
//! println!("{} artifacts, {} failed", outcome.artifacts.len(), outcome.failures());
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod pipeline;
pub mod unit;

mod pool;

pub use config::{PipelineConfig, QueueClass, QueuePolicy};
pub use dispatcher::{Dispatcher, Receipt};
pub use error::{ConfigError, PipelineError, TransientExecutionError};
pub use executor::{run_blocking, DefaultStageExecutor, StageExecutor};
pub use ledger::{CompletionLedger, Recorded, UnitOutcome};
pub use pipeline::{ArtifactOrder, IncidentOutcome, IncidentWorkflow};
pub use pool::{DispatcherStats, QueueStats};
pub use unit::{MonitorReport, Stage, StageInput, StageOutput, UnitContext, UnitId, WorkUnit};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running incidents through the dispatcher
    pub use crate::{
        ArtifactOrder, Dispatcher, IncidentOutcome, IncidentWorkflow, PipelineConfig,
        PipelineError, QueueClass, StageExecutor, StageInput, StageOutput, UnitContext, WorkUnit,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
