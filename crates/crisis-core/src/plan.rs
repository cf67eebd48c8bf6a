//! Response plan construction
//!
//! Turns normalized facts into a timeline of milestones and a task graph.
//! Two fixed branches keyed on severity:
//! - high | critical: five milestones, six tasks with an approval chain
//! - medium | low: four milestones, two assessment tasks

use crate::error::ValidationError;
use crate::types::{NormalizedFacts, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role that owns a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerRole {
    /// Communications / public relations
    Pr,
    /// Legal counsel
    Legal,
    /// Executive sign-off
    Exec,
    /// Social media desk
    Social,
}

impl OwnerRole {
    /// Fixed roster, independent of severity
    pub const ROSTER: [OwnerRole; 4] = [
        OwnerRole::Pr,
        OwnerRole::Legal,
        OwnerRole::Exec,
        OwnerRole::Social,
    ];
}

/// One timeline milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    /// Relative label (`T0`, `T+1h`, ...)
    pub label: String,
    /// Absolute time of the milestone
    pub at: DateTime<Utc>,
    /// Offset from the plan reference point, in minutes
    pub offset_minutes: i64,
    /// What is due
    pub description: String,
}

/// One task in the response plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Task title, unique within a plan
    pub title: String,
    /// Owning role
    pub owner_role: OwnerRole,
    /// Deadline
    pub due_at: DateTime<Utc>,
    /// Title of a prerequisite task emitted earlier in the list
    pub depends_on: Option<String>,
    /// 1 = most urgent
    pub priority: u8,
    /// Suggested delivery channel
    pub channel_hint: Option<String>,
}

/// Dependency edge, prerequisite first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    /// Prerequisite task title
    pub from: String,
    /// Dependent task title
    pub to: String,
}

/// Timeline plus task graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Milestones in chronological order
    pub timeline: Vec<TimelineItem>,
    /// Tasks; prerequisites precede dependents
    pub tasks: Vec<TaskItem>,
    /// Owner roster
    pub owners: Vec<OwnerRole>,
    /// Edges derived from `depends_on`
    pub dependencies: Vec<TaskDependency>,
}

impl PlanResult {
    /// Check the task-graph invariants
    ///
    /// - every `depends_on` names a task emitted earlier in the list
    /// - a dependent task is never due before its prerequisite
    ///
    /// # Errors
    /// `ValidationError::Malformed` naming the first offending task.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for task in &self.tasks {
            if let Some(dep) = &task.depends_on {
                let Some(dep_due) = seen.get(dep.as_str()) else {
                    return Err(ValidationError::malformed(
                        "tasks",
                        format!("{:?} depends on unknown or later task {dep:?}", task.title),
                    ));
                };
                if task.due_at < *dep_due {
                    return Err(ValidationError::malformed(
                        "tasks",
                        format!("{:?} is due before its prerequisite {dep:?}", task.title),
                    ));
                }
            }
            seen.insert(task.title.as_str(), task.due_at);
        }
        Ok(())
    }

    /// Find a task by title
    #[must_use]
    pub fn task(&self, title: &str) -> Option<&TaskItem> {
        self.tasks.iter().find(|t| t.title == title)
    }
}

/// Plan builder
///
/// Deterministic given `(severity, now)`. All offsets are computed from the
/// single `now` reading passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanBuilder;

impl PlanBuilder {
    /// Create new plan builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the plan for an incident
    #[must_use]
    pub fn build(&self, facts: &NormalizedFacts, now: DateTime<Utc>) -> PlanResult {
        let (timeline, tasks) = if facts.severity.is_elevated() {
            (Self::elevated_timeline(now), Self::elevated_tasks(now))
        } else {
            (Self::standard_timeline(now), Self::standard_tasks(now))
        };

        let dependencies = tasks
            .iter()
            .filter_map(|t| {
                t.depends_on.as_ref().map(|dep| TaskDependency {
                    from: dep.clone(),
                    to: t.title.clone(),
                })
            })
            .collect();

        tracing::debug!(
            severity = %facts.severity,
            milestones = timeline.len(),
            tasks = tasks.len(),
            "plan built"
        );

        PlanResult {
            timeline,
            tasks,
            owners: OwnerRole::ROSTER.to_vec(),
            dependencies,
        }
    }

    /// Shorthand for building straight from a severity tier
    #[must_use]
    pub fn build_for(&self, severity: Severity, now: DateTime<Utc>) -> PlanResult {
        let facts = NormalizedFacts {
            facts: Vec::new(),
            unknowns: Vec::new(),
            severity,
            jurisdictions: Vec::new(),
            data_categories: Vec::new(),
        };
        self.build(&facts, now)
    }

    fn elevated_timeline(now: DateTime<Utc>) -> Vec<TimelineItem> {
        vec![
            milestone(now, "T0", 0, "Incident detected - immediate response required"),
            milestone(now, "T+1h", 60, "Holding statement due"),
            milestone(now, "T+4h", 4 * 60, "Press release draft due"),
            milestone(now, "T+24h", 24 * 60, "Full disclosure package ready"),
            milestone(now, "T+72h", 72 * 60, "Incident resolution review"),
        ]
    }

    fn standard_timeline(now: DateTime<Utc>) -> Vec<TimelineItem> {
        vec![
            milestone(now, "T0", 0, "Incident detected"),
            milestone(now, "T+4h", 4 * 60, "Initial assessment due"),
            milestone(now, "T+24h", 24 * 60, "Communication plan due"),
            milestone(now, "T+72h", 72 * 60, "Resolution review"),
        ]
    }

    fn elevated_tasks(now: DateTime<Utc>) -> Vec<TaskItem> {
        const DRAFT: &str = "Draft holding statement";
        const LEGAL: &str = "Legal review of holding statement";
        const EXEC: &str = "Executive approval of holding statement";

        vec![
            task(now, DRAFT, OwnerRole::Pr, 30, 1).with_channel("statement"),
            task(now, LEGAL, OwnerRole::Legal, 45, 1).after(DRAFT),
            task(now, EXEC, OwnerRole::Exec, 55, 1).after(LEGAL),
            task(now, "Draft press release", OwnerRole::Pr, 3 * 60, 2).with_channel("press"),
            task(now, "Prepare internal communication", OwnerRole::Pr, 2 * 60, 2)
                .with_channel("internal"),
            task(now, "Update status page", OwnerRole::Pr, 60, 2).with_channel("status_page"),
        ]
    }

    fn standard_tasks(now: DateTime<Utc>) -> Vec<TaskItem> {
        vec![
            task(now, "Assess incident scope", OwnerRole::Pr, 2 * 60, 3),
            task(now, "Draft communication plan", OwnerRole::Pr, 6 * 60, 3),
        ]
    }
}

fn milestone(now: DateTime<Utc>, label: &str, minutes: i64, description: &str) -> TimelineItem {
    TimelineItem {
        label: label.to_string(),
        at: now + Duration::minutes(minutes),
        offset_minutes: minutes,
        description: description.to_string(),
    }
}

fn task(now: DateTime<Utc>, title: &str, owner: OwnerRole, minutes: i64, priority: u8) -> TaskItem {
    TaskItem {
        title: title.to_string(),
        owner_role: owner,
        due_at: now + Duration::minutes(minutes),
        depends_on: None,
        priority,
        channel_hint: None,
    }
}

impl TaskItem {
    fn after(mut self, prerequisite: &str) -> Self {
        self.depends_on = Some(prerequisite.to_string());
        self
    }

    fn with_channel(mut self, channel: &str) -> Self {
        self.channel_hint = Some(channel.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 19, 10, 0, 0).unwrap()
    }

    fn labels(plan: &PlanResult) -> Vec<&str> {
        plan.timeline.iter().map(|t| t.label.as_str()).collect()
    }

    #[test]
    fn critical_plan_shape() {
        let plan = PlanBuilder::new().build_for(Severity::Critical, now());

        assert_eq!(labels(&plan), ["T0", "T+1h", "T+4h", "T+24h", "T+72h"]);
        assert_eq!(plan.tasks.len(), 6);
        assert_eq!(plan.owners, OwnerRole::ROSTER.to_vec());
        assert_eq!(plan.dependencies.len(), 2);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn medium_plan_shape() {
        let plan = PlanBuilder::new().build_for(Severity::Medium, now());

        assert_eq!(labels(&plan), ["T0", "T+4h", "T+24h", "T+72h"]);
        assert_eq!(plan.tasks.len(), 2);
        assert!(plan.tasks.iter().all(|t| t.priority == 3 && t.depends_on.is_none()));
        assert!(plan.dependencies.is_empty());
    }

    #[test]
    fn approval_chain_ordered() {
        let plan = PlanBuilder::new().build_for(Severity::High, now());

        let draft = plan.task("Draft holding statement").unwrap();
        let legal = plan.task("Legal review of holding statement").unwrap();
        let exec = plan.task("Executive approval of holding statement").unwrap();

        assert_eq!(draft.due_at, now() + Duration::minutes(30));
        assert_eq!(legal.depends_on.as_deref(), Some("Draft holding statement"));
        assert_eq!(exec.depends_on.as_deref(), Some("Legal review of holding statement"));
        assert!(draft.due_at <= legal.due_at && legal.due_at <= exec.due_at);
        assert_eq!(legal.owner_role, OwnerRole::Legal);
        assert_eq!(exec.owner_role, OwnerRole::Exec);
    }

    #[test]
    fn remaining_elevated_tasks_unchained() {
        let plan = PlanBuilder::new().build_for(Severity::Critical, now());
        for task in &plan.tasks[3..] {
            assert_eq!(task.priority, 2);
            assert!(task.depends_on.is_none());
        }
    }

    #[test]
    fn validate_rejects_forward_reference() {
        let mut plan = PlanBuilder::new().build_for(Severity::High, now());
        plan.tasks.swap(0, 1);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_deadline() {
        let mut plan = PlanBuilder::new().build_for(Severity::High, now());
        plan.tasks[1].due_at = now();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn deterministic_given_now() {
        let builder = PlanBuilder::new();
        assert_eq!(
            builder.build_for(Severity::High, now()),
            builder.build_for(Severity::High, now())
        );
    }

    fn any_severity() -> impl Strategy<Value = Severity> {
        prop::sample::select(Severity::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn plan_counts_follow_severity(severity in any_severity(), offset in 0i64..1_000_000) {
            let at = now() + Duration::seconds(offset);
            let plan = PlanBuilder::new().build_for(severity, at);

            if severity.is_elevated() {
                prop_assert_eq!(plan.timeline.len(), 5);
                prop_assert_eq!(plan.tasks.len(), 6);
            } else {
                prop_assert_eq!(plan.timeline.len(), 4);
                prop_assert_eq!(plan.tasks.len(), 2);
            }
            prop_assert!(plan.validate().is_ok());
            prop_assert_eq!(plan.timeline[0].at, at);
        }
    }
}
