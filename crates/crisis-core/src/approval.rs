//! Artifact approvals

use crate::content::{ArtifactId, ContentArtifact};
use crate::error::ApprovalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Approval state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a decision
    Pending,
    /// Approved for publication
    Approved,
    /// Rejected
    Rejected,
}

impl ApprovalStatus {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Reviewer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    /// Approve
    Approve,
    /// Reject
    Reject,
}

impl FromStr for ApprovalAction {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(ApprovalAction::Approve),
            "reject" => Ok(ApprovalAction::Reject),
            _ => Err(ApprovalError::UnknownAction(s.to_string())),
        }
    }
}

/// Approval record for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Approval id
    pub id: Uuid,
    /// Artifact under review
    pub artifact_id: ArtifactId,
    /// Requesting user
    pub requested_by: String,
    /// Current state
    pub status: ApprovalStatus,
    /// Deciding user
    pub acted_by: Option<String>,
    /// Decision time
    pub acted_at: Option<DateTime<Utc>>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Request time
    pub requested_at: DateTime<Utc>,
}

impl Approval {
    /// Open a pending approval
    #[must_use]
    pub fn request(
        artifact_id: ArtifactId,
        requested_by: impl Into<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact_id,
            requested_by: requested_by.into(),
            status: ApprovalStatus::Pending,
            acted_by: None,
            acted_at: None,
            notes,
            requested_at: now,
        }
    }

    /// Open a pending approval if the artifact requires one
    #[must_use]
    pub fn for_artifact(
        artifact: &ContentArtifact,
        requested_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        artifact
            .approval_required
            .then(|| Self::request(artifact.content_id.clone(), requested_by, None, now))
    }

    /// Record a decision
    ///
    /// Existing notes are kept when `notes` is `None`.
    ///
    /// # Errors
    /// `ApprovalError::NotPending` if already decided.
    pub fn act(
        &mut self,
        action: ApprovalAction,
        user: impl Into<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        if self.status != ApprovalStatus::Pending {
            return Err(ApprovalError::NotPending(self.status.as_str().to_string()));
        }
        self.status = match action {
            ApprovalAction::Approve => ApprovalStatus::Approved,
            ApprovalAction::Reject => ApprovalStatus::Rejected,
        };
        self.acted_by = Some(user.into());
        self.acted_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        tracing::info!(
            approval_id = %self.id,
            artifact_id = %self.artifact_id,
            status = self.status.as_str(),
            "approval decided"
        );
        Ok(())
    }
}
