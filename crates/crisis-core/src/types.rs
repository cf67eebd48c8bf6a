//! Core types for the incident pipeline
//!
//! Defines the records handed between stages:
//! - Incident identity and severity tiers
//! - Submitted incident reports
//! - Normalized facts derived from a report

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Incident identifier assigned by the request-facing API
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub String);

impl IncidentId {
    /// Wrap an upstream identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Severity tier, ordered `low < medium < high < critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Declared but never produced by the intake classifier
    Low,
    /// Fewer than 100 affected users
    Medium,
    /// 100 to 10,000 affected users
    High,
    /// More than 10,000 affected users
    Critical,
}

impl Severity {
    /// All tiers in ascending order
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High or critical: tight timeline, approval chain, urgent tone
    #[inline]
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        *self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(ValidationError::malformed(
                "severity",
                format!("expected low|medium|high|critical, got {other:?}"),
            )),
        }
    }
}

/// Confidence label attached to an extracted fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Weak evidence
    Low,
    /// Estimated value
    Medium,
    /// Directly reported
    High,
}

/// Incident as submitted by the request-facing API
///
/// Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentReport {
    /// Short headline
    pub title: String,
    /// Free-text description
    pub description: String,
    /// When the incident was detected
    pub detected_at: DateTime<Utc>,
    /// Affected user count (0 when unknown)
    pub affected_users: u64,
    /// Data categories involved (e.g. `email`, `payment`)
    pub data_types: Vec<String>,
    /// Jurisdictions involved (e.g. `EU`, `US-CA`)
    pub jurisdictions: Vec<String>,
}

/// One extracted fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Fact name
    pub label: String,
    /// Rendered value
    pub value: String,
    /// Extraction confidence
    pub confidence: Confidence,
}

impl Fact {
    /// Create new fact
    #[inline]
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            confidence,
        }
    }
}

/// Output of intake normalization
///
/// Derived once from an [`IncidentReport`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFacts {
    /// Extracted facts, in extraction order
    pub facts: Vec<Fact>,
    /// Identifiers of facts that could not be established
    pub unknowns: Vec<String>,
    /// Severity tier
    pub severity: Severity,
    /// Jurisdictions involved
    pub jurisdictions: Vec<String>,
    /// Data categories involved
    pub data_categories: Vec<String>,
}

impl NormalizedFacts {
    /// Look up a fact value by label
    #[must_use]
    pub fn fact(&self, label: &str) -> Option<&str> {
        self.facts
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    /// Whether an unknown was flagged
    #[inline]
    #[must_use]
    pub fn is_unknown(&self, id: &str) -> bool {
        self.unknowns.iter().any(|u| u == id)
    }
}

/// Structured facts fed to content synthesis
pub type FactMap = BTreeMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_elevated() {
        assert!(!Severity::Low.is_elevated());
        assert!(!Severity::Medium.is_elevated());
        assert!(Severity::High.is_elevated());
        assert!(Severity::Critical.is_elevated());
    }

    #[test]
    fn severity_parse() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!(" medium ".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: Severity = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(back, Severity::Low);
    }

    #[test]
    fn normalized_fact_lookup() {
        let facts = NormalizedFacts {
            facts: vec![Fact::new("title", "Outage", Confidence::High)],
            unknowns: vec!["exact_user_count".to_string()],
            severity: Severity::Medium,
            jurisdictions: vec![],
            data_categories: vec![],
        };
        assert_eq!(facts.fact("title"), Some("Outage"));
        assert_eq!(facts.fact("missing"), None);
        assert!(facts.is_unknown("exact_user_count"));
    }
}
