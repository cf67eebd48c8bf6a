//! Content synthesis
//!
//! Deterministic template assembly over structured incident facts. One
//! renderer per [`ContentType`]:
//! - Holding statement: immediate, short acknowledgement
//! - Press release: formal sectioned release, always needs approval
//! - Internal memo: employee-facing update
//! - FAQ: priority-ordered question/answer set
//! - Social media: per-platform short posts

pub mod faq;
pub mod holding_statement;
pub mod internal_memo;
pub mod press_release;
pub mod social_media;

pub use faq::FaqItem;
pub use social_media::SocialPost;

use crate::error::{StageError, ValidationError};
use crate::types::{FactMap, IncidentId, NormalizedFacts, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Closed set of artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Immediate acknowledgement
    HoldingStatement,
    /// Formal press release
    PressRelease,
    /// Employee-facing memo
    InternalMemo,
    /// Question/answer set
    Faq,
    /// Per-platform social posts
    SocialMedia,
}

impl ContentType {
    /// Every content type, in canonical order
    pub const ALL: [ContentType; 5] = [
        ContentType::HoldingStatement,
        ContentType::PressRelease,
        ContentType::InternalMemo,
        ContentType::Faq,
        ContentType::SocialMedia,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::HoldingStatement => "holding_statement",
            ContentType::PressRelease => "press_release",
            ContentType::InternalMemo => "internal_memo",
            ContentType::Faq => "faq",
            ContentType::SocialMedia => "social_media",
        }
    }

    /// Artifact id prefix
    #[inline]
    #[must_use]
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ContentType::HoldingStatement => "holding",
            ContentType::PressRelease => "press",
            ContentType::InternalMemo => "memo",
            ContentType::Faq => "faq",
            ContentType::SocialMedia => "social",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| StageError::UnknownContentType(s.to_string()))
    }
}

/// Tone hint supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Neutral corporate register
    #[default]
    Professional,
    /// Apologetic, people-first
    Empathetic,
    /// Engineering detail
    Technical,
    /// Time-critical
    Urgent,
}

/// One synthesis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Incident the artifact belongs to
    pub incident_id: IncidentId,
    /// Artifact kind
    pub content_type: ContentType,
    /// Structured facts (`incident_type`, `affected_systems`, ...)
    pub incident_facts: FactMap,
    /// Severity tier
    pub severity: Severity,
    /// Audience segments
    #[serde(default)]
    pub target_audience: Vec<String>,
    /// Tone hint
    #[serde(default)]
    pub tone: Tone,
    /// Free-text instructions, recorded in metadata
    #[serde(default)]
    pub custom_instructions: Option<String>,
    /// Template substitutions (`company_name`, `location`, `platforms`)
    #[serde(default)]
    pub template_variables: BTreeMap<String, String>,
}

/// Wire shape before the selector and severity are checked
#[derive(Deserialize)]
struct RawContentRequest {
    incident_id: Option<String>,
    content_type: Option<String>,
    incident_facts: Option<FactMap>,
    severity: Option<String>,
    #[serde(default)]
    target_audience: Vec<String>,
    #[serde(default)]
    tone: Tone,
    #[serde(default)]
    custom_instructions: Option<String>,
    #[serde(default)]
    template_variables: BTreeMap<String, String>,
}

impl ContentRequest {
    /// Create a request with default audience, tone and variables
    #[must_use]
    pub fn new(
        incident_id: impl Into<IncidentId>,
        content_type: ContentType,
        severity: Severity,
        incident_facts: FactMap,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            content_type,
            incident_facts,
            severity,
            target_audience: Vec::new(),
            tone: Tone::default(),
            custom_instructions: None,
            template_variables: BTreeMap::new(),
        }
    }

    /// Derive a request from normalized facts, merged with caller facts
    ///
    /// Caller facts win over derived ones.
    #[must_use]
    pub fn from_facts(
        incident_id: impl Into<IncidentId>,
        content_type: ContentType,
        facts: &NormalizedFacts,
        extra: &FactMap,
    ) -> Self {
        let mut merged = FactMap::new();
        if let Some(title) = facts.fact("title") {
            merged.insert("incident_type".to_string(), Value::from(title));
        }
        if let Some(detected) = facts.fact("detected_at") {
            merged.insert("detected_time".to_string(), Value::from(detected));
        }
        if let Some(users) = facts.fact("affected_users") {
            merged.insert("affected_users".to_string(), Value::from(format!("{users} users")));
        }
        merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::new(incident_id, content_type, facts.severity, merged)
    }

    /// With audience segments
    #[inline]
    #[must_use]
    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.target_audience = audience;
        self
    }

    /// With tone hint
    #[inline]
    #[must_use]
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// With a template variable
    #[inline]
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_variables.insert(key.into(), value.into());
        self
    }

    /// With custom instructions
    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }

    /// Parse a loosely-typed request
    ///
    /// # Errors
    /// - `UnknownContentType` for an unrecognised selector
    /// - `Validation` for missing or malformed fields
    pub fn from_value(payload: &Value) -> Result<Self, StageError> {
        let raw: RawContentRequest = serde_json::from_value(payload.clone())
            .map_err(|e| ValidationError::malformed("request", e.to_string()))?;

        let incident_id = raw
            .incident_id
            .ok_or(ValidationError::MissingField("incident_id"))?;
        let content_type: ContentType = raw
            .content_type
            .ok_or(ValidationError::MissingField("content_type"))?
            .parse()?;
        let severity: Severity = raw
            .severity
            .ok_or(ValidationError::MissingField("severity"))?
            .parse()?;
        let incident_facts = raw
            .incident_facts
            .ok_or(ValidationError::MissingField("incident_facts"))?;

        let request = Self {
            incident_id: IncidentId::new(incident_id),
            content_type,
            incident_facts,
            severity,
            target_audience: raw.target_audience,
            tone: raw.tone,
            custom_instructions: raw.custom_instructions,
            template_variables: raw.template_variables,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the fields every renderer relies on
    ///
    /// # Errors
    /// `EmptyField("incident_id")` for a blank incident id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.incident_id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyField("incident_id"));
        }
        Ok(())
    }

    /// Fact rendered as text, or `default` when absent
    pub(crate) fn fact_str(&self, key: &str, default: &str) -> String {
        match self.incident_facts.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
            Some(other) => other.to_string(),
        }
    }

    /// Fact rendered as a list of strings
    pub(crate) fn fact_list(&self, key: &str) -> Vec<String> {
        match self.incident_facts.get(key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(value_text).collect(),
            Some(other) => vec![value_text(other)],
        }
    }

    /// Template variable, or `default` when absent
    pub(crate) fn variable(&self, key: &str, default: &str) -> String {
        self.template_variables
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Artifact identity
///
/// `{prefix}_{incident}_{YYYYmmdd_HHMMSS}_{sequence}`; the sequence keeps
/// ids unique for repeated generation within the same second.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    /// Compose an artifact id
    #[must_use]
    pub fn compose(
        content_type: ContentType,
        incident_id: &IncidentId,
        at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self(format!(
            "{}_{}_{}_{sequence}",
            content_type.id_prefix(),
            incident_id,
            at.format("%Y%m%d_%H%M%S"),
        ))
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generated communication deliverable
///
/// Created once per synthesis call; immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentArtifact {
    /// Unique identity
    pub content_id: ArtifactId,
    /// Incident the artifact belongs to
    pub incident_id: IncidentId,
    /// Artifact kind
    pub content_type: ContentType,
    /// Display title
    pub title: String,
    /// Rendered body
    pub content: String,
    /// Renderer-specific metadata
    pub metadata: BTreeMap<String, Value>,
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Template version
    pub version: String,
    /// Static per-type confidence in `[0, 1]`
    pub confidence_score: f64,
    /// Static per-type review suggestions
    pub suggested_revisions: Vec<String>,
    /// Static per-type legal reminders
    pub legal_flags: Vec<String>,
    /// Whether sign-off is needed before publishing
    pub approval_required: bool,
}

/// Renderer output before identity is assigned
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) metadata: BTreeMap<String, Value>,
    pub(crate) confidence: f64,
    pub(crate) suggested_revisions: &'static [&'static str],
    pub(crate) legal_flags: &'static [&'static str],
    pub(crate) approval_required: bool,
}

/// Shared metadata every renderer starts from
pub(crate) fn base_metadata(request: &ContentRequest, tone: &str, body: &str) -> BTreeMap<String, Value> {
    let mut meta = BTreeMap::new();
    meta.insert("severity".to_string(), Value::from(request.severity.as_str()));
    meta.insert("tone".to_string(), Value::from(tone));
    meta.insert(
        "target_audience".to_string(),
        Value::from(request.target_audience.clone()),
    );
    meta.insert(
        "word_count".to_string(),
        Value::from(body.split_whitespace().count()),
    );
    meta
}

/// Capitalise the first letter of every word
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Content synthesizer
///
/// Stateless apart from the sequence counter used for artifact identity.
#[derive(Debug, Default)]
pub struct Synthesizer {
    sequence: AtomicU64,
}

impl Synthesizer {
    /// Create new synthesizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one artifact
    ///
    /// # Errors
    /// `Validation` if the request is missing required fields.
    pub fn synthesize(
        &self,
        request: &ContentRequest,
        now: DateTime<Utc>,
    ) -> Result<ContentArtifact, StageError> {
        request.validate()?;

        let draft = match request.content_type {
            ContentType::HoldingStatement => holding_statement::render(request),
            ContentType::PressRelease => press_release::render(request, now),
            ContentType::InternalMemo => internal_memo::render(request),
            ContentType::Faq => faq::render(request),
            ContentType::SocialMedia => social_media::render(request),
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let content_id = ArtifactId::compose(request.content_type, &request.incident_id, now, sequence);

        let mut metadata = draft.metadata;
        metadata.insert("requested_tone".to_string(), serde_json::to_value(request.tone).unwrap_or(Value::Null));
        if let Some(instructions) = &request.custom_instructions {
            metadata.insert("custom_instructions".to_string(), Value::from(instructions.as_str()));
        }

        tracing::debug!(
            incident_id = %request.incident_id,
            artifact_id = %content_id,
            content_type = %request.content_type,
            "artifact synthesized"
        );

        Ok(ContentArtifact {
            content_id,
            incident_id: request.incident_id.clone(),
            content_type: request.content_type,
            title: draft.title,
            content: draft.body,
            metadata,
            generated_at: now,
            version: "1.0".to_string(),
            confidence_score: draft.confidence,
            suggested_revisions: draft.suggested_revisions.iter().map(|s| (*s).to_string()).collect(),
            legal_flags: draft.legal_flags.iter().map(|s| (*s).to_string()).collect(),
            approval_required: draft.approval_required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 19, 10, 30, 5).unwrap()
    }

    fn facts(value: Value) -> FactMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn content_type_round_trips_wire_name() {
        for t in ContentType::ALL {
            assert_eq!(t.as_str().parse::<ContentType>().unwrap(), t);
        }
        assert!(matches!(
            "tweetstorm".parse::<ContentType>(),
            Err(StageError::UnknownContentType(_))
        ));
    }

    #[test]
    fn artifact_id_format() {
        let id = ArtifactId::compose(ContentType::Faq, &IncidentId::new("inc-7"), now(), 3);
        assert_eq!(id.as_str(), "faq_inc-7_20241219_103005_3");
    }

    #[test]
    fn ids_unique_within_same_second() {
        let synth = Synthesizer::new();
        let req = ContentRequest::new("inc-1", ContentType::HoldingStatement, Severity::High, FactMap::new());
        let a = synth.synthesize(&req, now()).unwrap();
        let b = synth.synthesize(&req, now()).unwrap();
        assert_ne!(a.content_id, b.content_id);
        assert_eq!(a.content, b.content);
    }

    #[test]
    fn every_type_has_static_review_lists() {
        let synth = Synthesizer::new();
        for t in ContentType::ALL {
            let req = ContentRequest::new("inc-1", t, Severity::Medium, facts(json!({"incident_type": "outage"})));
            let artifact = synth.synthesize(&req, now()).unwrap();
            assert!((0.80..=0.90).contains(&artifact.confidence_score), "{t}");
            assert!(!artifact.suggested_revisions.is_empty(), "{t}");
            assert!(!artifact.legal_flags.is_empty(), "{t}");
            assert_eq!(artifact.content_type, t);
            assert!(artifact.content_id.as_str().starts_with(t.id_prefix()));
        }
    }

    #[test]
    fn from_value_rejects_unknown_selector() {
        let payload = json!({
            "incident_id": "inc-1",
            "content_type": "blog_post",
            "incident_facts": {},
            "severity": "high",
        });
        assert!(matches!(
            ContentRequest::from_value(&payload),
            Err(StageError::UnknownContentType(t)) if t == "blog_post"
        ));
    }

    #[test]
    fn from_value_requires_facts_and_severity() {
        let payload = json!({
            "incident_id": "inc-1",
            "content_type": "faq",
            "severity": "high",
        });
        assert_eq!(
            ContentRequest::from_value(&payload).unwrap_err(),
            StageError::Validation(ValidationError::MissingField("incident_facts"))
        );

        let payload = json!({
            "incident_id": "inc-1",
            "content_type": "faq",
            "incident_facts": {},
            "severity": "apocalyptic",
        });
        assert!(matches!(
            ContentRequest::from_value(&payload),
            Err(StageError::Validation(ValidationError::Malformed { field: "severity", .. }))
        ));
    }

    #[test]
    fn from_value_applies_defaults() {
        let payload = json!({
            "incident_id": "inc-1",
            "content_type": "press_release",
            "incident_facts": {"incident_type": "data breach"},
            "severity": "critical",
        });
        let req = ContentRequest::from_value(&payload).unwrap();
        assert_eq!(req.content_type, ContentType::PressRelease);
        assert_eq!(req.tone, Tone::Professional);
        assert!(req.template_variables.is_empty());
    }

    #[test]
    fn blank_incident_id_rejected() {
        let synth = Synthesizer::new();
        let req = ContentRequest::new("  ", ContentType::Faq, Severity::Low, FactMap::new());
        assert_eq!(
            synth.synthesize(&req, now()).unwrap_err(),
            StageError::Validation(ValidationError::EmptyField("incident_id"))
        );
    }

    #[test]
    fn request_from_normalized_facts() {
        let normalized = crate::intake::normalize_value(&json!({
            "title": "Login outage",
            "description": "SSO down",
            "detected_at": "2024-12-19T09:00:00Z",
            "affected_users": 500,
            "data_types": ["email"],
            "jurisdictions": [],
        }))
        .unwrap();
        let extra = facts(json!({"affected_systems": ["sso"]}));
        let req = ContentRequest::from_facts("inc-9", ContentType::Faq, &normalized, &extra);

        assert_eq!(req.severity, Severity::High);
        assert_eq!(req.fact_str("incident_type", ""), "Login outage");
        assert_eq!(req.fact_str("affected_users", ""), "500 users");
        assert_eq!(req.fact_list("affected_systems"), vec!["sso".to_string()]);
    }

    #[test]
    fn custom_instructions_recorded() {
        let synth = Synthesizer::new();
        let req = ContentRequest::new("inc-1", ContentType::InternalMemo, Severity::Low, FactMap::new())
            .with_instructions("Mention the on-call rota")
            .with_tone(Tone::Empathetic);
        let artifact = synth.synthesize(&req, now()).unwrap();
        assert_eq!(artifact.metadata["custom_instructions"], json!("Mention the on-call rota"));
        assert_eq!(artifact.metadata["requested_tone"], json!("empathetic"));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("data breach"), "Data Breach");
        assert_eq!(title_case("SERVICE outage"), "Service Outage");
        assert_eq!(title_case("log-in issue"), "Log-In Issue");
    }
}
