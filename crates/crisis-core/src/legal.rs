//! Legal risk linting
//!
//! Literal, case-insensitive scan of artifact text for risky wording. Each
//! risk term is scanned left to right without overlap; different terms are
//! scanned independently, so their matches may overlap each other.
//!
//! Offsets are character offsets into the linted body.

use crate::content::{ArtifactId, ContentArtifact};
use crate::error::ValidationError;
use crate::types::{IncidentId, Severity};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Default risk terms and their replacements, in scan order
pub const DEFAULT_RISK_TERMS: [(&str, &str); 6] = [
    ("breach", "security incident"),
    ("hack", "unauthorized access"),
    ("stolen", "accessed"),
    ("guarantee", "aim to"),
    ("promise", "intend to"),
    ("never", "do not typically"),
];

/// Terms that read as factual admissions
const ADMISSION_TERMS: [&str; 3] = ["breach", "hack", "stolen"];

/// One risk term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTerm {
    /// Term to find (matched case-insensitively)
    pub term: String,
    /// Lowercase replacement to suggest
    pub replacement: String,
    /// Severity assigned to every match
    pub severity: Severity,
}

impl RiskTerm {
    /// Create new risk term
    #[must_use]
    pub fn new(term: impl Into<String>, replacement: impl Into<String>, severity: Severity) -> Self {
        Self {
            term: term.into(),
            replacement: replacement.into(),
            severity,
        }
    }
}

/// Flagged span of risky wording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redline {
    /// Start character offset (inclusive)
    pub start: usize,
    /// End character offset (exclusive)
    pub end: usize,
    /// Original-cased matched text
    pub original: String,
    /// Suggested replacement
    pub suggestion: String,
    /// Why the span was flagged
    pub reason: String,
    /// Severity bucket
    pub severity: Severity,
}

impl Redline {
    /// Slice `body` at this redline's character span
    #[must_use]
    pub fn slice<'a>(&self, body: &'a str) -> Option<&'a str> {
        let byte_at = |char_idx: usize| {
            body.char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(body.len()))
                .nth(char_idx)
        };
        let start = byte_at(self.start)?;
        let end = byte_at(self.end)?;
        body.get(start..end)
    }
}

/// Per-severity redline counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Reserved; no default term is critical
    pub critical: usize,
    /// Admission-style terms
    pub high: usize,
    /// All other terms
    pub medium: usize,
    /// Reserved; no default term is low
    pub low: usize,
}

impl SeverityCounts {
    /// Sum of all buckets
    #[inline]
    #[must_use]
    pub fn sum(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    /// Count for one bucket
    #[inline]
    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// Tally of a redline list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintSummary {
    /// Number of redlines
    pub total: usize,
    /// Partition by severity
    pub by_severity: SeverityCounts,
}

impl LintSummary {
    /// Tally a redline list
    #[must_use]
    pub fn tally(redlines: &[Redline]) -> Self {
        let mut by_severity = SeverityCounts::default();
        for r in redlines {
            by_severity.bump(r.severity);
        }
        Self {
            total: redlines.len(),
            by_severity,
        }
    }
}

/// Lint request for one artifact body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintRequest {
    /// Owning incident
    pub incident_id: IncidentId,
    /// Artifact being linted
    pub artifact_id: ArtifactId,
    /// Body text
    pub content: String,
    /// Jurisdiction the text is published in
    #[serde(default)]
    pub jurisdiction: Option<String>,
    /// Data categories involved
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Redlines plus summary for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    /// Linted artifact
    pub artifact_id: ArtifactId,
    /// Owning incident
    pub incident_id: IncidentId,
    /// Flagged spans, grouped by term in table order
    pub redlines: Vec<Redline>,
    /// Tally of `redlines`
    pub summary: LintSummary,
    /// Lint time
    pub generated_at: DateTime<Utc>,
}

/// Artifact paired with its lint report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintedArtifact {
    /// Synthesized artifact
    pub artifact: ContentArtifact,
    /// Lint result for `artifact.content`
    pub lint: LintReport,
}

impl LintedArtifact {
    /// Whether any high or critical redline was raised
    #[inline]
    #[must_use]
    pub fn has_elevated_redlines(&self) -> bool {
        self.lint.redlines.iter().any(|r| r.severity.is_elevated())
    }
}

/// Risk term paired with its compiled matcher
#[derive(Debug, Clone)]
struct Rule {
    risk: RiskTerm,
    pattern: Regex,
}

impl Rule {
    fn compile(risk: RiskTerm) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&regex::escape(&risk.term))
            .case_insensitive(true)
            .build()?;
        Ok(Self { risk, pattern })
    }
}

/// Risk-term scanner
///
/// Each term is compiled once into an escaped, case-insensitive literal
/// pattern when the linter is built.
#[derive(Debug, Clone)]
pub struct LegalLinter {
    rules: Vec<Rule>,
}

impl Default for LegalLinter {
    fn default() -> Self {
        let rules = DEFAULT_RISK_TERMS
            .iter()
            .map(|(term, replacement)| {
                let severity = if ADMISSION_TERMS.contains(term) {
                    Severity::High
                } else {
                    Severity::Medium
                };
                RiskTerm::new(*term, *replacement, severity)
            })
            .filter_map(|risk| Rule::compile(risk).ok())
            .collect();
        Self { rules }
    }
}

impl LegalLinter {
    /// Linter with the default term table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Linter with a custom ordered term table
    ///
    /// Empty terms are dropped.
    ///
    /// # Errors
    /// `ValidationError::Malformed` if a term cannot be compiled.
    pub fn with_terms(terms: Vec<RiskTerm>) -> Result<Self, ValidationError> {
        let rules = terms
            .into_iter()
            .filter(|t| !t.term.is_empty())
            .map(|risk| {
                Rule::compile(risk).map_err(|e| ValidationError::malformed("risk_terms", e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    /// Active term table, in scan order
    pub fn terms(&self) -> impl Iterator<Item = &RiskTerm> + '_ {
        self.rules.iter().map(|rule| &rule.risk)
    }

    /// Scan a body and return redlines with their summary
    #[must_use]
    pub fn lint(&self, body: &str) -> (Vec<Redline>, LintSummary) {
        let mut redlines = Vec::new();

        for Rule { risk, pattern } in &self.rules {
            // (byte, char) position after the previous match
            let mut cursor = (0, 0);
            for m in pattern.find_iter(body) {
                let start = cursor.1 + body[cursor.0..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                cursor = (m.end(), end);

                redlines.push(Redline {
                    start,
                    end,
                    original: m.as_str().to_string(),
                    suggestion: risk.replacement.clone(),
                    reason: format!(
                        "Replace '{}' with '{}' to reduce liability/exposure.",
                        risk.term, risk.replacement
                    ),
                    severity: risk.severity,
                });
            }
        }

        let summary = LintSummary::tally(&redlines);
        (redlines, summary)
    }

    /// Lint a request into a full report
    #[must_use]
    pub fn lint_request(&self, request: &LintRequest, now: DateTime<Utc>) -> LintReport {
        let (redlines, summary) = self.lint(&request.content);
        tracing::debug!(
            incident_id = %request.incident_id,
            artifact_id = %request.artifact_id,
            total = summary.total,
            high = summary.by_severity.high,
            "legal lint completed"
        );
        LintReport {
            artifact_id: request.artifact_id.clone(),
            incident_id: request.incident_id.clone(),
            redlines,
            summary,
            generated_at: now,
        }
    }
}

impl LegalLinter {
    /// Lint a synthesized artifact
    #[must_use]
    pub fn lint_artifact(&self, artifact: ContentArtifact, now: DateTime<Utc>) -> LintedArtifact {
        let request = LintRequest {
            incident_id: artifact.incident_id.clone(),
            artifact_id: artifact.content_id.clone(),
            content: artifact.content.clone(),
            jurisdiction: None,
            categories: Vec::new(),
        };
        let lint = self.lint_request(&request, now);
        LintedArtifact { artifact, lint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn guarantee_and_never_flagged_medium() {
        let body = "We can guarantee this will never happen again";
        let (redlines, summary) = LegalLinter::new().lint(body);

        assert_eq!(redlines.len(), 2);
        assert_eq!(redlines[0].original, "guarantee");
        assert_eq!(redlines[0].suggestion, "aim to");
        assert_eq!(redlines[0].severity, Severity::Medium);
        assert_eq!(redlines[1].original, "never");
        assert_eq!(redlines[1].suggestion, "do not typically");
        assert_eq!(redlines[1].severity, Severity::Medium);

        assert_eq!(summary.total, 2);
        assert_eq!(
            summary.by_severity,
            SeverityCounts { critical: 0, high: 0, medium: 2, low: 0 }
        );
    }

    #[test]
    fn admission_terms_are_high_and_keep_case() {
        let (redlines, summary) = LegalLinter::new().lint("Data BREACH: credentials were Stolen");

        assert_eq!(redlines.len(), 2);
        assert_eq!(redlines[0].original, "BREACH");
        assert_eq!((redlines[0].start, redlines[0].end), (5, 11));
        assert_eq!(redlines[1].original, "Stolen");
        assert_eq!(summary.by_severity.high, 2);
        assert!(redlines[0].reason.contains("'breach' with 'security incident'"));
    }

    #[test]
    fn repeated_term_does_not_overlap_itself() {
        let (redlines, _) = LegalLinter::new().lint("never, Never, NEVER");
        let spans: Vec<_> = redlines.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(0, 5), (7, 12), (14, 19)]);
    }

    #[test]
    fn different_terms_may_overlap() {
        let linter = LegalLinter::with_terms(vec![
            RiskTerm::new("hack", "unauthorized access", Severity::High),
            RiskTerm::new("hacker", "unauthorized party", Severity::Medium),
        ])
        .unwrap();
        let (redlines, summary) = linter.lint("a hacker");
        assert_eq!(redlines.len(), 2);
        assert_eq!((redlines[0].start, redlines[0].end), (2, 6));
        assert_eq!((redlines[1].start, redlines[1].end), (2, 8));
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn offsets_are_characters() {
        let body = "Café résumé: we promise";
        let (redlines, _) = LegalLinter::new().lint(body);
        assert_eq!(redlines.len(), 1);
        assert_eq!(redlines[0].start, 16);
        assert_eq!(redlines[0].slice(body), Some("promise"));
        assert!(redlines[0].end <= body.chars().count());
    }

    #[test]
    fn clean_text_has_empty_summary() {
        let (redlines, summary) = LegalLinter::new().lint("We are investigating.");
        assert!(redlines.is_empty());
        assert_eq!(summary, LintSummary::default());
    }

    #[test]
    fn lint_request_builds_report() {
        let request = LintRequest {
            incident_id: IncidentId::new("inc-1"),
            artifact_id: ArtifactId("faq_inc-1_20241219_100000_1".to_string()),
            content: "We promise a fix".to_string(),
            jurisdiction: Some("EU".to_string()),
            categories: vec![],
        };
        let now = Utc::now();
        let report = LegalLinter::new().lint_request(&request, now);
        assert_eq!(report.artifact_id, request.artifact_id);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.generated_at, now);
    }

    #[test]
    fn custom_table_drops_empty_terms() {
        let linter = LegalLinter::with_terms(vec![RiskTerm::new("", "x", Severity::Low)]).unwrap();
        assert_eq!(linter.terms().count(), 0);
        assert!(linter.lint("anything").0.is_empty());
    }

    #[test]
    fn default_table_compiles_in_order() {
        let linter = LegalLinter::new();
        let terms: Vec<_> = linter.terms().map(|t| t.term.as_str()).collect();
        let expected: Vec<_> = DEFAULT_RISK_TERMS.iter().map(|(term, _)| *term).collect();
        assert_eq!(terms, expected);
    }

    #[test]
    fn metacharacters_in_terms_match_literally() {
        let linter = LegalLinter::with_terms(vec![RiskTerm::new("100% (safe)", "well protected", Severity::Medium)])
            .unwrap();
        let (redlines, _) = linter.lint("Your data is 100% (SAFE). 100 percent safe.");
        assert_eq!(redlines.len(), 1);
        assert_eq!(redlines[0].original, "100% (SAFE)");
        assert_eq!((redlines[0].start, redlines[0].end), (13, 24));
    }

    #[test]
    fn offsets_after_multibyte_matches() {
        let body = "Naïve promise, naïve PROMISE";
        let (redlines, _) = LegalLinter::new().lint(body);
        let spans: Vec<_> = redlines.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(6, 13), (21, 28)]);
        for r in &redlines {
            assert!(r.slice(body).unwrap().eq_ignore_ascii_case("promise"));
        }
    }

    proptest! {
        #[test]
        fn spans_match_terms(body in "[a-zA-Z ,.]{0,40}(breach|Hack|STOLEN|guarantee|promise|never)[a-zA-Z ,.é]{0,40}") {
            let linter = LegalLinter::new();
            let (redlines, summary) = linter.lint(&body);
            let len = body.chars().count();

            prop_assert!(!redlines.is_empty());
            for r in &redlines {
                prop_assert!(r.start < r.end && r.end <= len);
                let slice = r.slice(&body).unwrap();
                prop_assert_eq!(slice, r.original.as_str());
                prop_assert!(linter.terms().any(|t| t.term.eq_ignore_ascii_case(slice)));
            }
            prop_assert_eq!(summary.total, redlines.len());
            prop_assert_eq!(summary.by_severity.sum(), summary.total);
            prop_assert_eq!(summary.by_severity.critical, 0);
            prop_assert_eq!(summary.by_severity.low, 0);
        }
    }
}
