//! Holding statement renderer

use super::{base_metadata, title_case, ContentRequest, Draft};
use serde_json::Value;

/// Sentence appended for high and critical incidents
pub const EMERGENCY_CONTACT_LINE: &str =
    "If you are experiencing urgent issues, please contact our emergency support line.";

/// At most this many affected systems are listed
const MAX_LISTED_SYSTEMS: usize = 3;

pub(crate) fn render(request: &ContentRequest) -> Draft {
    let incident_type = request.fact_str("incident_type", "incident");
    let user_impact = request.fact_str("user_impact", "some users");
    let affected_systems = request.fact_list("affected_systems");

    let (tone, urgency) = if request.severity.is_elevated() {
        ("urgent", "immediately")
    } else {
        ("professional", "promptly")
    };

    let mut body = format!(
        "We are aware of a {incident_type} that may be affecting {user_impact}. \
         Our team is {urgency} investigating the situation and working to resolve any issues.\n\n\
         We will provide updates as more information becomes available. \
         We apologize for any inconvenience this may cause.\n\n\
         For the latest status updates, please visit our status page or contact our support team."
    );

    if request.severity.is_elevated() {
        body.push_str("\n\n");
        body.push_str(EMERGENCY_CONTACT_LINE);
    }

    if !affected_systems.is_empty() {
        let listed: Vec<&str> = affected_systems
            .iter()
            .take(MAX_LISTED_SYSTEMS)
            .map(String::as_str)
            .collect();
        body.push_str(&format!("\n\nAffected systems: {}", listed.join(", ")));
    }

    let mut metadata = base_metadata(request, tone, &body);
    metadata.insert("estimated_read_time".to_string(), Value::from("30 seconds"));

    Draft {
        title: format!("Holding Statement - {}", title_case(&incident_type)),
        body,
        metadata,
        confidence: 0.85,
        suggested_revisions: &[
            "Review for accuracy of affected systems",
            "Verify contact information",
            "Consider adding timeline for next update",
        ],
        legal_flags: &["Ensure no admission of liability", "Verify factual accuracy"],
        approval_required: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentType, Synthesizer};
    use crate::types::{FactMap, Severity};
    use chrono::Utc;
    use serde_json::json;

    fn request(severity: Severity, facts: Value) -> ContentRequest {
        let facts: FactMap = serde_json::from_value(facts).unwrap();
        ContentRequest::new("inc-1", ContentType::HoldingStatement, severity, facts)
    }

    #[test]
    fn critical_breach_is_urgent() {
        let artifact = Synthesizer::new()
            .synthesize(&request(Severity::Critical, json!({"incident_type": "data breach"})), Utc::now())
            .unwrap();

        assert!(artifact.content.contains("immediately"));
        assert!(artifact.content.contains(EMERGENCY_CONTACT_LINE));
        assert_eq!(artifact.title, "Holding Statement - Data Breach");
        assert_eq!(artifact.metadata["tone"], json!("urgent"));
        assert!(artifact.approval_required);
    }

    #[test]
    fn medium_is_prompt_without_emergency_line() {
        let draft = render(&request(Severity::Medium, json!({})));

        assert!(draft.body.contains("promptly"));
        assert!(!draft.body.contains("immediately"));
        assert!(!draft.body.contains(EMERGENCY_CONTACT_LINE));
        assert!(draft.body.starts_with("We are aware of a incident that may be affecting some users."));
    }

    #[test]
    fn lists_first_three_systems() {
        let draft = render(&request(
            Severity::Low,
            json!({"affected_systems": ["api", "web", "mobile", "billing"]}),
        ));

        assert!(draft.body.ends_with("Affected systems: api, web, mobile"));
        assert!(!draft.body.contains("billing"));
    }

    #[test]
    fn word_count_matches_body() {
        let draft = render(&request(Severity::High, json!({"incident_type": "outage"})));
        assert_eq!(
            draft.metadata["word_count"],
            json!(draft.body.split_whitespace().count())
        );
    }
}
