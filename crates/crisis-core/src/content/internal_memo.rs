//! Internal memo renderer

use super::{base_metadata, title_case, ContentRequest, Draft};
use crate::types::Severity;
use serde_json::Value;

pub(crate) fn render(request: &ContentRequest) -> Draft {
    let incident_type = request.fact_str("incident_type", "incident");
    let systems = request.fact_list("affected_systems");
    let current_status = request.fact_str("current_status", "under investigation");
    let detected = request.fact_str("detected_time", "Recently");
    let title_type = title_case(&incident_type);
    let affected = if systems.is_empty() {
        "our systems".to_string()
    } else {
        systems.join(", ")
    };
    let severity = request.severity.as_str().to_uppercase();
    let impact = impact_summary(request.severity, &systems);

    let body = format!(
        "Subject: {title_type} - Internal Update\n\n\
         Team,\n\n\
         We have identified a {incident_type} that affects {affected}.\n\n\
         CURRENT STATUS: {current_status}\n\
         SEVERITY: {severity}\n\
         DETECTED: {detected}\n\n\
         IMPACT:\n\
         {impact}\n\n\
         WHAT WE'RE DOING:\n\
         - Incident response team is activated and coordinating\n\
         - Technical teams are working on containment and resolution\n\
         - Communications team is preparing external messaging\n\
         - Legal team is reviewing potential implications\n\n\
         NEXT STEPS:\n\
         - Regular updates will be provided via Slack/email\n\
         - All customer-facing communications will be coordinated\n\
         - Post-incident review will be scheduled\n\n\
         WHAT YOU SHOULD KNOW:\n\
         - Do not speculate about the incident externally\n\
         - Refer all media inquiries to the communications team\n\
         - Continue normal operations unless directed otherwise\n\
         - Support your colleagues who may be working extended hours\n\n\
         RESOURCES:\n\
         - Status page: [STATUS_PAGE_URL]\n\
         - Internal incident channel: [SLACK_CHANNEL]\n\
         - Emergency contact: [EMERGENCY_CONTACT]\n\n\
         Please direct any questions to your manager or the incident response team.\n\n\
         Best regards,\n\
         Incident Response Team\n\n\
         ---\n\
         This is an automated message. For urgent matters, contact the incident commander directly."
    );

    let mut metadata = base_metadata(request, "informative", &body);
    metadata.insert("target_audience".to_string(), Value::from(vec!["employees"]));
    metadata.insert("estimated_read_time".to_string(), Value::from("1 minute"));
    metadata.insert("internal_only".to_string(), Value::from(true));

    Draft {
        title: format!("Internal Memo - {title_type}"),
        body,
        metadata,
        confidence: 0.90,
        suggested_revisions: &[
            "Add specific contact information",
            "Include timeline for next update",
            "Add any specific instructions for different departments",
        ],
        legal_flags: &[
            "Ensure no confidential information is included",
            "Verify accuracy of status information",
        ],
        approval_required: false,
    }
}

/// Three-tier impact sentence
fn impact_summary(severity: Severity, systems: &[String]) -> String {
    let named = |fallback: &str| {
        if systems.is_empty() {
            fallback.to_string()
        } else {
            systems.join(", ")
        }
    };
    match severity {
        Severity::High | Severity::Critical => format!(
            "Significant impact on {}. Customer-facing services may be degraded or unavailable.",
            named("core systems")
        ),
        Severity::Medium => format!(
            "Moderate impact on {}. Some customers may experience delays or issues.",
            named("some systems")
        ),
        Severity::Low => format!(
            "Limited impact on {}. Minimal customer impact expected.",
            named("non-critical systems")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;
    use crate::types::FactMap;
    use serde_json::json;

    fn request(severity: Severity, facts: Value) -> ContentRequest {
        let facts: FactMap = serde_json::from_value(facts).unwrap();
        ContentRequest::new("inc-1", ContentType::InternalMemo, severity, facts)
    }

    #[test]
    fn impact_tiers() {
        let systems = vec!["billing".to_string()];
        assert!(impact_summary(Severity::Critical, &systems).starts_with("Significant impact on billing."));
        assert!(impact_summary(Severity::Medium, &[]).starts_with("Moderate impact on some systems."));
        assert!(impact_summary(Severity::Low, &[]).starts_with("Limited impact on non-critical systems."));
        assert!(impact_summary(Severity::High, &[]).contains("core systems"));
    }

    #[test]
    fn memo_header_and_flags() {
        let draft = render(&request(
            Severity::High,
            json!({"incident_type": "api outage", "affected_systems": ["api", "web"], "current_status": "contained"}),
        ));

        assert!(draft.body.starts_with("Subject: Api Outage - Internal Update"));
        assert!(draft.body.contains("affects api, web."));
        assert!(draft.body.contains("CURRENT STATUS: contained\nSEVERITY: HIGH"));
        assert!(!draft.approval_required);
        assert_eq!(draft.metadata["target_audience"], json!(["employees"]));
        assert_eq!(draft.metadata["internal_only"], json!(true));
    }

    #[test]
    fn defaults_when_facts_missing() {
        let draft = render(&request(Severity::Medium, json!({})));
        assert!(draft.body.contains("We have identified a incident that affects our systems."));
        assert!(draft.body.contains("DETECTED: Recently"));
        assert!(draft.body.contains("CURRENT STATUS: under investigation"));
    }
}
