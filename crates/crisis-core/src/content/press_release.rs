//! Press release renderer

use super::{base_metadata, title_case, ContentRequest, Draft};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Legal flags attached to every press release
pub const PRESS_LEGAL_FLAGS: [&str; 4] = [
    "Legal review required",
    "Verify all factual statements",
    "Ensure compliance with disclosure requirements",
    "Check for any forward-looking statements",
];

pub(crate) fn render(request: &ContentRequest, now: DateTime<Utc>) -> Draft {
    let incident_type = request.fact_str("incident_type", "technical incident");
    let detected_time = request.fact_str("detected_time", "recently");
    let affected_users = request.fact_str("affected_users", "some users");
    let company = request.variable("company_name", "Our Company");
    let location = request.variable("location", "Company Headquarters");
    let media_email = format!("media@{}.com", company.to_lowercase().replace(' ', ""));

    let impact = user_impact(request);
    let dateline = now.format("%B %d, %Y");
    let containment_at = now.format("%H:%M");
    let company_upper = company.to_uppercase();
    let type_upper = incident_type.to_uppercase();

    let body = format!(
        "FOR IMMEDIATE RELEASE\n\n\
         {company_upper} RESPONDS TO {type_upper}\n\n\
         {location} - {dateline} - {company} today announced that it has identified and is addressing \
         a {incident_type} that was detected {detected_time}.\n\n\
         WHAT HAPPENED:\n\
         Our monitoring systems detected {incident_type} affecting {affected_users}. Upon detection, \
         our incident response team was immediately activated and began investigating the root cause.\n\n\
         WHAT WE'RE DOING:\n\
         Our technical teams are working around the clock to resolve this issue. We have implemented \
         containment measures and are systematically restoring affected services. We are also conducting \
         a thorough investigation to prevent similar incidents in the future.\n\n\
         WHAT THIS MEANS FOR YOU:\n\
         {impact}\n\n\
         TIMELINE:\n\
         - {detected_time}: Issue detected and investigation began\n\
         - {containment_at}: Containment measures implemented\n\
         - Ongoing: Service restoration and investigation\n\n\
         NEXT STEPS:\n\
         We will provide regular updates on our progress and will notify all affected parties once full \
         service is restored. We are committed to transparency throughout this process.\n\n\
         FOR MORE INFORMATION:\n\
         Please visit our status page for real-time updates or contact our media relations team at {media_email}.\n\n\
         About {company}:\n\
         {company} is committed to providing reliable and secure services to our customers. We take all \
         incidents seriously and are dedicated to continuous improvement of our systems and processes.\n\n\
         ###\n\
         Contact: Media Relations\n\
         Email: {media_email}\n\
         Phone: [CONTACT_NUMBER]"
    );

    let mut metadata = base_metadata(request, "formal", &body);
    metadata.insert("estimated_read_time".to_string(), Value::from("2 minutes"));
    metadata.insert("boilerplate_included".to_string(), Value::from(true));

    Draft {
        title: format!("Press Release - {} Response", title_case(&incident_type)),
        body,
        metadata,
        confidence: 0.80,
        suggested_revisions: &[
            "Add specific timeline for resolution",
            "Include customer compensation details if applicable",
            "Add executive quote",
            "Review contact information",
        ],
        legal_flags: &PRESS_LEGAL_FLAGS,
        approval_required: true,
    }
}

fn user_impact(request: &ContentRequest) -> String {
    let incident_type = request.fact_str("incident_type", "issue");
    let affected_users = request.fact_str("affected_users", "some users");
    if request.severity.is_elevated() {
        format!(
            "We understand this {incident_type} is causing significant disruption for {affected_users}. \
             We are prioritizing the restoration of critical services and will provide regular updates on our progress."
        )
    } else {
        format!(
            "This {incident_type} may be affecting {affected_users}. \
             We are working to resolve this quickly and minimize any disruption to your experience."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;
    use crate::types::{FactMap, Severity};
    use chrono::TimeZone;
    use serde_json::json;

    fn request(severity: Severity) -> ContentRequest {
        let facts: FactMap = serde_json::from_value(json!({
            "incident_type": "service outage",
            "detected_time": "09:12 UTC",
            "affected_users": 1200,
        }))
        .unwrap();
        ContentRequest::new("inc-1", ContentType::PressRelease, severity, facts)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 19, 14, 5, 0).unwrap()
    }

    #[test]
    fn sections_in_order() {
        let draft = render(&request(Severity::High), now());
        let sections = [
            "FOR IMMEDIATE RELEASE",
            "OUR COMPANY RESPONDS TO SERVICE OUTAGE",
            "WHAT HAPPENED:",
            "WHAT WE'RE DOING:",
            "WHAT THIS MEANS FOR YOU:",
            "TIMELINE:",
            "NEXT STEPS:",
            "FOR MORE INFORMATION:",
            "About Our Company:",
            "Contact: Media Relations",
        ];
        let mut cursor = 0;
        for section in sections {
            let idx = draft.body[cursor..]
                .find(section)
                .unwrap_or_else(|| panic!("missing or out of order: {section}"));
            cursor += idx + section.len();
        }
    }

    #[test]
    fn template_variables_substituted() {
        let req = request(Severity::Medium)
            .with_variable("company_name", "Acme Cloud")
            .with_variable("location", "Berlin");
        let draft = render(&req, now());

        assert!(draft.body.contains("Berlin - December 19, 2024 - Acme Cloud today announced"));
        assert!(draft.body.contains("Email: media@acmecloud.com"));
        assert!(draft.body.contains("- 14:05: Containment measures implemented"));
    }

    #[test]
    fn impact_sentence_follows_severity() {
        let elevated = render(&request(Severity::Critical), now());
        assert!(elevated.body.contains("significant disruption for 1200"));

        let standard = render(&request(Severity::Low), now());
        assert!(standard.body.contains("may be affecting 1200"));
        assert!(!standard.body.contains("significant disruption"));
    }

    #[test]
    fn always_requires_approval() {
        for severity in Severity::ALL {
            let draft = render(&request(severity), now());
            assert!(draft.approval_required);
            assert_eq!(draft.legal_flags, PRESS_LEGAL_FLAGS);
        }
    }
}
