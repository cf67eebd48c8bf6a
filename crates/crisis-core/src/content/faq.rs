//! FAQ renderer
//!
//! Three baseline items, plus items gated on severity and on keywords in the
//! incident type. Items are stable-sorted by ascending priority.

use super::{base_metadata, ContentRequest, Draft};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Question of the item added for high and critical incidents
pub const EMERGENCY_QUESTION: &str = "What should I do if I'm experiencing issues?";

/// One question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    /// Question text
    pub question: String,
    /// Answer text
    pub answer: String,
    /// Grouping label
    pub category: String,
    /// 1 (first) to 5 (last)
    pub priority: u8,
}

impl FaqItem {
    fn new(question: &str, answer: impl Into<String>, category: &str, priority: u8) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.into(),
            category: category.to_string(),
            priority: priority.clamp(1, 5),
        }
    }
}

/// Build the ordered FAQ item list for a request
#[must_use]
pub fn faq_items(request: &ContentRequest) -> Vec<FaqItem> {
    let mut items = vec![
        FaqItem::new(
            "What happened?",
            format!(
                "We experienced a {} that affected some of our services. Our team is actively working to resolve this.",
                request.fact_str("incident_type", "technical issue")
            ),
            "general",
            1,
        ),
        FaqItem::new(
            "When will this be fixed?",
            "Our technical teams are working as quickly as possible to resolve this issue. We will provide updates \
             as soon as we have more information about the timeline for resolution.",
            "timeline",
            1,
        ),
        FaqItem::new(
            "Is my data safe?",
            "We have no indication that any customer data has been compromised. Our security teams are monitoring \
             the situation closely and will notify affected customers immediately if this changes.",
            "security",
            2,
        ),
    ];

    if request.severity.is_elevated() {
        items.push(FaqItem::new(
            EMERGENCY_QUESTION,
            "If you're experiencing urgent problems, please contact our emergency support line at [EMERGENCY_NUMBER]. \
             For non-urgent issues, our regular support channels remain available.",
            "support",
            1,
        ));
    }

    let incident_type = request.fact_str("incident_type", "").to_lowercase();
    if incident_type.contains("outage") {
        let mut systems = request.fact_list("affected_systems");
        if systems.is_empty() {
            systems.push("various services".to_string());
        }
        items.push(FaqItem::new(
            "Which services are affected?",
            format!(
                "The following services may be experiencing issues: {}. We're working to restore all services as quickly as possible.",
                systems.join(", ")
            ),
            "services",
            2,
        ));
    }

    if incident_type.contains("breach") || incident_type.contains("security") {
        items.push(FaqItem::new(
            "What steps should I take to protect my account?",
            "As a precaution, we recommend changing your password and enabling two-factor authentication if you \
             haven't already. We will provide specific guidance if any action is required.",
            "security",
            1,
        ));
    }

    items.sort_by_key(|item| item.priority);
    items
}

pub(crate) fn render(request: &ContentRequest) -> Draft {
    let items = faq_items(request);

    let mut body = String::from("FREQUENTLY ASKED QUESTIONS\n\n");
    for item in &items {
        body.push_str(&format!("Q: {}\nA: {}\n\n", item.question, item.answer));
    }
    body.push_str(
        "For additional questions, please contact our support team or visit our status page for real-time updates.",
    );

    let categories: BTreeSet<&str> = items.iter().map(|i| i.category.as_str()).collect();

    let mut metadata = base_metadata(request, "helpful", &body);
    metadata.insert("estimated_read_time".to_string(), Value::from("2 minutes"));
    metadata.insert(
        "faq_items".to_string(),
        serde_json::to_value(&items).unwrap_or(Value::Null),
    );
    metadata.insert(
        "categories".to_string(),
        Value::from(categories.into_iter().collect::<Vec<_>>()),
    );

    Draft {
        title: format!("FAQ - {}", request.fact_str("incident_type", "Incident")),
        body,
        metadata,
        confidence: 0.88,
        suggested_revisions: &[
            "Add specific timeline information",
            "Include contact information for support",
            "Add any compensation or credit information if applicable",
        ],
        legal_flags: &[
            "Verify accuracy of security statements",
            "Ensure no promises about resolution timeline",
        ],
        approval_required: true,
    }
}
