//! Intake normalization
//!
//! Validates a raw incident payload, extracts the fact list, flags unknowns
//! and classifies severity from the affected-user count.

use crate::error::ValidationError;
use crate::types::{Confidence, Fact, IncidentReport, NormalizedFacts, Severity};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Above this many affected users an incident is critical
pub const CRITICAL_USER_THRESHOLD: u64 = 10_000;

/// Below this many affected users an incident is medium
pub const MEDIUM_USER_THRESHOLD: u64 = 100;

/// Unknown flagged when the affected-user count is zero
pub const UNKNOWN_USER_COUNT: &str = "exact_user_count";

/// Unknown flagged when no jurisdiction was reported
pub const UNKNOWN_JURISDICTIONS: &str = "affected_jurisdictions";

/// Classify severity from the affected-user count alone
///
/// `low` is never produced here.
#[inline]
#[must_use]
pub fn classify_severity(affected_users: u64) -> Severity {
    if affected_users > CRITICAL_USER_THRESHOLD {
        Severity::Critical
    } else if affected_users < MEDIUM_USER_THRESHOLD {
        Severity::Medium
    } else {
        Severity::High
    }
}

/// Normalize a typed incident report
///
/// # Errors
/// `ValidationError::EmptyField` if the title is blank.
pub fn normalize(report: &IncidentReport) -> Result<NormalizedFacts, ValidationError> {
    if report.title.trim().is_empty() {
        return Err(ValidationError::EmptyField("title"));
    }

    let facts = vec![
        Fact::new("title", report.title.clone(), Confidence::High),
        Fact::new("detected_at", report.detected_at.to_rfc3339(), Confidence::High),
        Fact::new(
            "affected_users",
            report.affected_users.to_string(),
            Confidence::Medium,
        ),
        Fact::new("data_types", report.data_types.join(", "), Confidence::High),
    ];

    let mut unknowns = Vec::new();
    if report.affected_users == 0 {
        unknowns.push(UNKNOWN_USER_COUNT.to_string());
    }
    if report.jurisdictions.is_empty() {
        unknowns.push(UNKNOWN_JURISDICTIONS.to_string());
    }

    let severity = classify_severity(report.affected_users);
    tracing::debug!(
        affected_users = report.affected_users,
        severity = %severity,
        unknowns = unknowns.len(),
        "incident normalized"
    );

    Ok(NormalizedFacts {
        facts,
        unknowns,
        severity,
        jurisdictions: report.jurisdictions.clone(),
        data_categories: report.data_types.clone(),
    })
}

/// Normalize a loosely-typed payload as received from the API
///
/// # Errors
/// Any [`ValidationError`] raised while parsing or normalizing.
pub fn normalize_value(payload: &Value) -> Result<NormalizedFacts, ValidationError> {
    let report = parse_report(payload)?;
    normalize(&report)
}

/// Parse an incident payload into a typed report
///
/// All six fields are required. `affected_users` accepts a non-negative
/// integer or a numeric string. `data_types` and `jurisdictions` may be
/// empty lists but not absent.
///
/// # Errors
/// `MissingField` or `Malformed` for the first offending field.
pub fn parse_report(payload: &Value) -> Result<IncidentReport, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ValidationError::malformed("incident", "expected a JSON object"))?;

    let title = required_str(obj, "title")?;
    let description = required_str(obj, "description")?;
    let detected_at = parse_detected_at(required_str(obj, "detected_at")?)?;
    let affected_users = parse_user_count(
        obj.get("affected_users")
            .ok_or(ValidationError::MissingField("affected_users"))?,
    )?;
    let data_types = required_str_list(obj, "data_types")?;
    let jurisdictions = required_str_list(obj, "jurisdictions")?;

    Ok(IncidentReport {
        title: title.to_string(),
        description: description.to_string(),
        detected_at,
        affected_users,
        data_types,
        jurisdictions,
    })
}

fn required_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ValidationError::malformed(
            field,
            format!("expected string, got {}", json_kind(other)),
        )),
    }
}

fn required_str_list(
    obj: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ValidationError::malformed(field, "expected a list of strings")
                })
            })
            .collect(),
        Some(other) => Err(ValidationError::malformed(
            field,
            format!("expected list, got {}", json_kind(other)),
        )),
    }
}

fn parse_detected_at(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::malformed("detected_at", e.to_string()))
}

fn parse_user_count(value: &Value) -> Result<u64, ValidationError> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            ValidationError::malformed("affected_users", format!("expected non-negative integer, got {n}"))
        }),
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| {
            ValidationError::malformed("affected_users", format!("not a number: {s:?}"))
        }),
        Value::Null => Err(ValidationError::MissingField("affected_users")),
        other => Err(ValidationError::malformed(
            "affected_users",
            format!("expected integer, got {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn payload(users: Value) -> Value {
        json!({
            "title": "Payment API outage",
            "description": "Checkout failing for EU customers",
            "detected_at": "2024-12-19T10:00:00Z",
            "affected_users": users,
            "data_types": ["payment", "email"],
            "jurisdictions": ["EU"],
        })
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(classify_severity(0), Severity::Medium);
        assert_eq!(classify_severity(99), Severity::Medium);
        assert_eq!(classify_severity(100), Severity::High);
        assert_eq!(classify_severity(10_000), Severity::High);
        assert_eq!(classify_severity(10_001), Severity::Critical);
        assert_eq!(classify_severity(50_000), Severity::Critical);
    }

    #[test]
    fn normalize_builds_fact_list() {
        let facts = normalize_value(&payload(json!(50_000))).unwrap();

        let labels: Vec<_> = facts.facts.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["title", "detected_at", "affected_users", "data_types"]);
        assert_eq!(facts.fact("data_types"), Some("payment, email"));
        assert_eq!(facts.facts[2].confidence, Confidence::Medium);
        assert_eq!(facts.severity, Severity::Critical);
        assert!(facts.unknowns.is_empty());
        assert_eq!(facts.jurisdictions, vec!["EU".to_string()]);
    }

    #[test]
    fn zero_users_and_no_jurisdictions_are_unknown() {
        let mut raw = payload(json!(0));
        raw["jurisdictions"] = json!([]);
        let facts = normalize_value(&raw).unwrap();

        assert_eq!(facts.unknowns, vec![UNKNOWN_USER_COUNT, UNKNOWN_JURISDICTIONS]);
        assert_eq!(facts.severity, Severity::Medium);
    }

    #[test]
    fn numeric_string_user_count_accepted() {
        let facts = normalize_value(&payload(json!("250"))).unwrap();
        assert_eq!(facts.severity, Severity::High);
    }

    #[test]
    fn non_numeric_user_count_rejected() {
        let err = normalize_value(&payload(json!("lots"))).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "affected_users", .. }));

        let err = normalize_value(&payload(json!(-5))).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field: "affected_users", .. }));
    }

    #[test]
    fn missing_fields_rejected() {
        let mut raw = payload(json!(10));
        raw.as_object_mut().unwrap().remove("title");
        assert_eq!(
            normalize_value(&raw).unwrap_err(),
            ValidationError::MissingField("title")
        );

        let mut raw = payload(json!(10));
        raw.as_object_mut().unwrap().remove("affected_users");
        assert_eq!(
            normalize_value(&raw).unwrap_err(),
            ValidationError::MissingField("affected_users")
        );
    }

    #[test]
    fn list_fields_are_required() {
        for field in ["data_types", "jurisdictions"] {
            let mut raw = payload(json!(10));
            raw.as_object_mut().unwrap().remove(field);
            assert_eq!(normalize_value(&raw).unwrap_err(), ValidationError::MissingField(field));

            raw[field] = Value::Null;
            assert_eq!(normalize_value(&raw).unwrap_err(), ValidationError::MissingField(field));
        }
    }

    #[test]
    fn list_fields_reject_non_strings() {
        let mut raw = payload(json!(10));
        raw["jurisdictions"] = json!(["EU", 7]);
        assert!(matches!(
            normalize_value(&raw).unwrap_err(),
            ValidationError::Malformed { field: "jurisdictions", .. }
        ));
    }

    #[test]
    fn malformed_timestamp_rejected() {
        let mut raw = payload(json!(10));
        raw["detected_at"] = json!("yesterday");
        assert!(matches!(
            normalize_value(&raw).unwrap_err(),
            ValidationError::Malformed { field: "detected_at", .. }
        ));
    }

    #[test]
    fn blank_title_rejected() {
        let mut raw = payload(json!(10));
        raw["title"] = json!("   ");
        assert_eq!(normalize_value(&raw).unwrap_err(), ValidationError::EmptyField("title"));
    }

    #[test]
    fn non_object_payload_rejected() {
        assert!(normalize_value(&json!([1, 2, 3])).is_err());
    }

    proptest! {
        #[test]
        fn severity_is_function_of_count(count in 0u64..1_000_000) {
            let severity = classify_severity(count);
            if count > 10_000 {
                prop_assert_eq!(severity, Severity::Critical);
            } else if count < 100 {
                prop_assert_eq!(severity, Severity::Medium);
            } else {
                prop_assert_eq!(severity, Severity::High);
            }
            prop_assert_ne!(severity, Severity::Low);
        }
    }
}
