//! Social media renderer
//!
//! One fixed template per known platform. Unknown platform names are
//! skipped without error.

use super::{base_metadata, title_case, ContentRequest, Draft};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platforms used when the caller supplies none
pub const DEFAULT_PLATFORMS: [&str; 2] = ["twitter", "linkedin"];

/// Declared ceiling for the short-form platform
pub const SHORT_FORM_LIMIT: usize = 140;

/// Declared ceiling for the long-form platform
pub const LONG_FORM_LIMIT: usize = 300;

/// One platform post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    /// Platform name
    pub platform: String,
    /// Post text
    pub content: String,
    /// Hashtags
    pub hashtags: Vec<String>,
    /// Declared character-count ceiling for the platform
    pub character_count: usize,
    /// Whether the post carries media
    pub includes_media: bool,
}

/// Platforms requested through the `platforms` template variable
///
/// Comma-separated; falls back to [`DEFAULT_PLATFORMS`] when unset or blank.
#[must_use]
pub fn requested_platforms(request: &ContentRequest) -> Vec<String> {
    let requested: Vec<String> = request
        .template_variables
        .get("platforms")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if requested.is_empty() {
        DEFAULT_PLATFORMS.iter().map(|p| (*p).to_string()).collect()
    } else {
        requested
    }
}

/// Build posts for every recognised platform
#[must_use]
pub fn social_posts(request: &ContentRequest, platforms: &[String]) -> Vec<SocialPost> {
    let incident_type = request.fact_str("incident_type", "issue");
    platforms
        .iter()
        .filter_map(|platform| match platform.to_lowercase().as_str() {
            "twitter" => Some(SocialPost {
                platform: "twitter".to_string(),
                content: format!(
                    "We're aware of a {incident_type} and are working to resolve it. Updates: [STATUS_PAGE_URL] #ServiceUpdate"
                ),
                hashtags: vec!["#ServiceUpdate".to_string(), "#CustomerFirst".to_string()],
                character_count: SHORT_FORM_LIMIT,
                includes_media: false,
            }),
            "linkedin" => Some(SocialPost {
                platform: "linkedin".to_string(),
                content: format!(
                    "We're experiencing a {incident_type} and our team is actively working to resolve it. \
                     We'll provide updates as we have more information. Thank you for your patience."
                ),
                hashtags: vec!["#ServiceUpdate".to_string(), "#CustomerService".to_string()],
                character_count: LONG_FORM_LIMIT,
                includes_media: false,
            }),
            _ => None,
        })
        .collect()
}

pub(crate) fn render(request: &ContentRequest) -> Draft {
    let incident_type = request.fact_str("incident_type", "issue");
    let platforms = requested_platforms(request);
    let posts = social_posts(request, &platforms);

    let mut body = String::from("SOCIAL MEDIA POSTS\n\n");
    for post in &posts {
        body.push_str(&format!(
            "Platform: {}\nContent: {}\nHashtags: {}\nCharacter count: {}\n\n",
            post.platform.to_uppercase(),
            post.content,
            post.hashtags.join(", "),
            post.character_count
        ));
    }

    let mut metadata = base_metadata(request, "transparent", &body);
    metadata.insert("estimated_read_time".to_string(), Value::from("1 minute"));
    metadata.insert(
        "posts".to_string(),
        serde_json::to_value(&posts).unwrap_or(Value::Null),
    );
    metadata.insert("platforms".to_string(), Value::from(platforms));

    Draft {
        title: format!("Social Media Posts - {}", title_case(&incident_type)),
        body,
        metadata,
        confidence: 0.85,
        suggested_revisions: &[
            "Add status page URL",
            "Consider adding image/graphic",
            "Review hashtags for appropriateness",
        ],
        legal_flags: &["Ensure no admission of liability", "Verify factual accuracy"],
        approval_required: true,
    }
}
