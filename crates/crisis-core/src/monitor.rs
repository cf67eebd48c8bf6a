//! Social monitoring
//!
//! Turns a raw mention feed into scored mentions, flags rumor candidates
//! and produces an hourly sentiment series for an incident.

use crate::types::{IncidentId, Severity};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Keywords that mark a mention as a rumor candidate
pub const RUMOR_KEYWORDS: [&str; 5] = ["breach", "leak", "stolen", "lawsuit", "fine"];

/// Confidence attached to every keyword-detected rumor
pub const RUMOR_CONFIDENCE: f64 = 0.6;

/// Oldest a freshly-ingested mention is backdated, in minutes
pub const MAX_MENTION_LAG_MINUTES: i64 = 120;

/// Raw feed entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionRecord {
    /// Origin (e.g. `twitter`)
    #[serde(default)]
    pub source: Option<String>,
    /// Mention text
    #[serde(default)]
    pub text: String,
    /// Upstream timestamp, when the feed supplies one
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Scored mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// `m-{unix}-{index}`
    pub id: String,
    /// Owning incident
    pub incident_id: IncidentId,
    /// Origin, `unknown` when the feed omitted it
    pub source: String,
    /// Mention text
    pub text: String,
    /// When the mention was made
    pub created_at: DateTime<Utc>,
    /// Sentiment in `[-1, 1]`, two decimals
    pub sentiment: f64,
}

/// Rumor candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rumor {
    /// `r-{mention_id}`
    pub id: String,
    /// Owning incident
    pub incident_id: IncidentId,
    /// Mention text
    pub text: String,
    /// Detection confidence
    pub confidence: f64,
    /// Rumor severity
    pub severity: Severity,
    /// Detection time
    pub created_at: DateTime<Utc>,
}

/// One point of a sentiment series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    /// Bucket start
    pub t: DateTime<Utc>,
    /// Sentiment in `[-1, 1]`
    pub value: f64,
}

/// Source of sentiment values
pub trait SentimentScorer: Send + Sync {
    /// Score a non-empty mention text
    fn score(&self, text: &str) -> f64;

    /// Baseline for a fresh sentiment series
    fn baseline(&self) -> f64;

    /// Per-point deviation from the baseline
    fn jitter(&self) -> f64;

    /// How many minutes before ingest a mention without a timestamp was made
    fn lag_minutes(&self) -> i64;
}

/// Scorer drawing from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomScorer;

impl SentimentScorer for RandomScorer {
    fn score(&self, _text: &str) -> f64 {
        rand::thread_rng().gen_range(-0.5..=0.9)
    }

    fn baseline(&self) -> f64 {
        rand::thread_rng().gen_range(-0.1..=0.1)
    }

    fn jitter(&self) -> f64 {
        rand::thread_rng().gen_range(-0.2..=0.2)
    }

    fn lag_minutes(&self) -> i64 {
        rand::thread_rng().gen_range(0..=MAX_MENTION_LAG_MINUTES)
    }
}

/// Deterministic scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScorer {
    /// Returned for every score, baseline and jitter
    pub value: f64,
    /// Returned for every lag
    pub lag_minutes: i64,
}

impl SentimentScorer for FixedScorer {
    fn score(&self, _text: &str) -> f64 {
        self.value
    }

    fn baseline(&self) -> f64 {
        self.value
    }

    fn jitter(&self) -> f64 {
        self.value
    }

    fn lag_minutes(&self) -> i64 {
        self.lag_minutes
    }
}

fn clamp_round(value: f64) -> f64 {
    (value.clamp(-1.0, 1.0) * 100.0).round() / 100.0
}

/// Score a raw feed into mentions
#[must_use]
pub fn ingest_mentions(
    incident_id: &IncidentId,
    feed: &[MentionRecord],
    scorer: &dyn SentimentScorer,
    now: DateTime<Utc>,
) -> Vec<Mention> {
    let stamp = now.timestamp();
    let mentions: Vec<Mention> = feed
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let sentiment = if record.text.is_empty() {
                0.0
            } else {
                clamp_round(scorer.score(&record.text))
            };
            let created_at = record
                .timestamp
                .unwrap_or_else(|| now - Duration::minutes(scorer.lag_minutes().max(0)));
            Mention {
                id: format!("m-{stamp}-{idx}"),
                incident_id: incident_id.clone(),
                source: record.source.clone().unwrap_or_else(|| "unknown".to_string()),
                text: record.text.clone(),
                created_at,
                sentiment,
            }
        })
        .collect();

    tracing::info!(incident_id = %incident_id, count = mentions.len(), "mentions ingested");
    mentions
}

/// Flag mentions containing a rumor keyword
#[must_use]
pub fn detect_rumors(incident_id: &IncidentId, mentions: &[Mention], now: DateTime<Utc>) -> Vec<Rumor> {
    mentions
        .iter()
        .filter(|m| {
            let lower = m.text.to_lowercase();
            RUMOR_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map(|m| Rumor {
            id: format!("r-{}", m.id),
            incident_id: incident_id.clone(),
            text: m.text.clone(),
            confidence: RUMOR_CONFIDENCE,
            severity: Severity::Medium,
            created_at: now,
        })
        .collect()
}

/// Hourly sentiment series ending at `now`
///
/// The first point sits `hours` hours before `now`; the last one hour before.
#[must_use]
pub fn sentiment_series(hours: u32, scorer: &dyn SentimentScorer, now: DateTime<Utc>) -> Vec<SentimentPoint> {
    let base = scorer.baseline();
    (0..hours)
        .map(|i| SentimentPoint {
            t: now - Duration::hours(i64::from(hours - i)),
            value: clamp_round(base + scorer.jitter()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 19, 12, 0, 0).unwrap()
    }

    fn record(source: Option<&str>, text: &str) -> MentionRecord {
        MentionRecord {
            source: source.map(str::to_string),
            text: text.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn ingest_assigns_ids_and_defaults() {
        let scorer = FixedScorer { value: 0.456, lag_minutes: 30 };
        let feed = [record(Some("twitter"), "down again"), record(None, "")];
        let incident = IncidentId::new("inc-9");

        let mentions = ingest_mentions(&incident, &feed, &scorer, now());
        let stamp = now().timestamp();

        assert_eq!(mentions[0].id, format!("m-{stamp}-0"));
        assert_eq!(mentions[1].id, format!("m-{stamp}-1"));
        assert_eq!(mentions[0].sentiment, 0.46);
        assert_eq!(mentions[1].sentiment, 0.0);
        assert_eq!(mentions[1].source, "unknown");
        assert_eq!(mentions[0].created_at, now() - Duration::minutes(30));
    }

    #[test]
    fn upstream_timestamp_is_kept() {
        let at = now() - Duration::hours(5);
        let feed = [MentionRecord {
            source: Some("forum".to_string()),
            text: "hello".to_string(),
            timestamp: Some(at),
        }];
        let mentions = ingest_mentions(&IncidentId::new("i"), &feed, &RandomScorer, now());
        assert_eq!(mentions[0].created_at, at);
    }

    #[test]
    fn rumors_match_keywords_case_insensitively() {
        let scorer = FixedScorer { value: 0.0, lag_minutes: 0 };
        let feed = [
            record(Some("twitter"), "Heard there was a LEAK"),
            record(Some("twitter"), "service is slow"),
            record(Some("reddit"), "class action Lawsuit incoming"),
        ];
        let incident = IncidentId::new("inc-1");
        let mentions = ingest_mentions(&incident, &feed, &scorer, now());

        let rumors = detect_rumors(&incident, &mentions, now());
        assert_eq!(rumors.len(), 2);
        assert_eq!(rumors[0].id, format!("r-{}", mentions[0].id));
        assert_eq!(rumors[0].confidence, RUMOR_CONFIDENCE);
        assert_eq!(rumors[1].severity, Severity::Medium);
    }

    #[test]
    fn series_is_hourly_and_clamped() {
        let scorer = FixedScorer { value: 0.8, lag_minutes: 0 };
        let series = sentiment_series(3, &scorer, now());
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].t, now() - Duration::hours(3));
        assert_eq!(series[2].t, now() - Duration::hours(1));
        assert!(series.iter().all(|p| (p.value - 1.0).abs() < f64::EPSILON));
    }

    proptest! {
        #[test]
        fn random_sentiment_in_range(texts in proptest::collection::vec(".{0,20}", 0..20)) {
            let feed: Vec<_> = texts.iter().map(|t| record(None, t)).collect();
            let mentions = ingest_mentions(&IncidentId::new("p"), &feed, &RandomScorer, now());
            prop_assert_eq!(mentions.len(), feed.len());
            for m in &mentions {
                prop_assert!((-1.0..=1.0).contains(&m.sentiment));
                prop_assert!(m.created_at <= now());
                prop_assert!(m.created_at >= now() - Duration::minutes(MAX_MENTION_LAG_MINUTES));
            }
        }
    }
}
