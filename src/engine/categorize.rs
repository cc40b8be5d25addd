//! Session categorization and the improvement pool.
//!
//! A full pure recompute over the record collection: group by calendar
//! date, classify ≥7-of-9 canonical coverage as a complete session, route
//! everything else record-by-record into the improvement pool — then copy
//! complete-session records into the pool as well, so every administration
//! is reachable from the trend view. Idempotence under re-import comes from
//! the dedup step, not from insertion logic.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{Session, TestRecord, TestType};

/// Number of canonical instruments that makes a date group a complete
/// battery administration.
const COMPLETE_SESSION_THRESHOLD: usize = 7;

/// Output of one categorization pass.
#[derive(Debug, Clone, Default)]
pub struct Categorized {
    /// Deduplicated, type-then-date sorted individual records.
    pub improvement: Vec<TestRecord>,
    /// Date groups covering ≥7 of the 9 canonical instruments.
    pub complete: Vec<Session>,
}

/// Categorize the full record collection into the session and improvement
/// views.
pub fn categorize(records: &[TestRecord]) -> Categorized {
    // Group by normalized date. BTreeMap keeps session output ordered by
    // date key.
    let mut by_date: BTreeMap<String, Vec<&TestRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(date_key(&record.date)).or_default().push(record);
    }

    let mut improvement: Vec<TestRecord> = Vec::new();
    let mut complete: Vec<Session> = Vec::new();

    for (date, group) in by_date {
        let mut test_types: Vec<TestType> = Vec::new();
        for record in &group {
            if !test_types.contains(&record.test_type) {
                test_types.push(record.test_type);
            }
        }
        let canonical_count = test_types.iter().filter(|t| t.is_canonical()).count();

        if canonical_count >= COMPLETE_SESSION_THRESHOLD {
            complete.push(Session {
                date,
                tests: group.iter().map(|r| (*r).clone()).collect(),
                test_types,
                completeness: canonical_count as f64 / TestType::canonical().len() as f64,
            });
        } else {
            improvement.extend(group.iter().map(|r| (*r).clone()));
        }
    }

    // Complete-session records feed the improvement view too (copies, so
    // the two views never alias).
    for session in &complete {
        improvement.extend(session.tests.iter().cloned());
    }

    // Sort by type then date for trend tracking; stable sort keeps the
    // original order on ties.
    improvement.sort_by(|a, b| {
        a.test_type
            .as_str()
            .cmp(b.test_type.as_str())
            .then_with(|| date_key(&a.date).cmp(&date_key(&b.date)))
    });

    // Composite-key dedup, first occurrence wins. Re-importing an identical
    // file collapses here; two distinct administrations on the same day
    // survive as long as timestamp or scores differ.
    let mut seen = std::collections::HashSet::new();
    improvement.retain(|record| seen.insert(record.dedup_key()));

    tracing::debug!(
        improvement = improvement.len(),
        complete = complete.len(),
        "categorized record collection"
    );

    Categorized {
        improvement,
        complete,
    }
}

/// Normalize a raw date string to a timezone-naive `YYYY-MM-DD` key.
///
/// The widgets emit plain dates, RFC 3339 instants, and zoneless datetime
/// strings; anything unrecognized falls back to the trimmed raw string so
/// odd dates still group consistently.
pub fn date_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return datetime.date_naive().format("%Y-%m-%d").to_string();
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y"] {
        if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(trimmed, format) {
            return datetime.date().format("%Y-%m-%d").to_string();
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    trimmed.to_string()
}
