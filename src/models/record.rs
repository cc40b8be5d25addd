use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::TestType;

/// One completed administration of one test instrument.
///
/// Records are immutable once parsed: categorization copies them into the
/// session and improvement views, it never mutates them in place. The serde
/// field names match the original dashboard's storage payload so existing
/// exports stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    #[serde(rename = "testName")]
    pub test_name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    /// Calendar date of administration, as extracted from the source file.
    pub date: String,
    /// Optional clock time, for ordering within a date. Empty when absent.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub scores: ScoreSet,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TestRecord {
    /// Composite identity used by the improvement-pool deduplication step.
    /// Two administrations collide only when type, date, timestamp AND the
    /// full serialized score set agree.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.test_type.as_str(),
            self.date,
            self.timestamp,
            self.scores.to_json()
        )
    }
}

/// Provenance of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    #[serde(rename = "sessionId", default)]
    pub session_id: String,
}

/// Open mapping of test-type-specific score fields.
///
/// The battery genuinely has divergent scoring per instrument, so there is
/// no fixed schema across types. Keys are kept sorted so the serialized form
/// is deterministic — the dedup key depends on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSet(serde_json::Map<String, Value>);

impl ScoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), Value::from(value));
    }

    pub fn set_float(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), Value::from(value));
    }

    pub fn set_value(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric read with the coercion the source files need: numbers pass
    /// through, strings are trimmed, stripped of a trailing `%`, and parsed.
    pub fn get_num(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Deterministic serialized form, shared by the dedup key and storage.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    // Named accessors for the fields the scoring rules read.

    pub fn percentage(&self) -> Option<f64> {
        self.get_num("percentage")
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.get_num("accuracy")
    }

    pub fn total(&self) -> Option<f64> {
        self.get_num("total")
    }

    pub fn max(&self) -> Option<f64> {
        self.get_num("max")
    }

    pub fn score(&self) -> Option<f64> {
        self.get_num("score")
    }

    pub fn total_learning(&self) -> Option<f64> {
        self.get_num("totalLearning")
    }
}

/// Parse a numeric field value, stripping a trailing `%` first.
/// The widgets emit percentages both as `30.00%` and as bare numbers.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Integer coercion matching the original importer: floats truncate.
pub fn parse_integer(text: &str) -> Option<i64> {
    parse_number(text).map(|n| n.trunc() as i64)
}
