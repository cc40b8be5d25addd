use serde::{Deserialize, Serialize};

use super::enums::TestType;
use super::record::TestRecord;

/// Records sharing one normalized calendar date, classified as a complete
/// battery administration (≥7 of the 9 canonical instruments present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Normalized `YYYY-MM-DD` grouping key.
    pub date: String,
    pub tests: Vec<TestRecord>,
    /// Distinct types present, in first-seen order.
    #[serde(rename = "testTypes")]
    pub test_types: Vec<TestType>,
    /// Canonical coverage: `|test_types ∩ canonical9| / 9`.
    pub completeness: f64,
}

impl Session {
    /// Number of canonical instruments covered. `Other` never counts.
    pub fn canonical_count(&self) -> usize {
        self.test_types.iter().filter(|t| t.is_canonical()).count()
    }
}

/// Earliest/latest administration dates across a record set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{Metadata, ScoreSet};

    fn record(test_type: TestType) -> TestRecord {
        TestRecord {
            test_name: test_type.as_str().to_string(),
            test_type,
            date: "2025-01-01".into(),
            timestamp: String::new(),
            scores: ScoreSet::new(),
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn canonical_count_ignores_other() {
        let session = Session {
            date: "2025-01-01".into(),
            tests: vec![record(TestType::HvltR), record(TestType::Other)],
            test_types: vec![TestType::HvltR, TestType::Other],
            completeness: 1.0 / 9.0,
        };
        assert_eq!(session.canonical_count(), 1);
    }
}
