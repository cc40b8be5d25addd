//! Score normalization: one comparable 0–100 value per record, and the
//! aggregate "unifying score".

use crate::models::{TestRecord, TestType};

/// Breakpoints of the Symbol Coding re-anchoring. The instrument's raw
/// percentages sit naturally low (typical performance is well under 50%),
/// so ~50% raw must read as "good" on the shared 0–100 scale.
const BACS_LOW_RAW: f64 = 30.0;
const BACS_MID_RAW: f64 = 50.0;
const BACS_LOW_MAPPED: f64 = 60.0;
const BACS_MID_MAPPED: f64 = 80.0;

/// Map one record's heterogeneous scores to a single comparable value.
///
/// Strict precedence, first applicable rule wins. Zero-valued fields never
/// select a rule: exported files serialize absent Total/Max/Percentage as
/// 0, so zero means absent here.
///
/// 1. Symbol Coding percentage, through the piecewise re-anchoring.
/// 2. Percentage (any type).
/// 3. Accuracy.
/// 4. total/max × 100.
/// 5. Raw total alone — deliberately unbounded, not a percentage.
/// 6. Per-type fallbacks: Animal Naming score, Trail Making percentage,
///    BVMT-R total learning, CPT-IP accuracy.
/// 7. No signal: 0.
pub fn score_of(record: &TestRecord) -> f64 {
    let scores = &record.scores;
    let nonzero = |v: Option<f64>| v.filter(|n| *n != 0.0);

    if record.test_type == TestType::SymbolCoding {
        if let Some(raw) = nonzero(scores.percentage()) {
            return bacs_reanchor(raw);
        }
    }

    if let Some(percentage) = nonzero(scores.percentage()) {
        return percentage;
    }

    if let Some(accuracy) = nonzero(scores.accuracy()) {
        return accuracy;
    }

    if let (Some(total), Some(max)) = (nonzero(scores.total()), nonzero(scores.max())) {
        return total / max * 100.0;
    }

    if let Some(total) = nonzero(scores.total()) {
        return total;
    }

    match record.test_type {
        TestType::AnimalNaming => {
            if let Some(score) = nonzero(scores.score()) {
                return score;
            }
        }
        TestType::TrailMaking => {
            if let Some(percentage) = nonzero(scores.percentage()) {
                return percentage;
            }
        }
        TestType::BvmtR => {
            if let Some(total_learning) = nonzero(scores.total_learning()) {
                return total_learning;
            }
        }
        TestType::CptIp => {
            if let Some(accuracy) = nonzero(scores.accuracy()) {
                return accuracy;
            }
        }
        _ => {}
    }

    0.0
}

/// Piecewise-linear re-anchoring of raw Symbol Coding percentages:
/// [0,30] → [0,60], (30,50] → (60,80], (50,100] → (80,100], clamped ≤100.
/// Continuous and monotonic at both breakpoints.
pub fn bacs_reanchor(raw: f64) -> f64 {
    let mapped = if raw <= BACS_LOW_RAW {
        raw / BACS_LOW_RAW * BACS_LOW_MAPPED
    } else if raw <= BACS_MID_RAW {
        BACS_LOW_MAPPED + (raw - BACS_LOW_RAW) / (BACS_MID_RAW - BACS_LOW_RAW) * 20.0
    } else {
        BACS_MID_MAPPED + (raw - BACS_MID_RAW) / (100.0 - BACS_MID_RAW) * 20.0
    };
    mapped.min(100.0)
}

/// The headline 0–100 figure: arithmetic mean of `score_of` over the
/// improvement pool when non-empty, else over the whole collection, rounded
/// to the nearest integer. A plain mean on purpose — the number stays
/// auditable by hand from the per-test breakdown.
pub fn unifying_score(improvement: &[TestRecord], all: &[TestRecord]) -> i64 {
    if all.is_empty() {
        return 0;
    }
    let pool = if improvement.is_empty() { all } else { improvement };
    if pool.is_empty() {
        return 0;
    }
    let sum: f64 = pool.iter().map(score_of).sum();
    (sum / pool.len() as f64).round() as i64
}

/// Presentation band for a unifying score. Fixed thresholds, not
/// statistical norms.
pub fn interpretation(score: i64) -> &'static str {
    if score >= 85 {
        "Excellent performance - Outstanding cognitive function"
    } else if score >= 75 {
        "Very good performance - Above average cognitive function"
    } else if score >= 65 {
        "Good performance - Average cognitive function"
    } else if score >= 55 {
        "Fair performance - Mildly below average cognitive function"
    } else if score >= 45 {
        "Poor performance - Moderately impaired cognitive function"
    } else {
        "Very poor performance - Severely impaired cognitive function"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, ScoreSet};

    fn record(test_type: TestType, build: impl FnOnce(&mut ScoreSet)) -> TestRecord {
        let mut scores = ScoreSet::new();
        build(&mut scores);
        TestRecord {
            test_name: test_type.as_str().to_string(),
            test_type,
            date: "2025-01-01".into(),
            timestamp: String::new(),
            scores,
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn bacs_reanchor_continuous_at_breakpoints() {
        assert!((bacs_reanchor(30.0) - 60.0).abs() < 1e-9);
        assert!((bacs_reanchor(30.0 + 1e-9) - 60.0).abs() < 1e-6);
        assert!((bacs_reanchor(50.0) - 80.0).abs() < 1e-9);
        assert!((bacs_reanchor(50.0 + 1e-9) - 80.0).abs() < 1e-6);
        assert!((bacs_reanchor(100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn bacs_reanchor_monotonic() {
        let mut previous = -1.0;
        for step in 0..=1000 {
            let raw = step as f64 / 10.0;
            let mapped = bacs_reanchor(raw);
            assert!(mapped >= previous, "not monotonic at raw {raw}");
            assert!(mapped <= 100.0);
            previous = mapped;
        }
    }

    #[test]
    fn symbol_coding_percentage_is_reanchored() {
        let r = record(TestType::SymbolCoding, |s| s.set_float("percentage", 30.0));
        assert!((score_of(&r) - 60.0).abs() < 1e-9);
        let r = record(TestType::SymbolCoding, |s| s.set_float("percentage", 15.0));
        assert!((score_of(&r) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_rule_for_other_types() {
        let r = record(TestType::HvltR, |s| s.set_float("percentage", 72.5));
        assert!((score_of(&r) - 72.5).abs() < 1e-9);
    }

    #[test]
    fn accuracy_when_no_percentage() {
        let r = record(TestType::CptIp, |s| {
            s.set_float("accuracy", 88.0);
            s.set_float("reactionTime", 410.0);
        });
        assert!((score_of(&r) - 88.0).abs() < 1e-9);
    }

    #[test]
    fn zero_percentage_does_not_mask_accuracy() {
        // Exported files serialize absent percentage as 0; accuracy must
        // still win.
        let r = record(TestType::CptIp, |s| {
            s.set_int("total", 0);
            s.set_int("max", 0);
            s.set_float("percentage", 0.0);
            s.set_float("accuracy", 91.2);
        });
        assert!((score_of(&r) - 91.2).abs() < 1e-9);
    }

    #[test]
    fn total_over_max_scales_to_percentage() {
        let r = record(TestType::LetterNumberSpan, |s| {
            s.set_int("total", 14);
            s.set_int("max", 21);
        });
        assert!((score_of(&r) - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn raw_total_is_unbounded_by_design() {
        let r = record(TestType::SpatialSpan, |s| s.set_int("total", 140));
        assert!((score_of(&r) - 140.0).abs() < 1e-9);
    }

    #[test]
    fn bvmt_r_total_learning_fallback() {
        let r = record(TestType::BvmtR, |s| s.set_int("totalLearning", 28));
        assert!((score_of(&r) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn animal_naming_score_fallback() {
        let r = record(TestType::AnimalNaming, |s| s.set_int("score", 23));
        assert!((score_of(&r) - 23.0).abs() < 1e-9);
    }

    #[test]
    fn empty_scores_contribute_nothing() {
        let r = record(TestType::Other, |_| {});
        assert_eq!(score_of(&r), 0.0);
    }

    #[test]
    fn score_bounded_except_raw_total() {
        for pct in [0.0, 12.5, 50.0, 99.9, 100.0] {
            let r = record(TestType::HvltR, |s| s.set_float("percentage", pct));
            let score = score_of(&r);
            assert!((0.0..=100.0).contains(&score));
        }
        for pct in [1.0, 30.0, 50.0, 100.0] {
            let r = record(TestType::SymbolCoding, |s| s.set_float("percentage", pct));
            let score = score_of(&r);
            assert!((0.0..=100.0).contains(&score));
        }
    }

    #[test]
    fn unifying_score_prefers_improvement_pool() {
        let improvement = vec![record(TestType::HvltR, |s| s.set_float("percentage", 80.0))];
        let all = vec![
            record(TestType::HvltR, |s| s.set_float("percentage", 80.0)),
            record(TestType::BvmtR, |s| s.set_float("percentage", 20.0)),
        ];
        assert_eq!(unifying_score(&improvement, &all), 80);
        // Empty improvement pool falls back to the whole collection
        assert_eq!(unifying_score(&[], &all), 50);
        assert_eq!(unifying_score(&[], &[]), 0);
    }

    #[test]
    fn unifying_score_rounds_to_nearest() {
        let all = vec![
            record(TestType::HvltR, |s| s.set_float("percentage", 71.0)),
            record(TestType::BvmtR, |s| s.set_float("percentage", 72.0)),
        ];
        assert_eq!(unifying_score(&[], &all), 72); // 71.5 rounds up
    }

    #[test]
    fn interpretation_bands() {
        assert!(interpretation(92).starts_with("Excellent"));
        assert!(interpretation(85).starts_with("Excellent"));
        assert!(interpretation(84).starts_with("Very good"));
        assert!(interpretation(75).starts_with("Very good"));
        assert!(interpretation(65).starts_with("Good"));
        assert!(interpretation(55).starts_with("Fair"));
        assert!(interpretation(45).starts_with("Poor"));
        assert!(interpretation(44).starts_with("Very poor"));
        assert!(interpretation(0).starts_with("Very poor"));
    }
}
