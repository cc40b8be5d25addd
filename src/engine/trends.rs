//! Per-type statistics and trend classification over the record views.
//!
//! Everything here is decision-free math feeding the summary surface; no
//! rendering concerns.

use serde::{Deserialize, Serialize};

use crate::models::{DateRange, Session, TestRecord, TestType};

use super::categorize::date_key;
use super::scoring::{interpretation, score_of, unifying_score};

/// Half-mean difference beyond which a score series counts as moving.
const TREND_THRESHOLD: f64 = 5.0;

/// Comparable score below which an administration counts as failed.
const FAILED_CUTOFF: f64 = 20.0;
/// Comparable score from which an administration counts as acceptable.
const ACCEPTABLE_CUTOFF: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    NotAvailable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "Improving",
            Self::Declining => "Declining",
            Self::Stable => "Stable",
            Self::NotAvailable => "N/A",
        }
    }

    /// Classify a score series: second-half mean against first-half mean.
    pub fn classify(scores: &[f64]) -> (Trend, f64) {
        if scores.len() < 2 {
            return (Trend::NotAvailable, 0.0);
        }
        let mid = scores.len() / 2;
        let first_avg = mean(&scores[..mid]);
        let second_avg = mean(&scores[mid..]);
        let value = second_avg - first_avg;
        let trend = if value > TREND_THRESHOLD {
            Trend::Improving
        } else if value < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        };
        (trend, value)
    }
}

/// Detailed per-type statistics over the full record collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeMetrics {
    pub test_type: TestType,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub trend: Trend,
    pub trend_value: f64,
    /// Most recent score in collection order.
    pub latest: f64,
    pub best: f64,
}

/// Compute per-type metrics, types in first-seen order.
pub fn type_metrics(records: &[TestRecord]) -> Vec<TypeMetrics> {
    let mut order: Vec<TestType> = Vec::new();
    let mut by_type: std::collections::HashMap<TestType, Vec<f64>> =
        std::collections::HashMap::new();
    for record in records {
        if !order.contains(&record.test_type) {
            order.push(record.test_type);
        }
        by_type.entry(record.test_type).or_default().push(score_of(record));
    }

    order
        .into_iter()
        .map(|test_type| {
            let scores = &by_type[&test_type];
            let mut sorted = scores.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let count = sorted.len();
            let median = if count % 2 == 0 {
                (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
            } else {
                sorted[count / 2]
            };
            let mean_score = mean(scores);
            let variance =
                scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / count as f64;
            let (trend, trend_value) = Trend::classify(scores);
            TypeMetrics {
                test_type,
                count,
                min: sorted[0],
                max: sorted[count - 1],
                mean: mean_score,
                median,
                std_dev: variance.sqrt(),
                trend,
                trend_value,
                latest: scores.last().copied().unwrap_or(0.0),
                best: sorted[count - 1],
            }
        })
        .collect()
}

/// First-to-last movement per test type across the improvement pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementTrend {
    pub test_type: TestType,
    pub first_score: f64,
    pub last_score: f64,
    pub improvement: f64,
    pub improvement_percent: f64,
    pub test_count: usize,
}

/// Track progress per type over repeated administrations. Types with fewer
/// than two records carry no trend and are omitted.
pub fn improvement_trends(improvement: &[TestRecord]) -> Vec<ImprovementTrend> {
    let mut order: Vec<TestType> = Vec::new();
    let mut by_type: std::collections::HashMap<TestType, Vec<(String, f64)>> =
        std::collections::HashMap::new();
    for record in improvement {
        if !order.contains(&record.test_type) {
            order.push(record.test_type);
        }
        by_type
            .entry(record.test_type)
            .or_default()
            .push((date_key(&record.date), score_of(record)));
    }

    order
        .into_iter()
        .filter_map(|test_type| {
            let mut series = by_type.remove(&test_type)?;
            if series.len() < 2 {
                return None;
            }
            series.sort_by(|a, b| a.0.cmp(&b.0));
            let first_score = series.first().map(|(_, s)| *s)?;
            let last_score = series.last().map(|(_, s)| *s)?;
            let improvement = last_score - first_score;
            let improvement_percent = if first_score > 0.0 {
                improvement / first_score * 100.0
            } else {
                0.0
            };
            Some(ImprovementTrend {
                test_type,
                first_score,
                last_score,
                improvement,
                improvement_percent,
                test_count: series.len(),
            })
        })
        .collect()
}

/// Performance distribution across the whole collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BandCounts {
    /// Comparable score below 20 (or no signal at all).
    pub failed: usize,
    /// Comparable score in [20, 50).
    pub low: usize,
    /// Comparable score of 50 or above.
    pub acceptable: usize,
    /// Failed administrations grouped by type, first-seen order.
    pub failures_by_type: Vec<(TestType, usize)>,
}

pub fn performance_bands(records: &[TestRecord]) -> BandCounts {
    let mut bands = BandCounts::default();
    for record in records {
        let score = score_of(record);
        if score < FAILED_CUTOFF {
            bands.failed += 1;
            match bands
                .failures_by_type
                .iter_mut()
                .find(|(t, _)| *t == record.test_type)
            {
                Some((_, count)) => *count += 1,
                None => bands.failures_by_type.push((record.test_type, 1)),
            }
        } else if score < ACCEPTABLE_CUTOFF {
            bands.low += 1;
        } else {
            bands.acceptable += 1;
        }
    }
    bands
}

/// Everything the summary surface shows in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_tests: usize,
    pub distinct_types: usize,
    pub date_range: DateRange,
    pub unifying_score: i64,
    pub interpretation: String,
    pub average_score: f64,
    pub improvement_count: usize,
    pub complete_count: usize,
    pub bands: BandCounts,
}

pub fn summarize(
    records: &[TestRecord],
    improvement: &[TestRecord],
    complete: &[Session],
) -> DashboardSummary {
    let mut types: Vec<TestType> = Vec::new();
    for record in records {
        if !types.contains(&record.test_type) {
            types.push(record.test_type);
        }
    }

    let mut dates: Vec<String> = records.iter().map(|r| date_key(&r.date)).collect();
    dates.sort();
    let date_range = DateRange {
        earliest: dates.first().cloned(),
        latest: dates.last().cloned(),
    };

    let score = unifying_score(improvement, records);
    let average_score = if records.is_empty() {
        0.0
    } else {
        records.iter().map(score_of).sum::<f64>() / records.len() as f64
    };

    DashboardSummary {
        total_tests: records.len(),
        distinct_types: types.len(),
        date_range,
        unifying_score: score,
        interpretation: interpretation(score).to_string(),
        average_score,
        improvement_count: improvement.len(),
        complete_count: complete.len(),
        bands: performance_bands(records),
    }
}

fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}
