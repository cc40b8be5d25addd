//! Instrument-specific score extraction.
//!
//! Each instrument's widget serializes a different field set, and several
//! fields exist under more than one historical tag location. Every lookup
//! tries the alternatives in order, first non-empty match wins. Missing
//! fields stay absent from the score set — they are not defaulted.

use serde_json::Value;

use crate::models::{parse_integer, parse_number, ScoreSet, TestType};

use super::dom::XmlNode;

/// Dispatch to the extractor for the given instrument.
/// `Other` yields an empty score set (lenient fallback).
pub fn extract_scores(test_type: TestType, el: &XmlNode) -> ScoreSet {
    match test_type {
        TestType::HvltR => hvlt_r_scores(el),
        TestType::BvmtR => bvmt_r_scores(el),
        TestType::NabMazes => nab_mazes_scores(el),
        TestType::LetterNumberSpan => span_scores(el),
        TestType::SpatialSpan => span_scores(el),
        TestType::SymbolCoding => symbol_coding_scores(el),
        TestType::AnimalNaming => animal_naming_scores(el),
        TestType::TrailMaking => trail_making_scores(el),
        TestType::CptIp => cpt_scores(el),
        TestType::Other => ScoreSet::new(),
    }
}

fn set_int_at(scores: &mut ScoreSet, key: &str, el: &XmlNode, paths: &[&[&str]]) {
    if let Some(value) = el.text_at(paths).and_then(parse_integer) {
        scores.set_int(key, value);
    }
}

fn set_float_at(scores: &mut ScoreSet, key: &str, el: &XmlNode, paths: &[&[&str]]) {
    if let Some(value) = el.text_at(paths).and_then(parse_number) {
        scores.set_float(key, value);
    }
}

fn hvlt_r_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "totalRecall", el, &[&["totalRecallScore"]]);
    set_int_at(&mut scores, "learning", el, &[&["learningScore"]]);
    set_int_at(&mut scores, "delayedRecall", el, &[&["delayedRecallScore"]]);
    set_float_at(&mut scores, "retention", el, &[&["retentionScore"]]);
    set_float_at(&mut scores, "percentage", el, &[&["percentage"]]);

    let trials = trial_scores(el, "immediateRecall");
    scores.set_value("immediateRecall", Value::Array(trials));
    scores
}

fn bvmt_r_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(
        &mut scores,
        "totalLearning",
        el,
        &[&["totalLearningScore"], &["Results", "totalLearningScore"]],
    );
    set_float_at(
        &mut scores,
        "averageLearning",
        el,
        &[&["averageLearningScore"], &["Results", "averageLearningScore"]],
    );
    set_int_at(
        &mut scores,
        "delayedRecall",
        el,
        &[&["delayedRecallScore"], &["Results", "delayedRecallScore"]],
    );
    set_int_at(
        &mut scores,
        "recognition",
        el,
        &[&["recognitionScore"], &["Results", "recognitionScore"]],
    );

    let trials = trial_scores(el, "learningScores");
    scores.set_value("learningTrials", Value::Array(trials));
    scores
}

/// Per-trial bare scores nested under a container tag.
fn trial_scores(el: &XmlNode, container: &str) -> Vec<Value> {
    let Some(container) = el.find(container) else {
        return Vec::new();
    };
    container
        .find_all("trial")
        .into_iter()
        .filter_map(|trial| trial.find("score").map(XmlNode::text))
        .filter_map(parse_integer)
        .map(Value::from)
        .collect()
}

fn nab_mazes_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "total", el, &[&["totalScore"]]);
    set_int_at(&mut scores, "max", el, &[&["maxScore"]]);
    set_float_at(&mut scores, "percentage", el, &[&["percentage"]]);

    let mut mazes = Vec::new();
    if let Some(results) = el.find("mazeResults") {
        for maze in results.find_all("maze") {
            let name = maze.find("name").map(XmlNode::text).unwrap_or_default();
            let Some(score) = maze
                .find("score")
                .map(XmlNode::text)
                .and_then(parse_integer)
            else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let time_taken = maze
                .find("timeTaken")
                .map(XmlNode::text)
                .and_then(parse_integer)
                .unwrap_or(0);
            let completed = maze.find("completed").map(XmlNode::text) == Some("true");
            mazes.push(serde_json::json!({
                "name": name,
                "score": score,
                "timeTaken": time_taken,
                "completed": completed,
            }));
        }
    }
    scores.set_value("mazes", Value::Array(mazes));
    scores
}

/// Letter-Number Span and WMS-III Spatial Span share one shape:
/// total/max plus numbered trials.
fn span_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "total", el, &[&["totalScore"]]);
    set_int_at(&mut scores, "max", el, &[&["maxScore"]]);

    let mut trials = Vec::new();
    for trial in el.find_all("trial") {
        let number = trial
            .find("trialNumber")
            .map(XmlNode::text)
            .and_then(parse_integer);
        let score = trial
            .find("score")
            .map(XmlNode::text)
            .and_then(parse_integer);
        if let (Some(number), Some(score)) = (number, score) {
            trials.push(serde_json::json!({"trial": number, "score": score}));
        }
    }
    scores.set_value("trials", Value::Array(trials));
    scores
}

fn symbol_coding_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "score", el, &[&["Score"], &["Results", "Score"]]);
    set_int_at(
        &mut scores,
        "maxScore",
        el,
        &[&["Max_Score"], &["Results", "Max_Score"]],
    );
    set_float_at(
        &mut scores,
        "percentage",
        el,
        &[&["Percentage"], &["Results", "Percentage"]],
    );
    set_int_at(
        &mut scores,
        "timeTaken",
        el,
        &[&["Time_Taken_Seconds"], &["Results", "Time_Taken_Seconds"]],
    );
    set_float_at(
        &mut scores,
        "timePerItem",
        el,
        &[&["Time_Per_Item"], &["Results", "Time_Per_Item"]],
    );
    scores
}

fn animal_naming_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "score", el, &[&["score"]]);
    set_int_at(&mut scores, "timeTaken", el, &[&["timeTaken"]]);
    set_int_at(&mut scores, "testDuration", el, &[&["testDuration"]]);
    set_float_at(&mut scores, "percentage", el, &[&["percentage"]]);

    let word_count = el.find_all("word").len();
    if word_count > 0 {
        scores.set_int("wordCount", word_count as i64);
    }
    scores
}

/// Completion-time clamp bounds for the derived Trail Making score.
const TRAIL_MIN_TIME_SECS: f64 = 20.0;
const TRAIL_MAX_TIME_SECS: f64 = 180.0;

fn trail_making_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(
        &mut scores,
        "score",
        el,
        &[
            &["score"],
            &["Results", "score"],
            &["TMT_Test_Results", "Results", "score"],
        ],
    );
    set_int_at(
        &mut scores,
        "timeTaken",
        el,
        &[
            &["timeTaken"],
            &["Results", "timeTaken"],
            &["TMT_Test_Results", "Results", "timeTaken"],
        ],
    );
    set_int_at(
        &mut scores,
        "errors",
        el,
        &[
            &["errors"],
            &["Results", "errors"],
            &["TMT_Test_Results", "Results", "errors"],
        ],
    );
    set_float_at(
        &mut scores,
        "percentage",
        el,
        &[
            &["percentage"],
            &["Results", "percentage"],
            &["TMT_Test_Results", "Results", "percentage"],
        ],
    );
    set_int_at(
        &mut scores,
        "completionTime",
        el,
        &[
            &["completionTime"],
            &["Results", "completionTime"],
            &["TMT_Test_Results", "Results", "completionTime"],
        ],
    );

    // No explicit percentage: mirror the score, when one was reported.
    if !scores.contains("percentage") {
        if let Some(score) = scores.get("score").cloned() {
            scores.set_value("percentage", score);
        }
    }

    // Timed-only files report completion time without a score. Derive one by
    // linear inversion over the clamped [20s, 180s] window (faster is
    // better) and mirror it into percentage.
    let completion = scores.get_num("completionTime").filter(|t| *t != 0.0);
    let has_score = scores.score().is_some_and(|s| s != 0.0);
    if let (Some(time), false) = (completion, has_score) {
        let clamped = time.clamp(TRAIL_MIN_TIME_SECS, TRAIL_MAX_TIME_SECS);
        let derived = (100.0
            * (1.0 - (clamped - TRAIL_MIN_TIME_SECS) / (TRAIL_MAX_TIME_SECS - TRAIL_MIN_TIME_SECS)))
            .round() as i64;
        scores.set_int("score", derived);
        scores.set_int("percentage", derived);
    }

    scores
}

fn cpt_scores(el: &XmlNode) -> ScoreSet {
    let mut scores = ScoreSet::new();
    set_int_at(&mut scores, "score", el, &[&["score"], &["Results", "score"]]);
    set_int_at(
        &mut scores,
        "timeTaken",
        el,
        &[&["timeTaken"], &["Results", "timeTaken"]],
    );
    set_float_at(
        &mut scores,
        "accuracy",
        el,
        &[&["accuracy"], &["Results", "accuracy"]],
    );
    set_float_at(
        &mut scores,
        "reactionTime",
        el,
        &[&["reactionTime"], &["Results", "reactionTime"]],
    );
    scores
}
