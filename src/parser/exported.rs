//! Extractor for this tool's own exported schema (`MCCB_Exported_Results`).
//!
//! Unlike the per-instrument extractors, tag names here are fixed and
//! capitalized. Total/Max/Percentage always serialize (absent values as 0);
//! the remaining score fields are present only when the source record had
//! them.

use std::str::FromStr;

use crate::models::{parse_integer, parse_number, Metadata, ScoreSet, TestRecord, TestType};

use super::dom::XmlNode;

/// Extract one record from a `<Test>` element of an exported document.
pub fn extract_exported_test(el: &XmlNode, fallback_file_name: &str) -> TestRecord {
    let test_name = el
        .text_at(&[&["Test_Name"]])
        .unwrap_or("Unknown Test")
        .to_string();
    let type_text = el.text_at(&[&["Test_Type"]]).unwrap_or("Unknown");
    // Exported files carry the canonical tag verbatim; anything else (old
    // exports wrote free text here) goes back through name inference.
    let test_type =
        TestType::from_str(type_text).unwrap_or_else(|_| TestType::infer(type_text));
    let date = el.text_at(&[&["Test_Date"]]).unwrap_or_default().to_string();
    let timestamp = el.text_at(&[&["Test_Time"]]).unwrap_or_default().to_string();

    let mut scores = ScoreSet::new();
    let scores_el = el.find("Scores");

    scores.set_int(
        "total",
        score_field(scores_el, "Total").and_then(parse_integer).unwrap_or(0),
    );
    scores.set_int(
        "max",
        score_field(scores_el, "Max").and_then(parse_integer).unwrap_or(0),
    );
    scores.set_float(
        "percentage",
        score_field(scores_el, "Percentage")
            .and_then(parse_number)
            .unwrap_or(0.0),
    );

    if let Some(accuracy) = score_field(scores_el, "Accuracy").and_then(parse_number) {
        scores.set_float("accuracy", accuracy);
    }
    if let Some(reaction_time) = score_field(scores_el, "ReactionTime").and_then(parse_number) {
        scores.set_float("reactionTime", reaction_time);
    }
    if let Some(total_learning) = score_field(scores_el, "TotalLearning").and_then(parse_integer) {
        scores.set_int("totalLearning", total_learning);
    }
    if let Some(average_learning) =
        score_field(scores_el, "AverageLearning").and_then(parse_number)
    {
        scores.set_float("averageLearning", average_learning);
    }
    if let Some(delayed_recall) = score_field(scores_el, "DelayedRecall").and_then(parse_integer) {
        scores.set_int("delayedRecall", delayed_recall);
    }
    if let Some(recognition) = score_field(scores_el, "Recognition").and_then(parse_integer) {
        scores.set_int("recognition", recognition);
    }

    let metadata_el = el.find("Metadata");
    let metadata = Metadata {
        file_name: metadata_el
            .and_then(|m| m.text_at(&[&["File_Name"]]))
            .unwrap_or(fallback_file_name)
            .to_string(),
        session_id: metadata_el
            .and_then(|m| m.text_at(&[&["Session_ID"]]))
            .unwrap_or_default()
            .to_string(),
    };

    TestRecord {
        test_name,
        test_type,
        date,
        timestamp,
        scores,
        metadata,
    }
}

fn score_field<'a>(scores_el: Option<&'a XmlNode>, tag: &str) -> Option<&'a str> {
    scores_el.and_then(|s| s.text_at(&[&[tag]]))
}
