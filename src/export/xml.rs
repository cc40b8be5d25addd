//! Writers for the uniform export schemas.
//!
//! `MCCB_Exported_Results` carries the full reconciled state (records plus
//! the improvement and session views); `MCCB_Merged_Results` is the leaner
//! merge-files output. Both serialize every record with the fixed Scores
//! block: Total/Max/Percentage default to 0, the remaining fields to the
//! empty string, so re-importing an export reproduces the records up to
//! those defaults.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

use crate::engine::{date_key, score_of, Trend};
use crate::models::{ScoreSet, Session, TestRecord, TestType};

use super::ExportError;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize the full dashboard state to the exported schema.
pub fn export_results(
    records: &[TestRecord],
    improvement: &[TestRecord],
    complete: &[Session],
    user_name: &str,
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    emit(&mut writer, Event::Start(BytesStart::new("MCCB_Exported_Results")))?;

    emit(&mut writer, Event::Start(BytesStart::new("Session_Info")))?;
    write_text(&mut writer, "User_Name", display_name(user_name))?;
    write_text(
        &mut writer,
        "Export_Date",
        &exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )?;
    write_text(&mut writer, "Total_Tests", &records.len().to_string())?;
    write_text(
        &mut writer,
        "Improvement_Sessions",
        &improvement.len().to_string(),
    )?;
    write_text(&mut writer, "Complete_Sessions", &complete.len().to_string())?;
    emit(&mut writer, Event::End(BytesEnd::new("Session_Info")))?;

    emit(&mut writer, Event::Start(BytesStart::new("Test_Results")))?;
    for record in records {
        write_test_block(&mut writer, record, true)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("Test_Results")))?;

    write_improvement_data(&mut writer, improvement)?;
    write_complete_sessions(&mut writer, complete)?;

    emit(&mut writer, Event::End(BytesEnd::new("MCCB_Exported_Results")))?;

    finish(writer)
}

/// Serialize the record collection to the merged schema.
pub fn merge_results(
    records: &[TestRecord],
    user_name: &str,
    merged_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    emit(&mut writer, Event::Start(BytesStart::new("MCCB_Merged_Results")))?;

    emit(&mut writer, Event::Start(BytesStart::new("Session_Info")))?;
    write_text(&mut writer, "User_Name", display_name(user_name))?;
    write_text(
        &mut writer,
        "Merge_Date",
        &merged_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )?;
    write_text(&mut writer, "Total_Tests", &records.len().to_string())?;
    emit(&mut writer, Event::End(BytesEnd::new("Session_Info")))?;

    emit(&mut writer, Event::Start(BytesStart::new("Test_Results")))?;
    for record in records {
        write_test_block(&mut writer, record, false)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("Test_Results")))?;

    emit(&mut writer, Event::End(BytesEnd::new("MCCB_Merged_Results")))?;

    finish(writer)
}

/// Download-style file name for an export, timestamp made filesystem-safe.
pub fn export_file_name(user_name: &str, at: DateTime<Utc>) -> String {
    timestamped_name("MCCB_Export", user_name, at)
}

/// Download-style file name for a merge.
pub fn merge_file_name(user_name: &str, at: DateTime<Utc>) -> String {
    timestamped_name("MCCB_Merged", user_name, at)
}

fn timestamped_name(prefix: &str, user_name: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_{}_{}.xml", prefix, display_name(user_name), stamp)
}

fn display_name(user_name: &str) -> &str {
    if user_name.is_empty() {
        "Anonymous"
    } else {
        user_name
    }
}

fn write_test_block(
    writer: &mut XmlWriter,
    record: &TestRecord,
    with_type_and_metadata: bool,
) -> Result<(), ExportError> {
    emit(writer, Event::Start(BytesStart::new("Test")))?;
    write_text(writer, "Test_Name", &record.test_name)?;
    if with_type_and_metadata {
        write_text(writer, "Test_Type", record.test_type.as_str())?;
    }
    write_text(writer, "Test_Date", &record.date)?;
    write_text(writer, "Test_Time", &record.timestamp)?;

    emit(writer, Event::Start(BytesStart::new("Scores")))?;
    write_text(writer, "Total", &score_text(&record.scores, "total", "0"))?;
    write_text(writer, "Max", &score_text(&record.scores, "max", "0"))?;
    write_text(
        writer,
        "Percentage",
        &score_text(&record.scores, "percentage", "0"),
    )?;
    write_text(writer, "Accuracy", &score_text(&record.scores, "accuracy", ""))?;
    write_text(
        writer,
        "ReactionTime",
        &score_text(&record.scores, "reactionTime", ""),
    )?;
    write_text(
        writer,
        "TotalLearning",
        &score_text(&record.scores, "totalLearning", ""),
    )?;
    write_text(
        writer,
        "AverageLearning",
        &score_text(&record.scores, "averageLearning", ""),
    )?;
    write_text(
        writer,
        "DelayedRecall",
        &score_text(&record.scores, "delayedRecall", ""),
    )?;
    write_text(
        writer,
        "Recognition",
        &score_text(&record.scores, "recognition", ""),
    )?;
    emit(writer, Event::End(BytesEnd::new("Scores")))?;

    if with_type_and_metadata {
        emit(writer, Event::Start(BytesStart::new("Metadata")))?;
        let file_name = if record.metadata.file_name.is_empty() {
            "Unknown"
        } else {
            &record.metadata.file_name
        };
        write_text(writer, "File_Name", file_name)?;
        write_text(writer, "Session_ID", &record.metadata.session_id)?;
        emit(writer, Event::End(BytesEnd::new("Metadata")))?;
    }

    emit(writer, Event::End(BytesEnd::new("Test")))?;
    Ok(())
}

fn write_improvement_data(
    writer: &mut XmlWriter,
    improvement: &[TestRecord],
) -> Result<(), ExportError> {
    // Group by type in first-seen (i.e. sorted) order
    let mut order: Vec<TestType> = Vec::new();
    let mut by_type: std::collections::HashMap<TestType, Vec<&TestRecord>> =
        std::collections::HashMap::new();
    for record in improvement {
        if !order.contains(&record.test_type) {
            order.push(record.test_type);
        }
        by_type.entry(record.test_type).or_default().push(record);
    }

    emit(writer, Event::Start(BytesStart::new("Improvement_Data")))?;
    for test_type in order {
        let group = &by_type[&test_type];
        let mut dates: Vec<String> = group.iter().map(|r| date_key(&r.date)).collect();
        dates.sort();
        let date_range = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) if first != last => format!("{first} - {last}"),
            (Some(first), _) => first.clone(),
            _ => String::new(),
        };
        let scores: Vec<f64> = group.iter().map(|r| score_of(r)).collect();
        let (trend, _) = Trend::classify(&scores);

        emit(writer, Event::Start(BytesStart::new("Improvement_Session")))?;
        write_text(writer, "Test_Type", test_type.as_str())?;
        write_text(writer, "Test_Count", &group.len().to_string())?;
        write_text(writer, "Date_Range", &date_range)?;
        write_text(writer, "Trend", trend.as_str())?;
        emit(writer, Event::End(BytesEnd::new("Improvement_Session")))?;
    }
    emit(writer, Event::End(BytesEnd::new("Improvement_Data")))?;
    Ok(())
}

fn write_complete_sessions(
    writer: &mut XmlWriter,
    complete: &[Session],
) -> Result<(), ExportError> {
    emit(writer, Event::Start(BytesStart::new("Complete_Sessions")))?;
    for session in complete {
        let average = if session.tests.is_empty() {
            0
        } else {
            (session.tests.iter().map(score_of).sum::<f64>() / session.tests.len() as f64).round()
                as i64
        };
        emit(writer, Event::Start(BytesStart::new("Complete_Session")))?;
        write_text(writer, "Session_Date", &session.date)?;
        write_text(writer, "Test_Count", &session.tests.len().to_string())?;
        write_text(writer, "Average_Score", &average.to_string())?;
        emit(writer, Event::End(BytesEnd::new("Complete_Session")))?;
    }
    emit(writer, Event::End(BytesEnd::new("Complete_Sessions")))?;
    Ok(())
}

/// Render one score field for the fixed Scores block.
fn score_text(scores: &ScoreSet, key: &str, default: &str) -> String {
    match scores.get(key) {
        Some(Value::Number(n)) => {
            // Integral floats print without the trailing ".0" so re-parsing
            // reproduces the stored value
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    format!("{f}")
                }
            } else {
                default.to_string()
            }
        }
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

fn write_text(writer: &mut XmlWriter, tag: &str, text: &str) -> Result<(), ExportError> {
    emit(writer, Event::Start(BytesStart::new(tag)))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn emit(writer: &mut XmlWriter, event: Event) -> Result<(), ExportError> {
    writer
        .write_event(event)
        .map_err(|e| ExportError::Write(e.to_string()))
}

fn finish(writer: XmlWriter) -> Result<String, ExportError> {
    String::from_utf8(writer.into_inner().into_inner()).map_err(|_| ExportError::Encoding)
}
