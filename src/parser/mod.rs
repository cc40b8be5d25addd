//! XML result parser.
//!
//! Turns heterogeneous result documents — per-instrument schemas, the
//! generic camelCase `testResult` schema, and this tool's own exported
//! schema — into normalized `TestRecord`s. Unknown document shapes degrade
//! to an `Unknown Test`/`Other` record instead of failing: partial or
//! garbled administration files must still be importable and visible for
//! manual inspection. Only structurally malformed XML is an error.

pub mod dom;
pub mod exported;
pub mod instruments;

use thiserror::Error;

use crate::models::{Metadata, TestRecord, TestType};

use dom::XmlNode;
use exported::extract_exported_test;
use instruments::extract_scores;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    #[error("Empty document: no root element")]
    EmptyDocument,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Root tags that mark one embedded test each when a document carries
/// several.
const TEST_ROOT_TAGS: &[&str] = &[
    "Test",
    "Test_Result",
    "BACS_Test_Results",
    "HVLT_R_Test_Results",
    "BVMT_R_Test_Results",
    "NAB_Mazes_Test_Results",
    "TMT_Test_Results",
    "Stroop_Test_Results",
    "COWAT_Test_Results",
    "CPT_Test_Results",
];

/// Parse one XML document into its test records.
///
/// A document yields one record (single-test file), several (multi-test or
/// exported file, with index-qualified synthetic file names), or a
/// `ParseError` when the XML itself is broken.
pub fn parse_results(xml: &str, file_name: &str) -> Result<Vec<TestRecord>, ParseError> {
    let root = dom::parse_document(xml)?;

    // Exported schema first: it nests `Test` elements that would otherwise
    // trip the multi-test path below.
    if root.name == "MCCB_Exported_Results" {
        let tests: Vec<&XmlNode> = root
            .find_all("Test_Results")
            .into_iter()
            .flat_map(|results| results.find_all("Test"))
            .collect();
        if !tests.is_empty() {
            tracing::debug!(file = file_name, count = tests.len(), "exported document");
            return Ok(tests
                .iter()
                .enumerate()
                .map(|(index, test)| {
                    extract_exported_test(test, &format!("{}_test_{}", file_name, index + 1))
                })
                .collect());
        }
    }

    // Multi-test document: more than one known test root present.
    let test_elements = collect_test_elements(&root);
    if test_elements.len() > 1 {
        tracing::debug!(file = file_name, count = test_elements.len(), "multi-test document");
        return Ok(test_elements
            .iter()
            .enumerate()
            .map(|(index, el)| {
                extract_single_test(el, &format!("{}_test_{}", file_name, index + 1))
            })
            .collect());
    }

    // Single-test document: extract from the document element itself.
    Ok(vec![extract_single_test(&root, file_name)])
}

/// Known test elements in document order, the root element included.
fn collect_test_elements<'a>(root: &'a XmlNode) -> Vec<&'a XmlNode> {
    let mut out = Vec::new();
    if TEST_ROOT_TAGS.contains(&root.name.as_str()) {
        out.push(root);
    }
    collect_descendant_tests(root, &mut out);
    out
}

fn collect_descendant_tests<'a>(node: &'a XmlNode, out: &mut Vec<&'a XmlNode>) {
    for child in &node.children {
        if TEST_ROOT_TAGS.contains(&child.name.as_str()) {
            out.push(child);
        }
        collect_descendant_tests(child, out);
    }
}

/// Extract a record from one element, trying the camelCase tags first and
/// the capitalized underscore tags second.
fn extract_single_test(el: &XmlNode, file_name: &str) -> TestRecord {
    let test_name = el
        .text_at(&[&["testName"], &["Test_Name"]])
        .unwrap_or("Unknown Test")
        .to_string();
    let timestamp = el
        .text_at(&[&["timestamp"], &["Test_Time"]])
        .unwrap_or_default()
        .to_string();
    let date = el
        .text_at(&[&["date"], &["Test_Date"]])
        .unwrap_or_default()
        .to_string();

    let test_type = TestType::infer(&test_name);
    let scores = extract_scores(test_type, el);

    TestRecord {
        test_name,
        test_type,
        date,
        timestamp,
        scores,
        metadata: Metadata {
            file_name: file_name.to_string(),
            session_id: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BACS_Test_Results>
    <Test_Info>
        <Test_Name>BACS Symbol Coding Test</Test_Name>
        <Test_Date>2025-12-25</Test_Date>
        <Test_Time>15:30:00</Test_Time>
    </Test_Info>
    <Results>
        <Score>45</Score>
        <Max_Score>150</Max_Score>
        <Percentage>30.00%</Percentage>
    </Results>
</BACS_Test_Results>"#;

    #[test]
    fn single_instrument_file() {
        let records = parse_results(BACS_XML, "sample_test.xml").unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.test_name, "BACS Symbol Coding Test");
        assert_eq!(record.test_type, TestType::SymbolCoding);
        assert_eq!(record.date, "2025-12-25");
        assert_eq!(record.timestamp, "15:30:00");
        assert_eq!(record.scores.percentage(), Some(30.0));
        assert_eq!(record.metadata.file_name, "sample_test.xml");
    }

    #[test]
    fn generic_camel_case_file() {
        let xml = r#"<testResult>
            <testName>Animal Naming (Verbal Fluency)</testName>
            <score>23</score>
            <date>2025-06-11</date>
            <timestamp>10:02:44</timestamp>
        </testResult>"#;
        let records = parse_results(xml, "animal.xml").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_type, TestType::AnimalNaming);
        assert_eq!(records[0].scores.score(), Some(23.0));
    }

    #[test]
    fn multi_test_file_gets_synthetic_names() {
        let xml = r#"<Batch>
            <BACS_Test_Results>
                <Test_Info><Test_Name>BACS Symbol Coding Test</Test_Name><Test_Date>2025-01-01</Test_Date></Test_Info>
                <Results><Score>40</Score><Max_Score>150</Max_Score><Percentage>26.67%</Percentage></Results>
            </BACS_Test_Results>
            <TMT_Test_Results>
                <Test_Name>Trail Making Test: Part A</Test_Name>
                <Test_Date>2025-01-01</Test_Date>
                <Results><completionTime>48</completionTime><errors>2</errors></Results>
            </TMT_Test_Results>
        </Batch>"#;
        let records = parse_results(xml, "session.xml").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata.file_name, "session.xml_test_1");
        assert_eq!(records[1].metadata.file_name, "session.xml_test_2");
        assert_eq!(records[0].test_type, TestType::SymbolCoding);
        assert_eq!(records[1].test_type, TestType::TrailMaking);
        // Derived from completion time: 48s in [20,180] → 83
        assert_eq!(records[1].scores.score(), Some(83.0));
    }

    #[test]
    fn exported_file_extracts_each_test() {
        let xml = r#"<MCCB_Exported_Results>
            <Session_Info>
                <User_Name>Anonymous</User_Name>
                <Total_Tests>2</Total_Tests>
            </Session_Info>
            <Test_Results>
                <Test>
                    <Test_Name>HVLT-R</Test_Name>
                    <Test_Type>HVLT-R</Test_Type>
                    <Test_Date>2025-02-02</Test_Date>
                    <Scores><Total>24</Total><Max>36</Max><Percentage>66.7</Percentage></Scores>
                </Test>
                <Test>
                    <Test_Name>CPT-IP</Test_Name>
                    <Test_Type>CPT-IP</Test_Type>
                    <Test_Date>2025-02-02</Test_Date>
                    <Scores><Total>0</Total><Max>0</Max><Percentage>0</Percentage><Accuracy>91.2%</Accuracy></Scores>
                </Test>
            </Test_Results>
        </MCCB_Exported_Results>"#;
        let records = parse_results(xml, "export.xml").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].test_type, TestType::HvltR);
        assert_eq!(records[1].scores.accuracy(), Some(91.2));
        assert_eq!(records[0].metadata.file_name, "export.xml_test_1");
    }

    #[test]
    fn unknown_shape_degrades_to_other() {
        let xml = "<SomethingElse><value>42</value></SomethingElse>";
        let records = parse_results(xml, "odd.xml").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_name, "Unknown Test");
        assert_eq!(records[0].test_type, TestType::Other);
        assert!(records[0].scores.is_empty());
    }

    #[test]
    fn malformed_xml_fails() {
        assert!(matches!(
            parse_results("<a><b></a>", "broken.xml"),
            Err(ParseError::Malformed { .. })
        ));
    }
}
