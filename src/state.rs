//! Dashboard controller state.
//!
//! One owner for the record collection and the categorized views — the
//! parser, engine, exporter, and store all work against this struct instead
//! of ambient globals. Records are only ever appended or cleared; the views
//! are a pure recompute after every change.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{self, DashboardSummary};
use crate::export::{self, ExportError};
use crate::models::{Session, TestRecord};
use crate::parser::{self, ParseError};
use crate::store::{Store, StoreError};

pub struct DashboardState {
    records: Vec<TestRecord>,
    improvement: Vec<TestRecord>,
    complete: Vec<Session>,
    user_name: String,
}

/// Outcome of one batch import. A batch never fails as a whole: bad files
/// are skipped and counted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub tests_added: usize,
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            improvement: Vec::new(),
            complete: Vec::new(),
            user_name: "Anonymous".to_string(),
        }
    }

    /// Resume from the durable store. A corrupt payload starts an empty
    /// dashboard with a warning instead of refusing to open.
    pub fn load(store: &Store) -> Self {
        let records = match store.load_records() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Stored test data unreadable, starting empty");
                Vec::new()
            }
        };
        let user_name = store.load_user_name().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored user name unreadable");
            "Anonymous".to_string()
        });

        let mut state = Self {
            records,
            improvement: Vec::new(),
            complete: Vec::new(),
            user_name,
        };
        state.recategorize();
        state
    }

    /// Persist both store keys. Runs synchronously after each successful
    /// categorization pass.
    pub fn persist(&self, store: &Store) -> Result<(), StoreError> {
        store.save_records(&self.records)?;
        store.save_user_name(&self.user_name)
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn improvement(&self) -> &[TestRecord] {
        &self.improvement
    }

    pub fn complete(&self) -> &[Session] {
        &self.complete
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.user_name = if name.trim().is_empty() {
            "Anonymous".to_string()
        } else {
            name.trim().to_string()
        };
    }

    /// Append parsed records and recompute the views.
    pub fn add_records(&mut self, records: Vec<TestRecord>) {
        self.records.extend(records);
        self.recategorize();
    }

    /// Parse one in-memory document and append its records.
    pub fn import_xml(&mut self, xml: &str, file_name: &str) -> Result<usize, ParseError> {
        let records = parser::parse_results(xml, file_name)?;
        let added = records.len();
        self.add_records(records);
        Ok(added)
    }

    /// Batch import: every file is read and parsed independently, failures
    /// are logged and skipped, and the batch always completes.
    pub fn import_files(&mut self, paths: &[impl AsRef<Path>]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut imported: Vec<TestRecord> = Vec::new();

        for path in paths {
            let path = path.as_ref();
            summary.files_processed += 1;

            if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                tracing::warn!(file = %path.display(), "Skipping non-XML file");
                summary.files_failed += 1;
                continue;
            }

            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown.xml")
                .to_string();

            let xml = match std::fs::read_to_string(path) {
                Ok(xml) => xml,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Could not read file");
                    summary.files_failed += 1;
                    continue;
                }
            };

            match parser::parse_results(&xml, &file_name) {
                Ok(records) => {
                    summary.tests_added += records.len();
                    imported.extend(records);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Could not parse file");
                    summary.files_failed += 1;
                }
            }
        }

        self.add_records(imported);
        tracing::info!(
            processed = summary.files_processed,
            failed = summary.files_failed,
            added = summary.tests_added,
            "Import batch finished"
        );
        summary
    }

    /// Full pure recompute of the session and improvement views.
    pub fn recategorize(&mut self) {
        let categorized = engine::categorize(&self.records);
        self.improvement = categorized.improvement;
        self.complete = categorized.complete;
    }

    pub fn unifying_score(&self) -> i64 {
        engine::unifying_score(&self.improvement, &self.records)
    }

    pub fn summary(&self) -> DashboardSummary {
        engine::summarize(&self.records, &self.improvement, &self.complete)
    }

    pub fn export_xml(&self, at: DateTime<Utc>) -> Result<String, ExportError> {
        export::export_results(
            &self.records,
            &self.improvement,
            &self.complete,
            &self.user_name,
            at,
        )
    }

    pub fn merge_xml(&self, at: DateTime<Utc>) -> Result<String, ExportError> {
        export::merge_results(&self.records, &self.user_name, at)
    }

    /// Drop all imported data. The user name survives.
    pub fn clear(&mut self) {
        self.records.clear();
        self.improvement.clear();
        self.complete.clear();
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STORE_KEY_TEST_DATA;

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
    fn import_xml_appends_and_categorizes() {
        let mut state = DashboardState::new();
        let added = state.import_xml(BACS_XML, "sample.xml").unwrap();
        assert_eq!(added, 1);
        assert_eq!(state.records().len(), 1);
        assert_eq!(state.improvement().len(), 1);
        assert!(state.complete().is_empty());
        // Raw 30% re-anchors to 60
        assert_eq!(state.unifying_score(), 60);
    }

    #[test]
    fn reimporting_same_document_dedups_improvement_pool() {
        let mut state = DashboardState::new();
        state.import_xml(BACS_XML, "a.xml").unwrap();
        state.import_xml(BACS_XML, "b.xml").unwrap();
        assert_eq!(state.records().len(), 2);
        assert_eq!(state.improvement().len(), 1);
        assert_eq!(state.unifying_score(), 60);
    }

    #[test]
    fn import_files_skips_bad_files_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        std::fs::write(&good, BACS_XML).unwrap();
        let broken = dir.path().join("broken.xml");
        std::fs::write(&broken, "<a><b></a>").unwrap();
        let not_xml = dir.path().join("notes.txt");
        std::fs::write(&not_xml, "hello").unwrap();
        let missing = dir.path().join("missing.xml");

        let mut state = DashboardState::new();
        let summary = state.import_files(&[good, broken, not_xml, missing]);
        assert_eq!(summary.files_processed, 4);
        assert_eq!(summary.files_failed, 3);
        assert_eq!(summary.tests_added, 1);
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn persist_and_load_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let mut state = DashboardState::new();
        state.set_user_name("Ada");
        state.import_xml(BACS_XML, "sample.xml").unwrap();
        state.persist(&store).unwrap();

        let resumed = DashboardState::load(&store);
        assert_eq!(resumed.user_name(), "Ada");
        assert_eq!(resumed.records(), state.records());
        assert_eq!(resumed.improvement().len(), 1);
    }

    #[test]
    fn load_with_corrupt_payload_starts_empty() {
        let store = Store::open_in_memory().unwrap();
        store.set(STORE_KEY_TEST_DATA, "{broken").unwrap();
        let state = DashboardState::load(&store);
        assert!(state.is_empty());
    }

    #[test]
    fn set_user_name_falls_back_to_anonymous() {
        let mut state = DashboardState::new();
        state.set_user_name("  ");
        assert_eq!(state.user_name(), "Anonymous");
        state.set_user_name(" Ada ");
        assert_eq!(state.user_name(), "Ada");
    }

    #[test]
    fn clear_keeps_user_name() {
        let mut state = DashboardState::new();
        state.set_user_name("Ada");
        state.import_xml(BACS_XML, "sample.xml").unwrap();
        state.clear();
        assert!(state.is_empty());
        assert!(state.improvement().is_empty());
        assert_eq!(state.user_name(), "Ada");
    }
}
