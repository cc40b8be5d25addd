//! Best-effort off-device backup.
//!
//! The dashboard optionally mirrors its state to a small local collaborator
//! service. Both endpoints are fire-and-forget: any transport failure is
//! downgraded to a warning and never blocks the local workflow. No retries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::TestRecord;

/// Request timeout. The collaborator is local; anything slower is down.
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Could not reach backup service at {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backup service rejected the payload: {0}")]
    Rejected(String),
}

/// Payload for the `/save-data` endpoint.
#[derive(Serialize)]
struct SaveDataRequest<'a> {
    #[serde(rename = "userName")]
    user_name: &'a str,
    #[serde(rename = "testData")]
    test_data: &'a [TestRecord],
    timestamp: String,
}

/// Payload for the `/save-merged-xml` endpoint.
#[derive(Serialize)]
struct SaveMergedXmlRequest<'a> {
    #[serde(rename = "xmlContent")]
    xml_content: &'a str,
    #[serde(rename = "fileName")]
    file_name: &'a str,
}

pub struct BackupClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl BackupClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// POST the record collection to `/save-data`.
    pub fn save_data(
        &self,
        user_name: &str,
        records: &[TestRecord],
        at: DateTime<Utc>,
    ) -> Result<(), BackupError> {
        let body = SaveDataRequest {
            user_name,
            test_data: records,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let url = format!("{}/save-data", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackupError::Rejected(response.status().to_string()))
        }
    }

    /// POST a merged XML document to `/save-merged-xml`.
    pub fn save_merged_xml(&self, xml_content: &str, file_name: &str) -> Result<(), BackupError> {
        let body = SaveMergedXmlRequest {
            xml_content,
            file_name,
        };
        let url = format!("{}/save-merged-xml", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackupError::Rejected(response.status().to_string()))
        }
    }

    /// Fire-and-forget wrapper: failures become a warning, nothing more.
    pub fn save_data_best_effort(&self, user_name: &str, records: &[TestRecord], at: DateTime<Utc>) {
        if let Err(e) = self.save_data(user_name, records, at) {
            tracing::warn!(error = %e, "Could not save data to backup service");
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> BackupError {
        if e.is_connect() {
            BackupError::Connection(self.base_url.clone())
        } else {
            BackupError::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = BackupClient::new("http://localhost:8001/");
        assert_eq!(client.base_url, "http://localhost:8001");
    }

    #[test]
    fn unreachable_service_is_a_connection_error() {
        // Reserved port on localhost with nothing listening
        let client = BackupClient::new("http://127.0.0.1:1");
        let result = client.save_merged_xml("<x/>", "f.xml");
        assert!(matches!(
            result,
            Err(BackupError::Connection(_)) | Err(BackupError::Http(_))
        ));
    }

    #[test]
    fn best_effort_never_panics() {
        let client = BackupClient::new("http://127.0.0.1:1");
        let at = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        client.save_data_best_effort("Ada", &[], at);
    }
}
