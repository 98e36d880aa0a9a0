//! Remote batch processing service boundary.
//!
//! The pipeline only needs four operations from the service: create a job
//! from a specification, start it, re-read its status, and fold the
//! (paginated) per-tile listing into status counts. `BatchService` captures
//! that surface; `HttpBatchService` is the production implementation.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::core::geometry::Aoi;
use crate::core::job::{JobHandle, JobSpec};
use crate::core::params::ServiceConfig;
use crate::types::{TileState, TileStatusCounts};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Service rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}

/// Operations the pipeline requires from the remote batch service.
pub trait BatchService {
    /// Submit a new job. A rejection is fatal; there is no local retry.
    fn create(&self, spec: &JobSpec, aoi: &Aoi) -> Result<JobHandle, BatchError>;

    /// Request processing start for a created job.
    fn start(&self, job_id: &str) -> Result<(), BatchError>;

    /// Re-read the job resource. This is the only way job state changes
    /// locally.
    fn get_status(&self, job_id: &str) -> Result<JobHandle, BatchError>;

    /// Count tiles per state across the full (paginated) tile listing.
    fn tile_status_counts(&self, job_id: &str) -> Result<TileStatusCounts, BatchError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TileRecord {
    status: TileState,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TilePage {
    #[serde(default)]
    data: Vec<TileRecord>,
    #[serde(default)]
    links: Option<PageLinks>,
}

/// HTTP implementation of [`BatchService`].
///
/// Credentials come in through the constructor; a bearer token is fetched
/// once via the OAuth2 client-credentials flow and reused for the lifetime
/// of the client.
pub struct HttpBatchService {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBatchService {
    pub fn new(config: &ServiceConfig) -> Result<Self, BatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let token = fetch_token(&client, config)?;
        Ok(HttpBatchService {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/process/{}", self.base_url, job_id)
    }
}

fn fetch_token(client: &Client, config: &ServiceConfig) -> Result<String, BatchError> {
    let response = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ])
        .send()?;
    if !response.status().is_success() {
        return Err(BatchError::Auth(format!(
            "token endpoint returned HTTP {}",
            response.status().as_u16()
        )));
    }
    let token: TokenResponse = response
        .json()
        .map_err(|e| BatchError::MalformedResponse(e.to_string()))?;
    Ok(token.access_token)
}

/// Turn a non-success response into a `Rejected` error carrying the service
/// message, so failure reports name the actual refusal instead of a bare
/// status line.
fn expect_success(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, BatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err(BatchError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl BatchService for HttpBatchService {
    fn create(&self, spec: &JobSpec, aoi: &Aoi) -> Result<JobHandle, BatchError> {
        let response = self
            .client
            .post(format!("{}/process", self.base_url))
            .bearer_auth(&self.token)
            .json(&spec.to_request_body(aoi))
            .send()?;
        let response = expect_success(response)?;
        response
            .json::<JobHandle>()
            .map_err(|e| BatchError::MalformedResponse(e.to_string()))
    }

    fn start(&self, job_id: &str) -> Result<(), BatchError> {
        let response = self
            .client
            .post(format!("{}/start", self.job_url(job_id)))
            .bearer_auth(&self.token)
            .send()?;
        expect_success(response)?;
        Ok(())
    }

    fn get_status(&self, job_id: &str) -> Result<JobHandle, BatchError> {
        let response = self
            .client
            .get(self.job_url(job_id))
            .bearer_auth(&self.token)
            .send()?;
        let response = expect_success(response)?;
        response
            .json::<JobHandle>()
            .map_err(|e| BatchError::MalformedResponse(e.to_string()))
    }

    fn tile_status_counts(&self, job_id: &str) -> Result<TileStatusCounts, BatchError> {
        let mut counts = TileStatusCounts::default();
        let mut url = format!("{}/tiles", self.job_url(job_id));
        loop {
            let response = self.client.get(&url).bearer_auth(&self.token).send()?;
            let response = expect_success(response)?;
            let page: TilePage = response
                .json()
                .map_err(|e| BatchError::MalformedResponse(e.to_string()))?;
            for tile in &page.data {
                counts.record(tile.status);
            }
            match page.links.and_then(|links| links.next) {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_page_parses_with_and_without_links() {
        let page: TilePage = serde_json::from_str(
            r#"{
                "data": [
                    {"id": 1, "status": "PROCESSED"},
                    {"id": 2, "status": "FAILED"}
                ],
                "links": {"next": "https://example.com/tiles?page=2"}
            }"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].status, TileState::Failed);
        assert_eq!(
            page.links.unwrap().next.as_deref(),
            Some("https://example.com/tiles?page=2")
        );

        let page: TilePage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.data.is_empty());
        assert!(page.links.is_none());
    }

    #[test]
    fn job_handle_parses_service_resource() {
        let handle: JobHandle = serde_json::from_str(
            r#"{"id": "abc-123", "status": "ANALYSING", "extra": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(handle.id, "abc-123");
        assert!(handle.status.is_analysing());
        assert_eq!(handle.tile_count, None);

        let handle: JobHandle =
            serde_json::from_str(r#"{"id": "abc-123", "status": "DONE", "tileCount": 42}"#)
                .unwrap();
        assert_eq!(handle.tile_count, Some(42));
    }
}
