use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::settings::OperatorCredentials;

use super::fix::PositionFix;

/// Timestamp format expected by the collection server: UTC, second
/// precision, literal Z suffix.
const SERVER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Wire body POSTed to the collection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub api_key: String,
    pub job_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub recorded_at: String,
}

impl DeliveryRecord {
    /// Build the record for one accepted fix. `recorded_at` is stamped from
    /// the wall clock at construction and reused for every fallback attempt.
    pub fn new(credentials: &OperatorCredentials, fix: &PositionFix) -> Self {
        Self::with_recorded_at(credentials, fix, Utc::now())
    }

    pub fn with_recorded_at(
        credentials: &OperatorCredentials,
        fix: &PositionFix,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            api_key: credentials.api_key.clone(),
            job_number: credentials.job_number.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            recorded_at: recorded_at.format(SERVER_TIME_FORMAT).to_string(),
        }
    }
}

/// Outcome of a single endpoint attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("endpoint returned status {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no delivery endpoints configured")]
    NoEndpoints,
    #[error("all {attempted} endpoints failed, last: {last}")]
    Exhausted { attempted: usize, last: AttemptError },
}

/// Sends one location record to the collection endpoint, falling back across
/// the configured list in order.
///
/// There is no retry beyond the fallback list and no durable queue: a record
/// that exhausts every endpoint is dropped by the caller.
#[derive(Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
}

impl DeliveryClient {
    /// `timeout` bounds connect+read latency of each individual attempt so a
    /// stalled endpoint cannot block the queue indefinitely.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { http, endpoints }
    }

    /// Try each configured endpoint in order; the first 200/201 wins.
    pub async fn send(&self, record: &DeliveryRecord) -> Result<(), DeliveryError> {
        let mut last = None;

        for url in &self.endpoints {
            match self.attempt(url, record).await {
                Ok(status) => {
                    log::debug!("location delivered to {} ({})", url, status);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("delivery attempt to {} failed: {}", url, err);
                    last = Some(err);
                }
            }
        }

        match last {
            Some(last) => Err(DeliveryError::Exhausted {
                attempted: self.endpoints.len(),
                last,
            }),
            None => Err(DeliveryError::NoEndpoints),
        }
    }

    async fn attempt(&self, url: &str, record: &DeliveryRecord) -> Result<u16, AttemptError> {
        let response = self
            .http
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(record)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            Ok(status.as_u16())
        } else {
            Err(AttemptError::Status(status.as_u16()))
        }
    }
}
