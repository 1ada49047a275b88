//! Control protocol client
//!
//! Thin reqwest wrapper over the daemon's loopback HTTP API. Each method is
//! one synchronous round trip; transport failures surface as `Http` errors
//! and are interpreted by the caller (usually as "daemon not running").

use std::time::Duration;
use tapedeck_common::api::{
    CurrentResponse, ErrorResponse, EvaluateRequest, HealthResponse, OkResponse, PlayRequest,
    PlayResponse, StateResponse, ValidateRequest, ValidateResponse,
};
use tapedeck_common::record::DaemonRecord;
use tapedeck_common::{Error, Result};

/// Per-request timeout; generous enough for evaluation, short enough that a
/// wedged daemon does not hang the CLI indefinitely
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the lightweight health probe used during resolution
const HEALTH_TIMEOUT: Duration = Duration::from_millis(500);

/// Client bound to one daemon record's address
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(record: &DaemonRecord) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: record.base_url(),
        })
    }

    /// GET /health with a short timeout; Ok(pid) only when the daemon answered
    pub async fn health(&self) -> Result<u32> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if !health.ok {
            return Err(Error::Http("health probe returned ok=false".to_string()));
        }
        Ok(health.pid)
    }

    /// GET /current
    pub async fn current(&self) -> Result<CurrentResponse> {
        let response = self
            .http
            .get(format!("{}/current", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }

    /// POST /play
    pub async fn play(&self, code: &str, name: &str, version: usize) -> Result<PlayResponse> {
        self.post(
            "play",
            &PlayRequest {
                code: code.to_string(),
                name: name.to_string(),
                version,
            },
        )
        .await
    }

    /// POST /stop
    pub async fn stop(&self) -> Result<StateResponse> {
        self.post("stop", &serde_json::json!({})).await
    }

    /// POST /pause
    pub async fn pause(&self) -> Result<StateResponse> {
        self.post("pause", &serde_json::json!({})).await
    }

    /// POST /evaluate
    pub async fn evaluate(
        &self,
        code: &str,
        name: Option<&str>,
        version: Option<usize>,
    ) -> Result<OkResponse> {
        self.post(
            "evaluate",
            &EvaluateRequest {
                code: code.to_string(),
                name: name.map(str::to_string),
                version,
            },
        )
        .await
    }

    /// POST /validate
    pub async fn validate(&self, code: &str) -> Result<ValidateResponse> {
        self.post(
            "validate",
            &ValidateRequest {
                code: code.to_string(),
            },
        )
        .await
    }

    /// One POST round trip with the shared failure-shape handling
    async fn post<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, route))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::Http(e.to_string()));
        }

        // All error responses share {ok:false, error}
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.error,
            Err(_) => format!("daemon returned {status}"),
        };
        if status.is_server_error() {
            Err(Error::EvaluationError(message))
        } else {
            Err(Error::InvalidArgument(message))
        }
    }
}
