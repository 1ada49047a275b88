//! Control protocol request/response types
//!
//! JSON bodies exchanged between the tapedeck CLI and tapedeckd over loopback
//! HTTP. Every exchange is a single synchronous round trip; all failure
//! responses share the [`ErrorResponse`] shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback state held in daemon memory; reset to Stopped on daemon start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// GET /health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub pid: u32,
}

/// GET /current response: snapshot of the daemon's PlaybackState
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResponse {
    pub state: PlaybackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// POST /play request
///
/// `code` defaults to empty when the field is absent so the daemon can answer
/// a missing-code request with the shared 400 failure shape instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    pub code: String,
    pub name: String,
    pub version: usize,
}

/// POST /play success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResponse {
    pub ok: bool,
    pub name: String,
    pub version: usize,
    pub state: PlaybackStatus,
}

/// POST /stop and POST /pause success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub ok: bool,
    pub state: PlaybackStatus,
}

/// POST /evaluate request; name/version are retained from the prior snapshot
/// when not supplied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<usize>,
}

/// POST /evaluate success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// POST /validate request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub code: String,
}

/// POST /validate success response; location fields point at the first error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub ok: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// Shared failure response shape for every route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_status_wire_format_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&PlaybackStatus::Playing).unwrap(),
            "\"playing\""
        );
        let parsed: PlaybackStatus = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(parsed, PlaybackStatus::Stopped);
    }

    #[test]
    fn absent_code_deserializes_to_empty() {
        let play: PlayRequest =
            serde_json::from_str("{\"name\":\"jam\",\"version\":1}").unwrap();
        assert_eq!(play.code, "");

        let eval: EvaluateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(eval.code, "");

        let validate: ValidateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(validate.code, "");
    }

    #[test]
    fn current_response_omits_absent_fields() {
        let json = serde_json::to_string(&CurrentResponse {
            state: PlaybackStatus::Stopped,
            name: None,
            version: None,
            code: None,
        })
        .unwrap();
        assert_eq!(json, "{\"state\":\"stopped\"}");
    }
}
